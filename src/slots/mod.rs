//! Report blade slot occupancy across every chassis.
//!
//! This utility writes a CSV file with one row per chassis slot, listing
//! the blade model and serial in each populated slot. A summary of slot
//! statuses per chassis model is appended unless `--no-summary` is given.
use clap::{App, Arg, ArgMatches, SubCommand};
use csv::{Writer, WriterBuilder};

use std::fs::File;
use std::io::Write;
use std::time::{Duration, Instant};

use crate::cli;
use crate::client::{self, Inventory, Query};
use crate::types::{UtilError, UtilResult};

pub mod layout;

use self::layout::{ChassisInfo, Summary};

/// Properties selected when listing chassis.
const CHASSIS_SELECT: &str = "Moid,Name,Model,OperState,Serial";

/// Properties selected when listing blades.
const BLADE_SELECT: &str = "SlotId,Moid,Model,Serial";

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("slots")
        .about("Write blade slot information for every chassis to CSV")
        .args(&cli::global_args())
        .args(&[
            Arg::with_name("csv_file")
                .help("Path to the CSV file for output")
                .long("csv_file")
                .value_name("FILE")
                .takes_value(true)
                .required(true),
            Arg::with_name("no_summary")
                .help("Skips the summary of slot statuses per chassis model")
                .long("no-summary"),
        ])
}

/// Determines whether the summary section should be appended.
fn summary(args: &ArgMatches<'_>) -> bool {
    !args.is_present("no_summary")
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
pub async fn exec<I: Inventory>(api: &I, args: &ArgMatches<'_>) -> UtilResult<()> {
    let path = cli::csv_file(args)?;
    let start = Instant::now();

    // create the output before making any calls
    let file = File::create(path).map_err(|err| {
        UtilError::file(format!("Unable to create CSV file '{}': {}", path, err))
    })?;

    // the header is written manually so it exists even without rows
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    report(api, &mut writer, summary(args)).await?;

    // only seconds are interesting to a user
    let elapsed = Duration::from_secs(start.elapsed().as_secs());

    info!(
        "Successfully wrote blade slot information to '{}' in {}",
        path,
        humantime::format_duration(elapsed)
    );

    Ok(())
}

/// Writes the slot report for every chassis into the provided writer.
pub async fn report<I, W>(api: &I, writer: &mut Writer<W>, summary: bool) -> UtilResult<()>
where
    I: Inventory,
    W: Write + Send,
{
    writer.write_record(layout::HEADERS)?;

    info!("Fetching chassis list from Intersight...");

    let query = Query::new().select(CHASSIS_SELECT);
    let all_chassis = api.chassis(&query).await?;

    if all_chassis.is_empty() {
        info!("No chassis found in Intersight");
        writer.flush()?;
        return Ok(());
    }

    info!("Found {} chassis, processing each...", all_chassis.len());

    let mut totals = Summary::new();

    for chassis in &all_chassis {
        let info = ChassisInfo::from_chassis(chassis);

        info!(
            "Processing chassis '{}', model '{}', serial '{}', {} slots",
            info.name, info.model, info.serial, info.slots
        );

        // fetch all blades living inside this chassis
        let query = Query::new()
            .filter(client::eq("EquipmentChassis.Moid", &info.moid))
            .select(BLADE_SELECT);
        let blades = api.blades(&query).await?;

        if blades.is_empty() {
            debug!("No blades found in chassis '{}', all slots are empty", info.name);
        }

        let populated = layout::populated_slots(&info.name, &blades);

        totals.record(&info, &populated);

        for row in layout::slot_rows(&info, &populated) {
            writer.serialize(row)?;
        }

        info!("Finished writing slot information for chassis '{}'", info.name);
    }

    if summary {
        info!("Appending summary of slot statuses per chassis model...");
        for row in totals.rows() {
            writer.write_record(&row)?;
        }
    }

    writer.flush()?;
    Ok(())
}
