//! Look up chassis in Intersight from the rows of a CSV file.
//!
//! The header row of the input names Intersight chassis properties (such
//! as `Name` or `Serial`) and every following row describes one chassis to
//! find. Each row results in exactly one chassis query, filtered on all of
//! its non-empty cells.
use clap::{App, Arg, ArgMatches, SubCommand};
use csv::{ReaderBuilder, Trim, Writer, WriterBuilder};
use regex::Regex;
use serde::Serialize;

use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read, Write};

use crate::cli;
use crate::client::{self, Chassis, Inventory, Query};
use crate::types::{UtilError, UtilResult};

/// Properties selected for every matched chassis.
const CHASSIS_SELECT: &str = "Moid,Name,Model,Serial,OperState";

/// Header row of the match output, written even when nothing matches.
const MATCH_HEADERS: [&str; 6] = ["Row", "Moid", "Name", "Model", "Serial", "OperState"];

/// Column names must be (dotted) Intersight property names.
const COLUMN_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9]*(\.[A-Za-z][A-Za-z0-9]*)*$";

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("chassis")
        .about("Look up chassis described by the rows of a CSV file")
        .args(&cli::global_args())
        .args(&[
            Arg::with_name("csv_file")
                .help("Path to the CSV file of chassis to look up")
                .long("csv_file")
                .value_name("FILE")
                .takes_value(true)
                .required(true),
            Arg::with_name("output")
                .help("Path to a CSV file to write matched chassis into")
                .short("o")
                .long("output")
                .value_name("FILE")
                .takes_value(true),
        ])
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
pub async fn exec<I: Inventory>(api: &I, args: &ArgMatches<'_>) -> UtilResult<()> {
    let path = cli::csv_file(args)?;

    // open the input before making any calls
    let input = File::open(path).map_err(|err| match err.kind() {
        IoErrorKind::NotFound => UtilError::file(format!("CSV file '{}' does not exist", path)),
        _ => UtilError::file(format!("Unable to open CSV file '{}': {}", path, err)),
    })?;
    let rows = read_rows(input)?;

    info!("Read {} row(s) from '{}'", rows.len(), path);

    // optionally write matches out to a second CSV
    let mut output = match args.value_of("output") {
        None => None,
        Some(target) => {
            let file = File::create(target).map_err(|err| {
                UtilError::file(format!("Unable to create CSV file '{}': {}", target, err))
            })?;
            Some(output_writer(file)?)
        }
    };

    let matched = lookup(api, &rows, output.as_mut()).await?;

    if let Some(mut writer) = output {
        writer.flush()?;
    }

    info!("Matched {} chassis from {} row(s)", matched, rows.len());

    Ok(())
}

/// Constructs a match writer, with the header row already written.
pub fn output_writer<W: Write>(inner: W) -> UtilResult<Writer<W>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(inner);
    writer.write_record(MATCH_HEADERS)?;
    Ok(writer)
}

/// An ordered mapping of column name to value for a single input row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    pub fields: Vec<(String, String)>,
}

impl Row {
    /// Builds the `$filter` expression for all non-empty cells.
    pub fn filter(&self) -> Option<String> {
        client::and(
            self.fields
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(column, value)| client::eq(column, value)),
        )
    }
}

/// A matched chassis, as written to the output file.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Match {
    pub row: usize,
    pub moid: String,
    pub name: String,
    pub model: String,
    pub serial: String,
    pub oper_state: String,
}

impl Match {
    /// Flattens a `Chassis` returned for the provided row number.
    fn new(row: usize, chassis: Chassis) -> Self {
        Self {
            row,
            moid: chassis.moid.unwrap_or_default(),
            name: chassis.name.unwrap_or_default(),
            model: chassis.model.unwrap_or_default(),
            serial: chassis.serial.unwrap_or_default(),
            oper_state: chassis.oper_state.flatten().unwrap_or_default(),
        }
    }
}

/// Reads all rows from a CSV source, validating the column names.
pub fn read_rows<R: Read>(input: R) -> UtilResult<Vec<Row>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(input);

    let headers = reader
        .headers()
        .map_err(|err| UtilError::file(format!("Unable to read CSV headers: {}", err)))?
        .clone();

    if headers.is_empty() {
        return Err(UtilError::file("CSV file has no header row"));
    }

    let pattern = Regex::new(COLUMN_PATTERN)?;
    if let Some(column) = headers.iter().find(|column| !pattern.is_match(column)) {
        return Err(UtilError::file(format!(
            "CSV column '{}' is not a valid Intersight property name",
            column
        )));
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record
            .map_err(|err| UtilError::file(format!("Unable to parse CSV row {}: {}", idx + 1, err)))?;

        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| (column.to_string(), value.to_string()))
            .collect();

        rows.push(Row { fields });
    }

    Ok(rows)
}

/// Issues one chassis query per row, returning the number of matches.
///
/// Rows without any values are skipped, as they would match every chassis.
pub async fn lookup<I, W>(api: &I, rows: &[Row], mut output: Option<&mut Writer<W>>) -> UtilResult<usize>
where
    I: Inventory,
    W: Write,
{
    let mut matched = 0;

    for (idx, row) in rows.iter().enumerate() {
        let number = idx + 1;
        let filter = match row.filter() {
            Some(filter) => filter,
            None => {
                warn!("Row {} has no values, skipping", number);
                continue;
            }
        };

        debug!("Row {}: {}", number, filter);

        let query = Query::new().filter(filter).select(CHASSIS_SELECT);
        let found = api.chassis(&query).await?;

        if found.is_empty() {
            warn!("Row {} matched no chassis", number);
            continue;
        }

        for chassis in found {
            let found = Match::new(number, chassis);

            info!(
                "Row {}: chassis '{}' (Moid: {}, Model: {}, Serial: {}, OperState: {})",
                number, found.name, found.moid, found.model, found.serial, found.oper_state
            );

            if let Some(writer) = output.as_mut() {
                writer.serialize(&found)?;
            }

            matched += 1;
        }
    }

    Ok(matched)
}
