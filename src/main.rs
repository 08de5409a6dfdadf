//! Utilities to inspect Cisco UCS chassis inventory through Intersight.
//!
//! This tool should be used from a command line and can be used in many
//! different ways; please see the help output of each subcommand.
//!
//! Credentials are an Intersight API key pair, provided either through the
//! `--api-key-id` and `--api-key-file` switches, or through the variables
//! `INTERSIGHT_API_KEY_ID` and `INTERSIGHT_API_PRIVATE_KEY`.
#[macro_use]
extern crate log as logger;

mod auth;
mod cli;
mod client;
mod log;
mod signing;
mod types;
mod walker;

mod chassis;
mod slots;

use std::process;

#[tokio::main]
async fn main() {
    // build the CLI and grab all arguments
    let args = cli::build().get_matches();

    // delegate to the cli mod, exiting by error kind
    if let Err(err) = cli::exec(&args).await {
        eprintln!("Error: {}", err);
        process::exit(err.exit_code());
    }
}
