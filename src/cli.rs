//! CLI bindings for all internal commands and modules.
//!
//! This module focuses on the common CLI bindings required to provide easy
//! APIs and consistency across all other modules. This is where the parent
//! CLI can be found, as well as the credential and connection switches
//! shared by every subcommand.
use clap::{App, AppSettings, Arg, ArgMatches};

use std::env;

use crate::auth::Credentials;
use crate::client::IntersightClient;
use crate::types::{UtilError, UtilResult};

/// Default Intersight endpoint, used when `--url` is not provided.
pub const DEFAULT_ENDPOINT: &str = "https://intersight.com";

/// Constructs a new CLI application using Clap.
///
/// This will register all subcommand modules and embed all metadata. All
/// metadata is fetched dynamically from Cargo and shouldn't require to
/// be updated (ever).
pub fn build<'a, 'b>() -> App<'a, 'b> {
    App::new("")
        .name(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand(crate::chassis::cmd())
        .subcommand(crate::slots::cmd())
        .settings(&[
            AppSettings::ArgRequiredElseHelp,
            AppSettings::DisableHelpSubcommand,
            AppSettings::SubcommandRequiredElseHelp,
            AppSettings::VersionlessSubcommands,
        ])
}

/// Executes a subcommand based on the parsed arguments from the CLI.
///
/// Logging, credentials and the API client are all set up here, so each
/// submodule receives a ready-to-use client.
pub async fn exec(args: &ArgMatches<'_>) -> UtilResult<()> {
    match args.subcommand() {
        ("chassis", Some(subargs)) => {
            let client = connect(subargs)?;
            crate::chassis::exec(&client, subargs).await
        }
        ("slots", Some(subargs)) => {
            let client = connect(subargs)?;
            crate::slots::exec(&client, subargs).await
        }
        _ => {
            build().print_help()?;
            Ok(())
        }
    }
}

/// Initializes logging and constructs an authenticated API client.
fn connect(args: &ArgMatches<'_>) -> UtilResult<IntersightClient> {
    // initialize logging
    crate::log::init(args)?;

    // resolve the credentials, flags first then environment
    let credentials = Credentials::resolve(args, |name| env::var(name).ok())?;
    let key = credentials.signing_key()?;

    debug!(
        "Using {} API key {} from {} ({:?})",
        if credentials.is_legacy() { "legacy" } else { "v3" },
        key.key_id(),
        credentials.key_file().display(),
        key.scheme()
    );

    // construct the client against the chosen endpoint
    IntersightClient::new(endpoint(args), key, args.is_present("ignore_tls"))
}

/// Fetches the API endpoint from the common argument set.
pub fn endpoint<'a>(args: &'a ArgMatches<'a>) -> &'a str {
    args.value_of("url").unwrap_or(DEFAULT_ENDPOINT)
}

/// Fetches the CSV file path from the common argument set.
pub fn csv_file<'a>(args: &'a ArgMatches<'a>) -> UtilResult<&'a str> {
    args.value_of("csv_file")
        .ok_or_else(|| UtilError::config("A CSV file must be provided via --csv_file"))
}

/// Fetches the set of global arguments which should be attached on each command.
pub fn global_args<'a, 'b>() -> [Arg<'a, 'b>; 7] {
    [
        Arg::with_name("api_key_id")
            .help("Intersight API key identifier [env: INTERSIGHT_API_KEY_ID]")
            .long("api-key-id")
            .value_name("ID")
            .takes_value(true),
        Arg::with_name("api_key_file")
            .help("Path to the API private key file [env: INTERSIGHT_API_PRIVATE_KEY]")
            .long("api-key-file")
            .value_name("FILE")
            .takes_value(true),
        Arg::with_name("api_key_legacy")
            .help("Use a legacy (v2, RSA) API key")
            .long("api-key-legacy"),
        Arg::with_name("url")
            .help("Intersight endpoint to connect to [default: https://intersight.com]")
            .long("url")
            .value_name("URL")
            .takes_value(true),
        Arg::with_name("ignore_tls")
            .help("Ignore TLS server-side certificate verification")
            .long("ignore-tls"),
        Arg::with_name("quiet")
            .help("Only prints errors during execution")
            .short("q")
            .long("quiet"),
        Arg::with_name("verbose")
            .help("Prints debug output during execution")
            .short("v")
            .long("verbose")
            .conflicts_with("quiet"),
    ]
}

#[cfg(test)]
mod tests {
    #[test]
    fn parsing_global_arguments() {
        let args = super::build()
            .get_matches_from_safe(vec![
                "intersight-utils",
                "slots",
                "--csv_file",
                "out.csv",
                "--url",
                "https://intersight.example.com",
                "--ignore-tls",
            ])
            .unwrap();
        let (name, subargs) = args.subcommand();
        let subargs = subargs.unwrap();

        assert_eq!(name, "slots");
        assert_eq!(super::endpoint(subargs), "https://intersight.example.com");
        assert_eq!(super::csv_file(subargs).unwrap(), "out.csv");
        assert!(subargs.is_present("ignore_tls"));
    }

    #[test]
    fn endpoint_defaults_to_saas() {
        let args = super::build()
            .get_matches_from_safe(vec!["intersight-utils", "chassis", "--csv_file", "in.csv"])
            .unwrap();
        let (_, subargs) = args.subcommand();

        assert_eq!(super::endpoint(subargs.unwrap()), super::DEFAULT_ENDPOINT);
    }

    #[test]
    fn csv_file_is_required() {
        let result = super::build().get_matches_from_safe(vec!["intersight-utils", "slots"]);

        assert!(result.is_err());
    }
}
