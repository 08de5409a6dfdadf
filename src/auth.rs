//! Credential resolution for the Intersight API.
//!
//! Credentials can be provided either through command line switches or
//! through the environment; switches always take precedence. An empty
//! environment variable is treated as if it were not set at all.
use clap::ArgMatches;
use regex::Regex;

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;

use crate::signing::SigningKey;
use crate::types::{UtilError, UtilResult};

/// Environment variable holding the API key identifier.
pub const ENV_KEY_ID: &str = "INTERSIGHT_API_KEY_ID";

/// Environment variable holding the path to the API private key.
pub const ENV_KEY_FILE: &str = "INTERSIGHT_API_PRIVATE_KEY";

/// Key identifiers are three 24 character hex segments.
const KEY_ID_PATTERN: &str = r"(?i)^[0-9a-f]{24}/[0-9a-f]{24}/[0-9a-f]{24}$";

/// Resolved set of credentials used to sign API requests.
#[derive(Clone, Debug, PartialEq)]
pub struct Credentials {
    key_id: String,
    key_file: PathBuf,
    legacy: bool,
}

impl Credentials {
    /// Resolves credentials from the CLI arguments and an environment lookup.
    ///
    /// The lookup is injected so that resolution can be tested without
    /// mutating the process environment.
    pub fn resolve<F>(args: &ArgMatches<'_>, env: F) -> UtilResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key_id = pick(args.value_of("api_key_id"), env(ENV_KEY_ID)).ok_or_else(|| {
            UtilError::config(format!(
                "Missing API key id: provide --api-key-id or set {}",
                ENV_KEY_ID
            ))
        })?;

        let key_file = pick(args.value_of("api_key_file"), env(ENV_KEY_FILE)).ok_or_else(|| {
            UtilError::config(format!(
                "Missing API key file: provide --api-key-file or set {}",
                ENV_KEY_FILE
            ))
        })?;

        if !Regex::new(KEY_ID_PATTERN)?.is_match(&key_id) {
            return Err(UtilError::config(format!(
                "Invalid API key id '{}': expected three '/' separated segments",
                key_id
            )));
        }

        Ok(Self {
            key_id,
            key_file: PathBuf::from(key_file),
            legacy: args.is_present("api_key_legacy"),
        })
    }

    /// Retrieves the API key identifier.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Retrieves the path to the private key file.
    pub fn key_file(&self) -> &PathBuf {
        &self.key_file
    }

    /// Determines whether the key is in the legacy format.
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Reads the private key from disk and constructs a `SigningKey`.
    pub fn signing_key(&self) -> UtilResult<SigningKey> {
        let pem = fs::read(&self.key_file).map_err(|err| {
            let path = self.key_file.display();
            match err.kind() {
                IoErrorKind::NotFound => {
                    UtilError::file(format!("API key file '{}' does not exist", path))
                }
                _ => UtilError::file(format!("Unable to read API key file '{}': {}", path, err)),
            }
        })?;

        SigningKey::from_pem(self.key_id(), &pem, self.legacy)
    }
}

/// Picks a flag value over an environment value, ignoring empty strings.
fn pick(flag: Option<&str>, env: Option<String>) -> Option<String> {
    flag.map(str::to_string)
        .filter(|value| !value.trim().is_empty())
        .or_else(|| env.filter(|value| !value.trim().is_empty()))
        .map(|value| value.trim().to_string())
}
