//! Types module for the main runtime, exposing error and result types.
//!
//! Most code in this module is based around coercion of error types into
//! a common error type, to be used as the general "Error" of this crate.
//! Each error also carries an `ErrorKind`, so startup failures caused by
//! bad configuration can be told apart from failures on input files.
use logger::SetLoggerError;
use serde_json::Value;

use std::fmt::{self, Debug, Display, Formatter};
use std::io;

/// Public type alias for a result with a `UtilError` error type.
pub type UtilResult<T> = Result<T, UtilError>;

/// Broad categories of failure surfaced to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid credentials, endpoints or flags.
    Config,
    /// Missing, unreadable or malformed files.
    File,
    /// Errors returned by the Intersight API.
    Api,
    /// Everything else (transport, logging setup, etc).
    Other,
}

/// Delegating error wrapper for errors raised throughout the crate.
///
/// The internal `String` representation enables cheap coercion from
/// other error types by binding their error messages through.
pub struct UtilError {
    kind: ErrorKind,
    message: String,
}

impl UtilError {
    /// Constructs a new `UtilError` of the provided kind.
    pub fn new<M: Into<String>>(kind: ErrorKind, message: M) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Shorthand for a file error.
    pub fn file<M: Into<String>>(message: M) -> Self {
        Self::new(ErrorKind::File, message)
    }

    /// Retrieves the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Retrieves the process exit code associated with this error.
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::Other => 1,
            ErrorKind::Config => 2,
            ErrorKind::File => 3,
            ErrorKind::Api => 4,
        }
    }

    /// Retrieves the message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Converts an unsuccessful API response into a `UtilError`.
    ///
    /// Intersight replies with a JSON document containing a `message`
    /// field; if we can find one we use it, otherwise the (truncated)
    /// raw body is used instead.
    pub fn from_api(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|json| json.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.chars().take(500).collect());

        Self::new(
            ErrorKind::Api,
            format!("Intersight API error ({}): {}", status, message),
        )
    }
}

/// Debug implementation for `UtilError`.
impl Debug for UtilError {
    /// Formats an `UtilError` by delegating to `Display`.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Display implementation for `UtilError`.
impl Display for UtilError {
    /// Formats an `UtilError` by writing out the inner message.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

/// Macro to implement `From` for provided types, tagged with a kind.
macro_rules! derive_from {
    ($type:ty, $kind:expr) => {
        impl<'a> From<$type> for UtilError {
            fn from(t: $type) -> UtilError {
                UtilError::new($kind, t.to_string())
            }
        }
    };
}

// Easy derivations of derive_from.
derive_from!(&'a str, ErrorKind::Other);
derive_from!(String, ErrorKind::Other);
derive_from!(io::Error, ErrorKind::File);
derive_from!(csv::Error, ErrorKind::File);
derive_from!(clap::Error, ErrorKind::Config);
derive_from!(regex::Error, ErrorKind::Config);
derive_from!(openssl::error::ErrorStack, ErrorKind::Other);
derive_from!(reqwest::Error, ErrorKind::Other);
derive_from!(serde_json::Error, ErrorKind::Api);
derive_from!(SetLoggerError, ErrorKind::Other);
