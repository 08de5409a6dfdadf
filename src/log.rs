//! Logging module for terminal based output control.
//!
//! Contains a custom logging implementation to disable/redirect output
//! based on command line switches baked into the application level.
use clap::ArgMatches;
use logger::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Basic logger instance to allow quiet-aware logging.
struct BasicLogger {
    quiet: bool,
    level: LevelFilter,
}

// Basic logging implementation.
impl Log for BasicLogger {
    /// Returns enabled only for intersight-utils modules.
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("intersight_utils") && metadata.level() <= self.level
    }

    /// Logs out a `Record` when logging is enabled.
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.metadata().level() {
            Level::Error => eprintln!("{}", record.args()),
            Level::Warn if !self.quiet => eprintln!("WARN: {}", record.args()),
            Level::Warn => (),
            _ if !self.quiet => println!("{}", record.args()),
            _ => (),
        }
    }

    /// Flushes this logger.
    fn flush(&self) {}
}

/// Determines the maximum level from the provided arguments.
fn level(args: &ArgMatches) -> LevelFilter {
    if args.is_present("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Initializes the logger based on the provided arguments.
///
/// If the `-q` flag was provided, this short circuits to cull all logging
/// except errors; `-v` enables debug output.
pub fn init(args: &ArgMatches) -> Result<(), SetLoggerError> {
    let level = level(args);
    let logger = Box::new(BasicLogger {
        quiet: args.is_present("quiet"),
        level,
    });
    logger::set_boxed_logger(logger).map(|_| logger::set_max_level(level))
}
