//! Logging configuration for sheetql.
//!
//! Logs go to stderr by default so they never mix with result output on
//! stdout, or to a file when one is given.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, SheetQlError};

/// Filter used when neither `RUST_LOG` nor the config sets a level.
pub const DEFAULT_LEVEL: &str = "warn";

/// Builds the filter: `RUST_LOG` wins, then `level`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
    })
}

/// Initializes logging to stderr.
pub fn init_stderr_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes logging to a file, truncated on each run.
pub fn init_file_logging(path: &Path, level: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            SheetQlError::io(format!("Could not create log directory: {e}"))
        })?;
    }

    let log_file = File::create(path)
        .map_err(|e| SheetQlError::io(format!("Could not create log file: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(log_file)
        .with_ansi(false) // No ANSI colors in file output
        .init();
    Ok(())
}

/// Reports a fatal error on `stderr`; its display form already starts with
/// the category.
///
/// The error is also logged when logs go to a file; stderr logging would
/// print it a second time.
pub fn report_error(err: &SheetQlError, logs_to_file: bool, stderr: &mut impl Write) {
    if logs_to_file {
        error!("{}: {}", err.category(), err);
    }
    let _ = writeln!(stderr, "{err}");
}
