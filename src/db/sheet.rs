//! Workbook client backed by an in-memory copy of the file.
//!
//! The file is read once on open. Every successful INSERT, UPDATE or DELETE
//! is written straight back, so the file on disk always matches what the
//! next SELECT sees. No file handle stays open between statements.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::{DatabaseClient, QueryResult, Schema};
use crate::config::ConnectionConfig;
use crate::error::{Result, SheetQlError};
use crate::sql::{self, Command};
use crate::workbook::{ensure_writable, Workbook};

/// An open workbook.
///
/// The handle owns the loaded workbook. It is released by [`close`] or when
/// dropped, including on early returns.
///
/// [`close`]: DatabaseClient::close
#[derive(Debug)]
pub struct SheetClient {
    path: PathBuf,
    workbook: Workbook,
    read_only: bool,
}

impl SheetClient {
    /// Opens the workbook named by `config`.
    pub fn open(config: &ConnectionConfig) -> Result<Self> {
        let path = config.require_path()?.to_path_buf();
        let workbook = Workbook::open(&path, config.header)?;

        info!(
            workbook = %config.display_string(),
            sheets = workbook.sheets.len(),
            "Opened workbook"
        );

        Ok(Self {
            path,
            workbook,
            read_only: config.read_only,
        })
    }

    /// Wraps an already loaded workbook. Mutations are saved to `path`.
    pub fn from_workbook(workbook: Workbook, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            workbook,
            read_only: false,
        }
    }

    /// File the workbook is read from and written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The workbook as of the last statement.
    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Returns true if the handle rejects mutations.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl DatabaseClient for SheetClient {
    fn introspect_schema(&self) -> Result<Schema> {
        Ok(Schema::from_workbook(&self.workbook))
    }

    fn execute(&mut self, command: &Command) -> Result<QueryResult> {
        let start = Instant::now();

        if matches!(command, Command::Select(_)) {
            let result = sql::execute(&mut self.workbook, command)?;
            return Ok(result.with_execution_time(start.elapsed()));
        }

        if self.read_only {
            return Err(SheetQlError::query(format!(
                "Workbook {} is open read-only; {} is not allowed",
                self.path.display(),
                command.statement_type()
            )));
        }
        ensure_writable(&self.path)?;

        let before = self.workbook.clone();
        let result = sql::execute(&mut self.workbook, command)?;
        if let Err(e) = self.workbook.save(&self.path) {
            // Keep memory and disk in agreement.
            warn!(path = %self.path.display(), "Save failed; discarding the change");
            self.workbook = before;
            return Err(e);
        }

        debug!(
            path = %self.path.display(),
            statement = %command.statement_type(),
            rows_affected = result.rows_affected.unwrap_or(0),
            "Wrote workbook"
        );
        Ok(result.with_execution_time(start.elapsed()))
    }

    fn close(self: Box<Self>) -> Result<()> {
        info!(path = %self.path.display(), "Closed workbook");
        Ok(())
    }
}

impl Drop for SheetClient {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Released workbook handle");
    }
}
