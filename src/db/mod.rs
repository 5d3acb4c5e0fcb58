//! Workbook access layer for sheetql.
//!
//! Provides a trait-based interface over an open workbook, so the executor
//! and output code do not depend on how the workbook is held.

mod cursor;
mod schema;
mod sheet;
mod types;

pub use cursor::{Record, RecordCursor};
pub use schema::{Column, Schema, Table};
pub use sheet::SheetClient;
pub use types::{parse_datetime, ColumnInfo, QueryResult, Row, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::sql::{self, Command};

/// Opens a client for the workbook the configuration points at.
///
/// This is the central factory function for connections.
pub fn connect(config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
    let client = SheetClient::open(config)?;
    Ok(Box::new(client))
}

/// Trait defining the interface for workbook clients.
///
/// Clients are used from one thread, one statement at a time.
pub trait DatabaseClient {
    /// Describes every sheet of the workbook as a table.
    fn introspect_schema(&self) -> Result<Schema>;

    /// Executes one parsed command.
    fn execute(&mut self, command: &Command) -> Result<QueryResult>;

    /// Parses and executes SQL text, returning the result of the last statement.
    fn execute_query(&mut self, sql: &str) -> Result<QueryResult> {
        let mut last = QueryResult::new();
        for command in sql::parse_sql(sql)? {
            last = self.execute(&command)?;
        }
        Ok(last)
    }

    /// Releases the workbook.
    fn close(self: Box<Self>) -> Result<()>;
}
