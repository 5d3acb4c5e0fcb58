//! Workbook schema types for sheetql.
//!
//! Describes the tables (worksheets) of an open workbook and their columns.

use serde::Serialize;

use crate::workbook::Workbook;

/// Represents the complete schema of a workbook.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Schema {
    /// One table per worksheet, in tab order.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the schema of a loaded workbook.
    pub fn from_workbook(workbook: &Workbook) -> Self {
        let tables = workbook
            .sheets
            .iter()
            .map(|sheet| Table {
                name: sheet.name.clone(),
                columns: sheet
                    .column_info()
                    .into_iter()
                    .map(|info| Column {
                        name: info.name,
                        data_type: info.data_type,
                    })
                    .collect(),
                row_count: sheet.rows.len(),
            })
            .collect();
        Self { tables }
    }

    /// Finds a table by name, ignoring case.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Formats the schema for terminal output.
    pub fn format_for_display(&self) -> String {
        self.tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| format!("  - {}: {}\n", c.name, c.data_type))
                    .collect::<String>();
                format!(
                    "Table: [{}$] ({} rows)\n{}",
                    table.name, table.row_count, columns
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A worksheet seen as a table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Table {
    /// Worksheet name.
    pub name: String,

    /// Columns in header order.
    pub columns: Vec<Column>,

    /// Number of data rows.
    pub row_count: usize,
}

/// A column of a worksheet table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Column {
    /// Column name from the header row (or `F<n>`).
    pub name: String,

    /// Inferred data type.
    pub data_type: String,
}
