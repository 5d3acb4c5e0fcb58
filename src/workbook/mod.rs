//! In-memory workbook model.
//!
//! A workbook is loaded whole with calamine, queried and mutated as a set of
//! tables (one per worksheet), and written back with rust_xlsxwriter.

mod prepare;
mod reader;
mod writer;

pub use prepare::{prepare_working_copy, write_sample_template};
pub use reader::read_workbook;
pub use writer::{ensure_writable, write_workbook};

use std::path::Path;

use crate::db::{ColumnInfo, Row, Value};
use crate::error::Result;

/// A worksheet viewed as a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    /// Worksheet name as shown on its tab.
    pub name: String,

    /// Zero-based (row, column) of the top-left cell of the used range.
    pub origin: (u32, u32),

    /// Whether the first used row holds the column names.
    pub has_header: bool,

    /// Column names in header order.
    pub columns: Vec<String>,

    /// Header cells as read, written back unchanged. Blank or repeated
    /// cells keep their original contents here while `columns` names them
    /// `F<n>`.
    pub header: Row,

    /// Data rows. Every row has exactly `columns.len()` cells.
    pub rows: Vec<Row>,
}

impl Sheet {
    /// Creates an empty sheet with the given columns.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        let header = columns.iter().map(|c| Value::String(c.clone())).collect();
        Self {
            name: name.into(),
            origin: (0, 0),
            has_header: true,
            columns,
            header,
            rows: Vec::new(),
        }
    }

    /// Builds a table from the used range of a worksheet.
    ///
    /// With a header, the first grid row names the columns; blank names become
    /// `F<n>`, as do repeated ones. Without a header every column is `F<n>`.
    pub fn from_grid(
        name: impl Into<String>,
        origin: (u32, u32),
        mut grid: Vec<Row>,
        has_header: bool,
    ) -> Self {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut grid {
            row.resize(width, Value::Null);
        }

        let header = if has_header && !grid.is_empty() {
            grid.remove(0)
        } else {
            Vec::new()
        };

        let columns = if has_header && !header.is_empty() {
            let mut names: Vec<String> = Vec::with_capacity(width);
            for (i, cell) in header.iter().enumerate() {
                let candidate = match cell {
                    Value::Null => String::new(),
                    other => other.to_display_string().trim().to_string(),
                };
                let taken = names.iter().any(|n| n.eq_ignore_ascii_case(&candidate));
                if candidate.is_empty() || taken {
                    names.push(format!("F{}", i + 1));
                } else {
                    names.push(candidate);
                }
            }
            names
        } else {
            (1..=width).map(|i| format!("F{i}")).collect()
        };

        Self {
            name: name.into(),
            origin,
            has_header,
            columns,
            header,
            rows: grid,
        }
    }

    /// Returns true if the sheet has no columns at all.
    pub fn is_empty_table(&self) -> bool {
        self.columns.is_empty()
    }

    /// Finds a column by name, ignoring case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Infers a column's type from the values it holds.
    ///
    /// Returns `empty` when every cell is blank and `mixed` when non-blank
    /// cells disagree.
    pub fn column_type(&self, index: usize) -> &'static str {
        let mut seen: Option<&'static str> = None;
        for value in self.rows.iter().filter_map(|row| row.get(index)) {
            if value.is_null() {
                continue;
            }
            match seen {
                None => seen = Some(value.type_name()),
                Some(t) if t != value.type_name() => return "mixed",
                Some(_) => {}
            }
        }
        seen.unwrap_or("empty")
    }

    /// Column metadata in header order.
    pub fn column_info(&self) -> Vec<ColumnInfo> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| ColumnInfo::new(name.clone(), self.column_type(i)))
            .collect()
    }

    /// The cell grid to write back, header row included when present.
    pub fn to_grid(&self) -> Vec<Row> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        if self.has_header {
            grid.push(self.header.clone());
        }
        grid.extend(self.rows.iter().cloned());
        grid
    }
}

/// All worksheets of one workbook file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    /// Worksheets in tab order.
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Creates an empty workbook that is not backed by a file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a workbook file.
    pub fn open(path: &Path, has_header: bool) -> Result<Self> {
        read_workbook(path, has_header)
    }

    /// Writes the workbook to the given `.xlsx` path.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_workbook(self, path)
    }

    /// Adds a sheet, returning `self` for chaining.
    pub fn with_sheet(mut self, sheet: Sheet) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Worksheet names in tab order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Finds a sheet by name, ignoring case.
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Finds a sheet by name for mutation, ignoring case.
    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}
