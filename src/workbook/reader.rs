//! Workbook loading with calamine.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use super::{Sheet, Workbook};
use crate::db::{parse_datetime, Value};
use crate::error::{Result, SheetQlError};

/// Largest integer an f64 holds exactly.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Reads every worksheet of the file at `path` into memory.
pub fn read_workbook(path: &Path, has_header: bool) -> Result<Workbook> {
    if !path.is_file() {
        return Err(SheetQlError::connection(format!(
            "Workbook not found: {}",
            path.display()
        )));
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| {
        SheetQlError::connection(format!("Cannot open workbook {}: {e}", path.display()))
    })?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name).map_err(|e| {
            SheetQlError::workbook(format!("Cannot read worksheet '{name}': {e}"))
        })?;

        let origin = range.start().unwrap_or((0, 0));
        let grid: Vec<Vec<Value>> = range
            .rows()
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();

        debug!(sheet = %name, rows = grid.len(), ?origin, "Loaded worksheet");
        sheets.push(Sheet::from_grid(name, origin, grid, has_header));
    }

    Ok(Workbook { sheets })
}

/// Converts a calamine cell into a value.
fn convert_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => normalize_float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Value::DateTime)
            .unwrap_or_else(|| normalize_float(dt.as_f64())),
        Data::DateTimeIso(s) => parse_datetime(s)
            .map(Value::DateTime)
            .unwrap_or_else(|| Value::String(s.clone())),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(e.to_string()),
    }
}

/// Excel stores every number as a double; whole numbers read back as integers.
fn normalize_float(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT {
        Value::Int(f as i64)
    } else {
        Value::Float(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_float() {
        assert_eq!(normalize_float(3.0), Value::Int(3));
        assert_eq!(normalize_float(-2.0), Value::Int(-2));
        assert_eq!(normalize_float(2.5), Value::Float(2.5));
        assert_eq!(normalize_float(1e300), Value::Float(1e300));
    }

    #[test]
    fn test_convert_simple_cells() {
        assert_eq!(convert_cell(&Data::Empty), Value::Null);
        assert_eq!(convert_cell(&Data::String("x".into())), Value::from("x"));
        assert_eq!(convert_cell(&Data::Float(4.0)), Value::Int(4));
        assert_eq!(convert_cell(&Data::Bool(true)), Value::Bool(true));
    }

    #[test]
    fn test_convert_iso_datetime() {
        let value = convert_cell(&Data::DateTimeIso("2024-01-02T03:04:05".into()));
        assert!(matches!(value, Value::DateTime(_)));
        assert_eq!(value.to_display_string(), "2024-01-02 03:04:05");
    }

    #[test]
    fn test_missing_file_is_connection_error() {
        let err = read_workbook(Path::new("/nonexistent/book.xlsx"), true).unwrap_err();
        assert!(matches!(err, SheetQlError::Connection(_)));
    }

    #[test]
    fn test_read_back_equals_saved_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        let mut sheet = Sheet::new("Sheet1", vec!["ID".to_string(), "NAME".to_string()]);
        sheet.rows.push(vec![Value::Int(1), Value::from("one")]);
        sheet.rows.push(vec![Value::Int(2), Value::Null]);
        let workbook = Workbook::new().with_sheet(sheet);
        workbook.save(&path).unwrap();

        assert_eq!(read_workbook(&path, true).unwrap(), workbook);
    }
}
