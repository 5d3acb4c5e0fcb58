//! Workbook saving with rust_xlsxwriter.
//!
//! The whole workbook is regenerated from the in-memory model on every save
//! and swapped into place with a rename, so a failed save leaves the
//! previous file untouched. Cell formatting other than dates is not kept.

use std::io::Write;
use std::path::Path;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet, XlsxError};
use tempfile::NamedTempFile;
use tracing::debug;

use super::Workbook;
use crate::db::Value;
use crate::error::{Result, SheetQlError};

const DATETIME_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const DATE_NUM_FORMAT: &str = "yyyy-mm-dd";

/// Fails unless `path` names a file format this crate can write.
pub fn ensure_writable(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());

    match extension.as_deref() {
        Some("xlsx") => Ok(()),
        _ => Err(SheetQlError::workbook(format!(
            "Only .xlsx workbooks can be modified: {}",
            path.display()
        ))),
    }
}

/// Serializes `workbook` and atomically replaces the file at `path`.
pub fn write_workbook(workbook: &Workbook, path: &Path) -> Result<()> {
    ensure_writable(path)?;

    let mut out = XlsxWorkbook::new();
    let datetime_format = Format::new().set_num_format(DATETIME_NUM_FORMAT);
    let date_format = Format::new().set_num_format(DATE_NUM_FORMAT);

    for sheet in &workbook.sheets {
        let worksheet = out.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(xlsx_err)?;

        let (row0, col0) = sheet.origin;
        for (r, row) in sheet.to_grid().iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let row_num = row0 + r as u32;
                let col_num = u16::try_from(col0 as usize + c).map_err(|_| {
                    SheetQlError::workbook(format!("Sheet '{}' is too wide", sheet.name))
                })?;
                let format = match value {
                    Value::DateTime(dt) if dt.time() == NaiveTime::MIN => &date_format,
                    _ => &datetime_format,
                };
                write_cell(worksheet, row_num, col_num, value, format)?;
            }
        }
    }

    let bytes = out.save_to_buffer().map_err(xlsx_err)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| SheetQlError::io(format!("Cannot create temp file in {}: {e}", dir.display())))?;
    tmp.write_all(&bytes)
        .map_err(|e| SheetQlError::io(format!("Cannot write temp workbook: {e}")))?;
    tmp.persist(path).map_err(|e| {
        SheetQlError::io(format!("Cannot replace {}: {}", path.display(), e.error))
    })?;

    debug!(path = %path.display(), bytes = bytes.len(), "Saved workbook");
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    date_format: &Format,
) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            worksheet.write_boolean(row, col, *b).map_err(xlsx_err)?;
        }
        Value::Int(i) => {
            if i.unsigned_abs() > MAX_EXACT_INT {
                return Err(SheetQlError::workbook(format!(
                    "Integer {i} is too large to store exactly in a workbook cell"
                )));
            }
            worksheet.write_number(row, col, *i as f64).map_err(xlsx_err)?;
        }
        Value::Float(f) => {
            worksheet.write_number(row, col, *f).map_err(xlsx_err)?;
        }
        Value::String(s) => {
            worksheet.write_string(row, col, s).map_err(xlsx_err)?;
        }
        Value::DateTime(dt) => match excel_serial(dt) {
            Some(serial) => {
                worksheet
                    .write_number_with_format(row, col, serial, date_format)
                    .map_err(xlsx_err)?;
            }
            // Excel has no serial for dates before 1900.
            None => {
                worksheet
                    .write_string(row, col, value.to_display_string())
                    .map_err(xlsx_err)?;
            }
        },
    }
    Ok(())
}

/// Largest integer magnitude an f64 cell holds exactly.
const MAX_EXACT_INT: u64 = 1 << 53;

/// Day number of 1899-12-30, serial zero of the 1900 date system.
const EXCEL_EPOCH_DAYS_FROM_CE: i32 = 693_594;

/// Serial date number: days since the epoch, with the time of day as the
/// fraction. `None` before 1900-01-01.
///
/// The 1900 system counts a 1900-02-29 that never existed, so only dates from
/// 1900-03-01 on line up with the epoch; earlier ones are one serial lower.
fn excel_serial(dt: &NaiveDateTime) -> Option<f64> {
    let date = dt.date();
    if date.year() < 1900 {
        return None;
    }
    let mut days = date.num_days_from_ce() - EXCEL_EPOCH_DAYS_FROM_CE;
    if date.year() == 1900 && date.month() < 3 {
        days -= 1;
    }
    let seconds = dt.time().num_seconds_from_midnight();
    Some(days as f64 + seconds as f64 / 86_400.0)
}

fn xlsx_err(err: XlsxError) -> SheetQlError {
    SheetQlError::workbook(err.to_string())
}
