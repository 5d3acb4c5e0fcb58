//! Working-copy preparation.
//!
//! Mutating runs operate on a copy of a template so they can be repeated.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::{Sheet, Workbook};
use crate::db::Value;
use crate::error::{Result, SheetQlError};

/// Replaces `target` with a fresh copy of `template`.
///
/// Any existing file at `target` is deleted first. Running this twice leaves
/// `target` identical to `template`.
pub fn prepare_working_copy(template: &Path, target: &Path) -> Result<()> {
    if !template.is_file() {
        return Err(SheetQlError::io(format!(
            "Template not found: {}",
            template.display()
        )));
    }

    if let (Ok(a), Ok(b)) = (template.canonicalize(), target.canonicalize()) {
        if a == b {
            return Err(SheetQlError::io(format!(
                "Template and working copy are the same file: {}",
                template.display()
            )));
        }
    }

    if target.exists() {
        fs::remove_file(target).map_err(|e| {
            SheetQlError::io(format!("Cannot remove {}: {e}", target.display()))
        })?;
        debug!(path = %target.display(), "Removed stale working copy");
    }

    fs::copy(template, target).map_err(|e| {
        SheetQlError::io(format!(
            "Cannot copy {} to {}: {e}",
            template.display(),
            target.display()
        ))
    })?;

    info!(
        template = %template.display(),
        target = %target.display(),
        "Prepared working copy"
    );
    Ok(())
}

/// Writes the three-row sample sheet the demo run starts from.
pub fn write_sample_template(path: &Path) -> Result<()> {
    let mut sheet = Sheet::new(
        "Sheet1",
        vec!["COL1".to_string(), "COL2".to_string(), "COL3".to_string()],
    );
    for id in 1..=3u32 {
        let date = NaiveDate::from_ymd_opt(2024, 4, id)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .ok_or_else(|| SheetQlError::internal("invalid sample date"))?;
        sheet.rows.push(vec![
            Value::Int(id as i64),
            Value::String(format!("name{id}")),
            Value::DateTime(date),
        ]);
    }

    Workbook::new().with_sheet(sheet).save(path)?;
    info!(path = %path.display(), "Wrote sample template");
    Ok(())
}
