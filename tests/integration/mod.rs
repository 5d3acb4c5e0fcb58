//! Integration tests for sheetql.

pub mod app_test;
pub mod connection_test;
pub mod demo_test;
pub mod prepare_test;
pub mod query_test;

use std::path::{Path, PathBuf};

use sheetql::workbook::{prepare_working_copy, write_sample_template};

/// Writes the sample template into `dir` and prepares a working copy next to it.
///
/// Returns the working copy's path.
pub fn sample_workbook(dir: &Path) -> PathBuf {
    let template = dir.join("sample-data-template.xlsx");
    let target = dir.join("sample-data.xlsx");
    write_sample_template(&template).unwrap();
    prepare_working_copy(&template, &target).unwrap();
    target
}
