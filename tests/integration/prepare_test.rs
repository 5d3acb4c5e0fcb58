//! Working-copy preparation tests.

use sheetql::workbook::{prepare_working_copy, write_sample_template, Workbook};
use sheetql::db::Value;

#[test]
fn test_prepare_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.xlsx");
    let target = dir.path().join("work.xlsx");
    write_sample_template(&template).unwrap();

    prepare_working_copy(&template, &target).unwrap();
    let first = std::fs::read(&target).unwrap();
    prepare_working_copy(&template, &target).unwrap();
    let second = std::fs::read(&target).unwrap();

    assert_eq!(first, second);
    assert_eq!(second, std::fs::read(&template).unwrap());
}

#[test]
fn test_prepare_discards_previous_changes() {
    let dir = tempfile::tempdir().unwrap();
    let target = super::sample_workbook(dir.path());
    let template = dir.path().join("sample-data-template.xlsx");

    let mut workbook = Workbook::open(&target, true).unwrap();
    workbook.sheet_mut("Sheet1").unwrap().rows.clear();
    workbook.save(&target).unwrap();
    assert!(Workbook::open(&target, true).unwrap().sheet("Sheet1").unwrap().rows.is_empty());

    prepare_working_copy(&template, &target).unwrap();
    let sheet = Workbook::open(&target, true).unwrap().sheet("Sheet1").unwrap().clone();
    assert_eq!(sheet.rows.len(), 3);
}

#[test]
fn test_sample_template_contents() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.xlsx");
    write_sample_template(&template).unwrap();

    let workbook = Workbook::open(&template, true).unwrap();
    let sheet = workbook.sheet("Sheet1").unwrap();

    assert_eq!(sheet.columns, vec!["COL1", "COL2", "COL3"]);
    assert_eq!(sheet.rows.len(), 3);
    assert_eq!(sheet.rows[0][0], Value::Int(1));
    assert_eq!(sheet.rows[2][1], Value::from("name3"));
    assert!(matches!(sheet.rows[1][2], Value::DateTime(_)));
}
