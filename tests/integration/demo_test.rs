//! The sample run end to end.

use sheetql::config::ConnectionConfig;
use sheetql::db::Value;
use sheetql::demo::run_demo;
use sheetql::output::{OutputFormat, OutputRenderer};
use sheetql::workbook::Workbook;

fn demo_connection(dir: &std::path::Path) -> ConnectionConfig {
    ConnectionConfig {
        template: Some(dir.join("sample-data-template.xlsx")),
        ..ConnectionConfig::for_path(dir.join("sample-data.xlsx"))
    }
}

fn run(connection: &ConnectionConfig) -> String {
    let mut out = Vec::new();
    run_demo(connection, &OutputRenderer::new(OutputFormat::Text), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_demo_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&demo_connection(dir.path()));

    let (before, after) = output.split_once("After --------------\n").unwrap();
    assert!(before.starts_with("Before --------------\nResult field count: 3\n"));
    assert!(before.contains("COL1: 3 COL2: name3 COL3: 2024-04-03 09:00:00\n"));
    assert_eq!(before.matches("row(s) affected").count(), 2);

    assert!(after.starts_with("Result field count: 3\n"));
    assert!(after.contains("COL1: 3 COL2: update_by_node"));
    assert!(after.contains("COL1: 4 COL2: insert_by_node"));
    assert_eq!(after.lines().count(), 5);
}

#[test]
fn test_demo_generates_missing_template() {
    let dir = tempfile::tempdir().unwrap();
    let connection = demo_connection(dir.path());
    assert!(!dir.path().join("sample-data-template.xlsx").exists());

    run(&connection);

    assert!(dir.path().join("sample-data-template.xlsx").is_file());
    // The template itself is never modified.
    let template = Workbook::open(&dir.path().join("sample-data-template.xlsx"), true).unwrap();
    assert_eq!(template.sheet("Sheet1").unwrap().rows.len(), 3);
}

#[test]
fn test_demo_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let connection = demo_connection(dir.path());

    run(&connection);
    let output = run(&connection);

    let after = output.split_once("After --------------\n").unwrap().1;
    assert_eq!(after.matches("insert_by_node").count(), 1);

    let workbook = Workbook::open(&dir.path().join("sample-data.xlsx"), true).unwrap();
    let sheet = workbook.sheet("Sheet1").unwrap();
    assert_eq!(sheet.rows.len(), 4);
    assert_eq!(sheet.rows[2][1], Value::from("update_by_node"));
}
