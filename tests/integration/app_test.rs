//! Whole command-line invocations against generated workbooks.

use clap::Parser;
use pretty_assertions::assert_eq;
use sheetql::app;
use sheetql::cli::Cli;
use sheetql::config::Config;
use sheetql::error::SheetQlError;
use sheetql::workbook::Workbook;

fn invoke(args: &[&str], config: &Config) -> (Result<(), SheetQlError>, String) {
    let cli = Cli::parse_from(args);
    let mut out = Vec::new();
    let result = app::run(&cli, config, &mut out);
    (result, String::from_utf8(out).unwrap())
}

#[test]
fn test_execute_select() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let path = path.to_str().unwrap();

    let (result, output) = invoke(
        &["sheetql", path, "-e", "SELECT COL2 FROM [Sheet1$] WHERE COL1 = 2"],
        &Config::default(),
    );

    result.unwrap();
    assert_eq!(output, "Result field count: 1\nCOL2: name2\n");
}

#[test]
fn test_statements_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let path = path.to_str().unwrap();

    let (result, output) = invoke(
        &[
            "sheetql",
            path,
            "-e",
            "UPDATE [Sheet1$] SET COL2 = 'changed' WHERE COL1 = 1",
            "-e",
            "SELECT COL2 FROM [Sheet1$] WHERE COL1 = 1",
        ],
        &Config::default(),
    );

    result.unwrap();
    assert_eq!(output, "1 row(s) affected\nResult field count: 1\nCOL2: changed\n");
}

#[test]
fn test_delete_needs_allow_destructive() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let path_str = path.to_str().unwrap();

    let (result, output) = invoke(
        &["sheetql", path_str, "-e", "DELETE FROM [Sheet1$]"],
        &Config::default(),
    );
    let err = result.unwrap_err();
    assert!(err.to_string().contains("--allow-destructive"));
    assert_eq!(output, "");
    assert_eq!(Workbook::open(&path, true).unwrap().sheet("Sheet1").unwrap().rows.len(), 3);

    let (result, output) = invoke(
        &["sheetql", path_str, "--allow-destructive", "-e", "DELETE FROM [Sheet1$]"],
        &Config::default(),
    );
    result.unwrap();
    assert_eq!(output, "3 row(s) affected\n");
}

#[test]
fn test_config_allows_destructive() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let path = path.to_str().unwrap();
    let mut config = Config::default();
    config.execution.allow_destructive = true;

    let (result, _) = invoke(
        &["sheetql", path, "-e", "DELETE FROM [Sheet1$] WHERE COL1 = 1"],
        &config,
    );
    result.unwrap();
}

#[test]
fn test_read_only_refuses_update() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let path = path.to_str().unwrap();

    let (result, _) = invoke(
        &["sheetql", path, "--read-only", "-e", "UPDATE [Sheet1$] SET COL2 = 'x'"],
        &Config::default(),
    );
    assert!(result.unwrap_err().to_string().contains("read-only"));
}

#[test]
fn test_failure_keeps_earlier_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let path = path.to_str().unwrap();

    let (result, output) = invoke(
        &[
            "sheetql",
            path,
            "-e",
            "SELECT COL1 FROM [Sheet1$] WHERE COL1 = 1; SELECT * FROM [Missing$]",
        ],
        &Config::default(),
    );

    assert!(matches!(result.unwrap_err(), SheetQlError::Query(_)));
    assert_eq!(output, "Result field count: 1\nCOL1: 1\n");
}

#[test]
fn test_schema_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let path = path.to_str().unwrap();

    let (result, output) = invoke(&["sheetql", path, "--schema"], &Config::default());

    result.unwrap();
    assert!(output.starts_with("Table: [Sheet1$] (3 rows)\n"));
    assert!(output.contains("  - COL1: "));
}

#[test]
fn test_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let path = path.to_str().unwrap();

    let (result, output) = invoke(
        &["sheetql", path, "-o", "json", "-e", "SELECT COL1, COL2 FROM [Sheet1$] ORDER BY COL1 DESC LIMIT 1"],
        &Config::default(),
    );

    result.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["records"][0]["COL1"], 3);
    assert_eq!(parsed["records"][0]["COL2"], "name3");
}

#[test]
fn test_init_template_writes_once() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("fresh-template.xlsx");
    let template_str = template.to_str().unwrap();

    let (result, output) = invoke(
        &["sheetql", "--init-template", "--template", template_str],
        &Config::default(),
    );
    result.unwrap();
    assert!(output.starts_with("Wrote sample template to "));
    assert!(template.is_file());

    let (result, _) = invoke(
        &["sheetql", "--init-template", "--template", template_str],
        &Config::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_template_flag_resets_working_copy() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let template = dir.path().join("sample-data-template.xlsx");
    let args = [
        "sheetql",
        path.to_str().unwrap(),
        "--template",
        template.to_str().unwrap(),
        "-e",
        "INSERT INTO [Sheet1$] (COL1) VALUES (9)",
    ];

    invoke(&args, &Config::default()).0.unwrap();
    invoke(&args, &Config::default()).0.unwrap();

    let workbook = Workbook::open(&path, true).unwrap();
    assert_eq!(workbook.sheet("Sheet1").unwrap().rows.len(), 4);
}
