//! Statement execution against workbook files.

use pretty_assertions::assert_eq;
use sheetql::config::ConnectionConfig;
use sheetql::db::{self, DatabaseClient, Value};
use sheetql::error::SheetQlError;
use sheetql::workbook::{Sheet, Workbook};

fn open(path: &std::path::Path) -> Box<dyn DatabaseClient> {
    db::connect(&ConnectionConfig::for_path(path)).unwrap()
}

#[test]
fn test_select_all_from_sample() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let mut client = open(&path);

    let result = client.execute_query("SELECT * FROM [Sheet1$]").unwrap();

    assert_eq!(result.field_count(), 3);
    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.rows[1][1], Value::from("name2"));
    client.close().unwrap();
}

#[test]
fn test_record_fields_follow_header_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let mut client = open(&path);

    let records = client
        .execute_query("SELECT * FROM [Sheet1$] WHERE COL1 = 1")
        .unwrap()
        .into_records();
    assert_eq!(records.field_names().to_vec(), vec!["COL1", "COL2", "COL3"]);

    let records: Vec<_> = records.collect();
    assert_eq!(records.len(), 1);
    let names: Vec<&str> = records[0].names().collect();
    assert_eq!(names, vec!["COL1", "COL2", "COL3"]);
    assert_eq!(records[0].get("COL2"), Some(&Value::from("name1")));
}

#[test]
fn test_update_visible_to_next_select_and_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let mut client = open(&path);

    let result = client
        .execute_query("UPDATE [Sheet1$] SET COL2 = 'update_by_node' WHERE COL1 = 3")
        .unwrap();
    assert_eq!(result.rows_affected, Some(1));

    let result = client
        .execute_query("SELECT COL2 FROM [Sheet1$] WHERE COL1 = 3")
        .unwrap();
    assert_eq!(result.rows, vec![vec![Value::from("update_by_node")]]);
    client.close().unwrap();

    // A fresh handle reads the same change back from the file.
    let mut client = open(&path);
    let result = client
        .execute_query("SELECT COL2 FROM [Sheet1$] WHERE COL1 = 3")
        .unwrap();
    assert_eq!(result.rows, vec![vec![Value::from("update_by_node")]]);
}

#[test]
fn test_insert_grows_sheet_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let mut client = open(&path);

    let result = client
        .execute_query("INSERT INTO [Sheet1$] VALUES(4, 'insert_by_node', '2024/1/2 3:04:05')")
        .unwrap();
    assert_eq!(result.rows_affected, Some(1));
    client.close().unwrap();

    let workbook = Workbook::open(&path, true).unwrap();
    let sheet = workbook.sheet("Sheet1").unwrap();
    assert_eq!(sheet.rows.len(), 4);
    assert_eq!(sheet.rows[3][0], Value::Int(4));
    assert_eq!(sheet.rows[3][1], Value::from("insert_by_node"));
    match &sheet.rows[3][2] {
        Value::DateTime(dt) => assert_eq!(dt.date().to_string(), "2024-01-02"),
        other => panic!("expected a date, got {other:?}"),
    }
}

#[test]
fn test_delete_removes_rows_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let mut client = open(&path);

    let result = client
        .execute_query("DELETE FROM [Sheet1$] WHERE COL1 >= 2")
        .unwrap();
    assert_eq!(result.rows_affected, Some(2));
    client.close().unwrap();

    let workbook = Workbook::open(&path, true).unwrap();
    assert_eq!(workbook.sheet("Sheet1").unwrap().rows.len(), 1);
}

#[test]
fn test_missing_sheet_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let mut client = open(&path);

    let err = client.execute_query("SELECT * FROM [Nope$]").unwrap_err();
    assert!(matches!(err, SheetQlError::Query(_)));
    assert!(err.to_string().contains("Sheet 'Nope' not found"));
    assert!(err.to_string().contains("Sheet1"));
}

#[test]
fn test_empty_sheet_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    let mut data = Sheet::new("Data", vec!["ID".to_string()]);
    data.rows.push(vec![Value::Int(1)]);
    Workbook::new()
        .with_sheet(data)
        .with_sheet(Sheet::new("Blank", Vec::new()))
        .save(&path)
        .unwrap();

    let mut client = open(&path);
    let err = client.execute_query("SELECT * FROM [Blank$]").unwrap_err();
    assert!(err.to_string().contains("is empty"));
}

#[test]
fn test_failed_statement_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let before = std::fs::read(&path).unwrap();
    let mut client = open(&path);

    let err = client
        .execute_query("UPDATE [Sheet1$] SET MISSING = 1")
        .unwrap_err();
    assert!(err.to_string().contains("Unknown column 'MISSING'"));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_read_only_handle_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let config = ConnectionConfig {
        read_only: true,
        ..ConnectionConfig::for_path(&path)
    };
    let mut client = db::connect(&config).unwrap();

    assert!(client.execute_query("SELECT * FROM [Sheet1$]").is_ok());
    let err = client
        .execute_query("DELETE FROM [Sheet1$]")
        .unwrap_err();
    assert!(err.to_string().contains("read-only"));
}
