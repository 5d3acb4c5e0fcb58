//! Opening workbooks from paths, URLs and ADO connection strings.

use sheetql::config::ConnectionConfig;
use sheetql::db::{self, Value};
use sheetql::error::SheetQlError;

#[test]
fn test_connect_with_ado_string() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let conn_str = format!(
        r#"Provider=Microsoft.ACE.OLEDB.12.0;Data Source={};Extended Properties="Excel 12.0 Xml;HDR=YES;""#,
        path.display()
    );

    let config = ConnectionConfig::from_connection_string(&conn_str).unwrap();
    let mut client = db::connect(&config).unwrap();

    let schema = client.introspect_schema().unwrap();
    let table = schema.table("Sheet1").unwrap();
    assert_eq!(table.columns.len(), 3);
    assert_eq!(table.row_count, 3);

    let result = client.execute_query("SELECT COUNT(*) FROM [Sheet1$]");
    assert!(result.is_err());
    let result = client.execute_query("SELECT COL1 FROM Sheet1$ ORDER BY COL1 DESC").unwrap();
    assert_eq!(result.rows[0][0], Value::Int(3));
    client.close().unwrap();
}

#[test]
fn test_connection_string_round_trip_opens_same_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());

    let conn_str = ConnectionConfig::for_path(&path).to_connection_string().unwrap();
    let config = ConnectionConfig::from_connection_string(&conn_str).unwrap();
    assert_eq!(config.path.as_deref(), Some(path.as_path()));
    assert!(config.header);

    assert!(db::connect(&config).is_ok());
}

#[test]
fn test_without_header_columns_are_numbered() {
    let dir = tempfile::tempdir().unwrap();
    let path = super::sample_workbook(dir.path());
    let config = ConnectionConfig {
        header: false,
        ..ConnectionConfig::for_path(&path)
    };
    let mut client = db::connect(&config).unwrap();

    let result = client.execute_query("SELECT F1, F2 FROM [Sheet1$]").unwrap();
    // The header row is data now.
    assert_eq!(result.rows.len(), 4);
    assert_eq!(result.rows[0], vec![Value::from("COL1"), Value::from("COL2")]);
}

#[test]
fn test_connect_missing_file_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConnectionConfig::for_path(dir.path().join("missing.xlsx"));

    let err = db::connect(&config).err().unwrap();
    assert!(matches!(err, SheetQlError::Connection(_)));
    assert_eq!(err.category(), "Connection Error");
}

#[test]
fn test_connect_without_path_is_config_error() {
    let err = db::connect(&ConnectionConfig::default()).err().unwrap();
    assert!(matches!(err, SheetQlError::Config(_)));
}
