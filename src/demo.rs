//! The sample run: prepare a working copy, show the sheet, update one row,
//! insert one row, show the sheet again.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::config::ConnectionConfig;
use crate::db;
use crate::error::{Result, SheetQlError};
use crate::output::OutputRenderer;
use crate::query::{ExecutionPolicy, QueryExecutor};
use crate::workbook::{prepare_working_copy, write_sample_template};

/// Template used when the connection names none.
pub const DEFAULT_TEMPLATE: &str = "sample-data-template.xlsx";

/// Working copy used when the connection names none.
pub const DEFAULT_TARGET: &str = "sample-data.xlsx";

const SELECT_ALL: &str = "SELECT * FROM [Sheet1$]";
const UPDATE_ROW: &str = "UPDATE [Sheet1$] SET COL2 = 'update_by_node' WHERE COL1 = 3";

/// INSERT of the demo's fourth row, stamped with the given local time text.
pub fn insert_statement(timestamp: &str) -> String {
    format!("INSERT INTO [Sheet1$] VALUES(4, 'insert_by_node', '{timestamp}')")
}

/// Current local time as `2024/1/2 3:04:05`.
pub fn local_timestamp() -> String {
    Local::now().format("%Y/%-m/%-d %-H:%M:%S").to_string()
}

/// Runs the sample against the connection's template and working copy.
///
/// A missing template is generated first.
pub fn run_demo(
    connection: &ConnectionConfig,
    renderer: &OutputRenderer,
    out: &mut impl Write,
) -> Result<()> {
    let template = connection
        .template
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE));
    let target = connection
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET));

    if !template.exists() {
        write_sample_template(&template)?;
    }
    prepare_working_copy(&template, &target)?;

    let config = ConnectionConfig {
        path: Some(target.clone()),
        ..connection.clone()
    };
    let mut client = db::connect(&config)?;
    info!(target = %target.display(), "Running sample statements");

    {
        let mut executor = QueryExecutor::new(client.as_mut(), ExecutionPolicy::default());

        emit(out, &heading("Before"))?;
        for outcome in executor.run(SELECT_ALL)? {
            emit(out, &renderer.render_outcome(outcome))?;
        }

        let mutations = format!("{UPDATE_ROW}; {}", insert_statement(&local_timestamp()));
        for outcome in executor.run(&mutations)? {
            emit(out, &renderer.render_outcome(outcome))?;
        }

        emit(out, &heading("After"))?;
        for outcome in executor.run(SELECT_ALL)? {
            emit(out, &renderer.render_outcome(outcome))?;
        }
    }

    client.close()
}

fn heading(label: &str) -> String {
    format!("{label} --------------\n")
}

fn emit(out: &mut impl Write, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())
        .map_err(|e| SheetQlError::io(format!("Cannot write output: {e}")))
}

/// Writes the sample template to `path`, failing if a file is already there.
pub fn init_template(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(SheetQlError::io(format!(
            "Refusing to overwrite existing file: {}",
            path.display()
        )));
    }
    write_sample_template(path)
}
