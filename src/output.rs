//! Output formatting for statement results.
//!
//! Provides two formats: text (one line per record) and JSON (one document
//! per statement).

use serde::Serialize;

use crate::db::{ColumnInfo, Record, Schema};
use crate::query::QueryOutcome;
use crate::safety::StatementType;

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per record.
    #[default]
    Text,
    /// One JSON document per statement.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "Invalid output format: {s}. Expected: text or json"
            )),
        }
    }
}

/// JSON output structure for one statement.
#[derive(Debug, Serialize)]
struct JsonOutcome {
    statement: String,
    statement_type: StatementType,
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<ColumnInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<Vec<Record>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows_affected: Option<usize>,
    execution_time_ms: u64,
}

/// Formats statement outcomes and schemas.
pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    /// Creates a new renderer.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats one outcome. The result's records are consumed.
    pub fn render_outcome(&self, outcome: QueryOutcome) -> String {
        match self.format {
            OutputFormat::Text => self.format_text(outcome),
            OutputFormat::Json => self.format_json(outcome),
        }
    }

    /// Formats the workbook schema.
    pub fn render_schema(&self, schema: &Schema) -> String {
        match self.format {
            OutputFormat::Text => schema.format_for_display(),
            OutputFormat::Json => to_json(schema),
        }
    }

    /// Formats as text: the field count and a line per record for SELECT,
    /// an affected-row count otherwise.
    fn format_text(&self, outcome: QueryOutcome) -> String {
        if let Some(count) = outcome.result.rows_affected {
            return format!("{count} row(s) affected\n");
        }

        let records = outcome.result.into_records();
        let mut out = format!("Result field count: {}\n", records.field_count());
        for record in records {
            let line = record
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    /// Formats as JSON.
    fn format_json(&self, outcome: QueryOutcome) -> String {
        let execution_time_ms = outcome.execution_time.as_millis() as u64;
        let json_output = if outcome.result.is_mutation() {
            JsonOutcome {
                statement: outcome.sql,
                statement_type: outcome.statement_type,
                columns: None,
                records: None,
                rows_affected: outcome.result.rows_affected,
                execution_time_ms,
            }
        } else {
            let columns = outcome.result.columns.clone();
            JsonOutcome {
                statement: outcome.sql,
                statement_type: outcome.statement_type,
                columns: Some(columns),
                records: Some(outcome.result.into_records().collect()),
                rows_affected: None,
                execution_time_ms,
            }
        };
        to_json(&json_output)
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    let mut json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}", e));
    json.push('\n');
    json
}
