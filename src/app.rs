//! Core orchestrator for sheetql.
//!
//! Resolves the connection, opens the workbook, runs each SQL source
//! through the executor and writes rendered results.

use std::io::{Read, Write};
use std::path::PathBuf;

use tracing::{info, warn};

use crate::cli::Cli;
use crate::config::{Config, ConnectionConfig};
use crate::db::{self, DatabaseClient};
use crate::demo::{self, DEFAULT_TEMPLATE};
use crate::error::{Result, SheetQlError};
use crate::output::OutputRenderer;
use crate::query::{ExecutionPolicy, ExecutionResult, QueryExecutor};
use crate::workbook::prepare_working_copy;

/// Resolves the final connection configuration.
///
/// Precedence, highest first:
/// 1. CLI target and flags
/// 2. Named connection from config (`--connection`)
/// 3. Default connection from config
/// 4. Environment variables
pub fn resolve_connection(cli: &Cli, config: &Config) -> Result<ConnectionConfig> {
    let mut connection = match (&cli.target, cli.connection_name()) {
        (Some(_), _) => ConnectionConfig::default(),
        (None, Some(name)) => config.get_connection(Some(name)).cloned().ok_or_else(|| {
            SheetQlError::config(format!("Connection '{name}' not found in config file"))
        })?,
        (None, None) => config.get_connection(None).cloned().unwrap_or_default(),
    };

    if let Some(cli_connection) = cli.to_connection_config()? {
        connection.merge(&cli_connection);
    }
    connection.apply_env_defaults();
    Ok(connection)
}

/// Collects SQL from every `--execute` and then from `--file`.
///
/// A file of `-` is read from `stdin`.
pub fn read_sql_sources(cli: &Cli, stdin: &mut impl Read) -> Result<Vec<String>> {
    let mut sources = cli.execute.clone();

    match cli.file.as_deref() {
        Some("-") => {
            let mut sql = String::new();
            stdin
                .read_to_string(&mut sql)
                .map_err(|e| SheetQlError::io(format!("Cannot read SQL from stdin: {e}")))?;
            sources.push(sql);
        }
        Some(path) => {
            let sql = std::fs::read_to_string(path)
                .map_err(|e| SheetQlError::io(format!("Cannot read SQL file {path}: {e}")))?;
            sources.push(sql);
        }
        None => {}
    }

    Ok(sources)
}

/// Runs one invocation of the command line.
pub fn run(cli: &Cli, config: &Config, out: &mut impl Write) -> Result<()> {
    cli.validate()?;
    let renderer = OutputRenderer::new(cli.parse_output_format()?);
    let connection = resolve_connection(cli, config)?;
    info!("Connection: {}", connection.display_string());

    if cli.init_template {
        let path = connection
            .template
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE));
        demo::init_template(&path)?;
        emit(out, &format!("Wrote sample template to {}\n", path.display()))?;
        return Ok(());
    }

    if cli.demo {
        return demo::run_demo(&connection, &renderer, out);
    }

    if let Some(template) = cli.template.as_deref() {
        prepare_working_copy(template, connection.require_path()?)?;
    }

    let sources = read_sql_sources(cli, &mut std::io::stdin().lock())?;
    let mut client = db::connect(&connection)?;

    if cli.schema || sources.is_empty() {
        if sources.is_empty() && !cli.schema {
            warn!("No SQL given; showing the workbook schema");
        }
        emit(out, &renderer.render_schema(&client.introspect_schema()?))?;
    }

    let policy = ExecutionPolicy {
        read_only: connection.read_only,
        allow_destructive: cli.allow_destructive || config.execution.allow_destructive,
    };
    run_sources(client.as_mut(), policy, &sources, &renderer, out)?;

    client.close()
}

/// Executes each source in order, stopping at the first refusal or failure.
///
/// Outcomes completed before a failure are still written.
fn run_sources(
    client: &mut dyn DatabaseClient,
    policy: ExecutionPolicy,
    sources: &[String],
    renderer: &OutputRenderer,
    out: &mut impl Write,
) -> Result<()> {
    let mut executor = QueryExecutor::new(client, policy);

    for sql in sources {
        match executor.execute(sql) {
            ExecutionResult::Success(outcomes) => {
                for outcome in outcomes {
                    emit(out, &renderer.render_outcome(outcome))?;
                }
            }
            ExecutionResult::Refused {
                sql,
                classification,
                reason,
            } => {
                if let Some(warning) = &classification.warning {
                    warn!(%sql, "{warning}");
                }
                return Err(SheetQlError::query(reason));
            }
            ExecutionResult::Failed { completed, error } => {
                for outcome in completed {
                    emit(out, &renderer.render_outcome(outcome))?;
                }
                return Err(error);
            }
        }
    }
    Ok(())
}

fn emit(out: &mut impl Write, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())
        .map_err(|e| SheetQlError::io(format!("Cannot write output: {e}")))
}
