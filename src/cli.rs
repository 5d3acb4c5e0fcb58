//! Command-line argument parsing for sheetql.
//!
//! Uses clap to parse CLI arguments.

use crate::config::ConnectionConfig;
use crate::error::{Result, SheetQlError};
use crate::output::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Query and modify Excel workbooks with SQL, one sheet per table.
#[derive(Parser, Debug)]
#[command(name = "sheetql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Workbook path, file:// URL, or ADO connection string
    /// (e.g., Provider=Microsoft.ACE.OLEDB.12.0;Data Source=book.xlsx;Extended Properties="Excel 12.0 Xml;HDR=YES;")
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// SQL to execute; may be given several times
    #[arg(short = 'e', long = "execute", value_name = "SQL")]
    pub execute: Vec<String>,

    /// File with SQL statements to execute (use "-" for stdin)
    #[arg(short = 'f', long, value_name = "PATH")]
    pub file: Option<String>,

    /// Copy this template over the workbook before executing anything
    #[arg(long, value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Write the sample template (to --template, or the default name) and exit
    #[arg(long)]
    pub init_template: bool,

    /// Treat the first row of each sheet as data (HDR=NO)
    #[arg(long)]
    pub no_header: bool,

    /// Refuse statements that modify the workbook
    #[arg(long)]
    pub read_only: bool,

    /// Allow DELETE and other destructive statements
    #[arg(long)]
    pub allow_destructive: bool,

    /// Output format: text or json
    #[arg(short = 'o', long, value_name = "FORMAT", default_value = "text")]
    pub output: String,

    /// Print the sheets and their columns
    #[arg(long)]
    pub schema: bool,

    /// Run the sample: prepare a working copy, select, update, insert, select
    #[arg(long)]
    pub demo: bool,

    /// Use named connection from config
    #[arg(short = 'c', long, value_name = "NAME")]
    pub connection: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Converts CLI arguments to a ConnectionConfig.
    ///
    /// This creates a config from CLI args only, without merging with file config.
    pub fn to_connection_config(&self) -> Result<Option<ConnectionConfig>> {
        let mut config = match &self.target {
            Some(target) => ConnectionConfig::from_connection_string(target)?,
            None if self.template.is_some() || self.no_header || self.read_only => {
                ConnectionConfig::default()
            }
            None => return Ok(None),
        };

        if self.template.is_some() {
            config.template = self.template.clone();
        }
        if self.no_header {
            config.header = false;
        }
        if self.read_only {
            config.read_only = true;
        }
        Ok(Some(config))
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// Returns the named connection to use, if specified.
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// Parses the output format from the --output argument.
    pub fn parse_output_format(&self) -> Result<OutputFormat> {
        self.output.parse().map_err(SheetQlError::config)
    }

    /// Returns true if any SQL was supplied.
    pub fn has_sql(&self) -> bool {
        !self.execute.is_empty() || self.file.is_some()
    }

    /// Validates combinations of arguments.
    pub fn validate(&self) -> Result<()> {
        self.parse_output_format()?;
        if self.demo && self.has_sql() {
            return Err(SheetQlError::config(
                "--demo runs its own statements; drop --execute and --file",
            ));
        }
        Ok(())
    }
}
