//! Configuration management for sheetql.
//!
//! Handles loading configuration from TOML files and environment variables,
//! with support for named workbook connections and several connection
//! descriptor forms (ADO connection strings, `file://` URLs, plain paths).

use crate::error::{Result, SheetQlError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Provider id written into ADO-style connection strings.
pub const DEFAULT_PROVIDER: &str = "Microsoft.ACE.OLEDB.12.0";

/// Environment variable naming the workbook to open.
pub const WORKBOOK_ENV: &str = "SHEETQL_WORKBOOK";

/// Environment variable naming the template the working copy is made from.
pub const TEMPLATE_ENV: &str = "SHEETQL_TEMPLATE";

/// Main configuration structure for sheetql.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Statement execution policy.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Named workbook connections.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionConfig>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Execution policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionConfig {
    /// Permit DELETE and other destructive statements.
    #[serde(default)]
    pub allow_destructive: bool,
}

/// Workbook connection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Workbook the connection opens.
    pub path: Option<PathBuf>,

    /// Template the working copy is prepared from.
    pub template: Option<PathBuf>,

    /// Whether the first used row of each sheet names the columns.
    #[serde(default = "default_header")]
    pub header: bool,

    /// Reject statements that would write to the workbook.
    #[serde(default)]
    pub read_only: bool,

    /// Provider id from an ADO connection string. Recorded, not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

fn default_header() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            path: None,
            template: None,
            header: default_header(),
            read_only: false,
            provider: None,
        }
    }
}

impl ConnectionConfig {
    /// Creates a connection config for a workbook path.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Creates a new connection config from a connection descriptor.
    ///
    /// Accepted forms:
    /// - `Provider=...;Data Source=<path>;Extended Properties="Excel 12.0 Xml;HDR=YES;"`
    /// - `file:///path/to/book.xlsx?hdr=no&readonly=true`
    /// - a plain filesystem path
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        let conn_str = conn_str.trim();
        if conn_str.is_empty() {
            return Err(SheetQlError::config("Empty connection string"));
        }

        let is_file_url = conn_str
            .get(..7)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("file://"));
        if is_file_url {
            Self::from_file_url(conn_str)
        } else if looks_like_ado(conn_str) {
            Self::from_ado_string(conn_str)
        } else {
            Ok(Self::for_path(conn_str))
        }
    }

    fn from_file_url(conn_str: &str) -> Result<Self> {
        let url = Url::parse(conn_str)
            .map_err(|e| SheetQlError::config(format!("Invalid connection string: {e}")))?;

        let path = url
            .to_file_path()
            .map_err(|_| SheetQlError::config(format!("Invalid file URL: {conn_str}")))?;

        let mut config = Self::for_path(path);
        for (key, value) in url.query_pairs() {
            match key.to_ascii_lowercase().as_str() {
                "hdr" | "header" => config.header = parse_flag(&key, &value)?,
                "readonly" | "read_only" => config.read_only = parse_flag(&key, &value)?,
                other => debug!(key = other, "Ignoring unknown URL parameter"),
            }
        }
        Ok(config)
    }

    fn from_ado_string(conn_str: &str) -> Result<Self> {
        let mut config = Self::default();

        for (key, value) in parse_ado_pairs(conn_str)? {
            match key.as_str() {
                "provider" => config.provider = Some(value),
                "data source" => config.path = Some(PathBuf::from(value)),
                "extended properties" => {
                    for (prop, prop_value) in parse_extended_properties(&value) {
                        if prop == "hdr" {
                            config.header = parse_flag("HDR", &prop_value)?;
                        }
                    }
                }
                "mode" => config.read_only = value.eq_ignore_ascii_case("read"),
                other => debug!(key = other, "Ignoring connection string key"),
            }
        }

        if config.path.is_none() {
            return Err(SheetQlError::config(
                "Connection string has no Data Source",
            ));
        }
        Ok(config)
    }

    /// Converts the connection config to an ADO-style connection string.
    pub fn to_connection_string(&self) -> Result<String> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| SheetQlError::config("Workbook path is required"))?;
        let provider = self.provider.as_deref().unwrap_or(DEFAULT_PROVIDER);
        let hdr = if self.header { "YES" } else { "NO" };

        let mut conn_str = format!(
            "Provider={provider};Data Source={{{}}};Extended Properties=\"Excel 12.0 Xml;HDR={hdr};\"",
            path.display()
        );
        if self.read_only {
            conn_str.push_str(";Mode=Read");
        }
        Ok(conn_str)
    }

    /// Merges another config into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &ConnectionConfig) {
        if other.path.is_some() {
            self.path = other.path.clone();
        }
        if other.template.is_some() {
            self.template = other.template.clone();
        }
        if other.header != default_header() {
            self.header = other.header;
        }
        if other.read_only {
            self.read_only = true;
        }
        if other.provider.is_some() {
            self.provider = other.provider.clone();
        }
    }

    /// Applies environment variables (SHEETQL_WORKBOOK, SHEETQL_TEMPLATE) as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.path.is_none() {
            self.path = std::env::var_os(WORKBOOK_ENV).map(PathBuf::from);
        }
        if self.template.is_none() {
            self.template = std::env::var_os(TEMPLATE_ENV).map(PathBuf::from);
        }
    }

    /// Returns the workbook path, or a configuration error if none was given.
    pub fn require_path(&self) -> Result<&Path> {
        self.path.as_deref().ok_or_else(|| {
            SheetQlError::config(format!(
                "No workbook given. Pass a path or connection string, use --connection, or set {WORKBOOK_ENV}"
            ))
        })
    }

    /// Returns a short description for log and status lines.
    pub fn display_string(&self) -> String {
        let path = self
            .path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let mut flags = Vec::new();
        if !self.header {
            flags.push("HDR=NO");
        }
        if self.read_only {
            flags.push("read-only");
        }
        if flags.is_empty() {
            path
        } else {
            format!("{path} ({})", flags.join(", "))
        }
    }
}

fn looks_like_ado(conn_str: &str) -> bool {
    let lower = conn_str.to_ascii_lowercase();
    lower.contains("data source") || lower.starts_with("provider=")
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        other => Err(SheetQlError::config(format!(
            "Invalid value '{other}' for {key}; expected YES or NO"
        ))),
    }
}

/// Splits `key=value;key="quoted;value";key={braced}` into lowercase keys
/// and unquoted values.
fn parse_ado_pairs(conn_str: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut chars = conn_str.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ';') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() || key.contains(';') {
            return Err(SheetQlError::config(format!(
                "Malformed connection string near '{key}'"
            )));
        }

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let value = match chars.peek() {
            Some('"') | Some('\'') | Some('{') => {
                let open = chars.next().unwrap_or('"');
                let close = if open == '{' { '}' } else { open };
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == close => {
                            // A doubled quote stands for one literal quote.
                            if close != '}' && chars.peek() == Some(&close) {
                                chars.next();
                                value.push(close);
                            } else {
                                break;
                            }
                        }
                        Some(c) => value.push(c),
                        None => {
                            return Err(SheetQlError::config(format!(
                                "Unterminated value for '{key}' in connection string"
                            )))
                        }
                    }
                }
                // Skip anything between the closing quote and the separator.
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                }
                value
            }
            _ => {
                let value: String = chars.by_ref().take_while(|c| *c != ';').collect();
                value.trim().to_string()
            }
        };

        pairs.push((key, value));
    }

    Ok(pairs)
}

/// Parses `Excel 12.0 Xml;HDR=YES;IMEX=1` into lowercase `key=value` pairs,
/// skipping bare tokens such as the format name.
fn parse_extended_properties(props: &str) -> Vec<(String, String)> {
    props
        .split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect()
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetql")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| SheetQlError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            SheetQlError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named connection, or the default connection if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&ConnectionConfig> {
        let key = name.unwrap_or("default");
        self.connections.get(key)
    }
}
