//! Error types for sheetql.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for sheetql operations.
#[derive(Error, Debug)]
pub enum SheetQlError {
    /// Opening a workbook failed (missing file, unreadable format, bad descriptor).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query errors (unsupported syntax, unknown sheet or column, policy refusal).
    #[error("Query error: {0}")]
    Query(String),

    /// Reading or writing workbook contents failed.
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// Filesystem errors outside of workbook parsing (template copy, temp files).
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SheetQlError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a workbook error with the given message.
    pub fn workbook(msg: impl Into<String>) -> Self {
        Self::Workbook(msg.into())
    }

    /// Creates an I/O error with the given message.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Workbook(_) => "Workbook Error",
            Self::Io(_) => "I/O Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using SheetQlError.
pub type Result<T> = std::result::Result<T, SheetQlError>;
