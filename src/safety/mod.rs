//! Statement safety classification.
//!
//! Parses SQL and classifies it as safe, mutating, or destructive so the
//! executor can refuse writes on read-only connections and hold back
//! destructive statements unless they were explicitly allowed.

mod parser;

pub use parser::{classify_sql, SqlClassifier};

use std::fmt;

use serde::Serialize;

/// Safety level classification for SQL statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SafetyLevel {
    /// Read-only statements (SELECT).
    Safe,
    /// Statements that change cell values (INSERT, UPDATE).
    Mutating,
    /// Statements that remove rows or structure (DELETE, DROP, TRUNCATE,
    /// ALTER), and anything that could not be classified.
    Destructive,
}

impl SafetyLevel {
    /// Returns true if executing the statement writes to the workbook.
    pub fn writes(&self) -> bool {
        matches!(self, Self::Mutating | Self::Destructive)
    }

    /// Returns true if the statement needs `allow_destructive`.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Destructive)
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "Safe"),
            Self::Mutating => write!(f, "Mutating"),
            Self::Destructive => write!(f, "Destructive"),
        }
    }
}

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    /// Multiple statements detected; contains the most dangerous type.
    Multiple(Box<StatementType>),
    /// Statement type could not be determined.
    Unknown,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Multiple(inner) => write!(f, "Multiple ({})", inner),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

impl Serialize for StatementType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of classifying SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// The determined safety level.
    pub level: SafetyLevel,
    /// The type of statement(s) detected.
    pub statement_type: StatementType,
    /// Optional warning message for the user.
    pub warning: Option<String>,
}

impl ClassificationResult {
    /// Creates a new classification result.
    pub fn new(level: SafetyLevel, statement_type: StatementType) -> Self {
        Self {
            level,
            statement_type,
            warning: None,
        }
    }

    /// Creates a classification result with a warning message.
    pub fn with_warning(
        level: SafetyLevel,
        statement_type: StatementType,
        warning: impl Into<String>,
    ) -> Self {
        Self {
            level,
            statement_type,
            warning: Some(warning.into()),
        }
    }

    /// Returns true if executing the SQL writes to the workbook.
    pub fn writes(&self) -> bool {
        self.level.writes()
    }

    /// Returns true if the SQL needs `allow_destructive`.
    pub fn is_destructive(&self) -> bool {
        self.level.is_destructive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_level_display() {
        assert_eq!(SafetyLevel::Safe.to_string(), "Safe");
        assert_eq!(SafetyLevel::Mutating.to_string(), "Mutating");
        assert_eq!(SafetyLevel::Destructive.to_string(), "Destructive");
    }

    #[test]
    fn test_safety_level_writes() {
        assert!(!SafetyLevel::Safe.writes());
        assert!(SafetyLevel::Mutating.writes());
        assert!(SafetyLevel::Destructive.writes());
    }

    #[test]
    fn test_safety_level_is_destructive() {
        assert!(!SafetyLevel::Safe.is_destructive());
        assert!(!SafetyLevel::Mutating.is_destructive());
        assert!(SafetyLevel::Destructive.is_destructive());
    }

    #[test]
    fn test_safety_level_ordering() {
        assert!(SafetyLevel::Safe < SafetyLevel::Mutating);
        assert!(SafetyLevel::Mutating < SafetyLevel::Destructive);
    }

    #[test]
    fn test_statement_type_display() {
        assert_eq!(StatementType::Select.to_string(), "SELECT");
        assert_eq!(StatementType::Insert.to_string(), "INSERT");
        assert_eq!(StatementType::Delete.to_string(), "DELETE");
        assert_eq!(
            StatementType::Multiple(Box::new(StatementType::Delete)).to_string(),
            "Multiple (DELETE)"
        );
    }

    #[test]
    fn test_statement_type_serializes_as_text() {
        let json = serde_json::to_string(&StatementType::Update).unwrap();
        assert_eq!(json, r#""UPDATE""#);
    }

    #[test]
    fn test_classification_result_with_warning() {
        let result = ClassificationResult::with_warning(
            SafetyLevel::Destructive,
            StatementType::Delete,
            "This will delete rows",
        );
        assert_eq!(result.level, SafetyLevel::Destructive);
        assert_eq!(result.warning, Some("This will delete rows".to_string()));
        assert!(result.writes());
        assert!(result.is_destructive());
    }
}
