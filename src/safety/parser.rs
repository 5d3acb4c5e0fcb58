//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with the T-SQL dialect, which accepts bracketed sheet
//! names such as `[Sheet1$]`.

use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;

use crate::error::{Result, SheetQlError};

use super::{ClassificationResult, SafetyLevel, StatementType};

const DESTRUCTIVE_WARNING: &str = "This action cannot be undone.";

/// SQL classifier that parses and classifies SQL statements.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: MsSqlDialect,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a new SQL classifier.
    pub fn new() -> Self {
        Self {
            dialect: MsSqlDialect {},
        }
    }

    /// Classifies a SQL string and returns the classification result.
    ///
    /// SQL that cannot be parsed is treated as destructive, with a warning.
    pub fn classify(&self, sql: &str) -> ClassificationResult {
        match self.parse_and_classify(sql) {
            Ok(result) => result,
            Err(_) => ClassificationResult::with_warning(
                SafetyLevel::Destructive,
                StatementType::Unknown,
                "Could not parse SQL. Please review carefully.",
            ),
        }
    }

    fn parse_and_classify(&self, sql: &str) -> Result<ClassificationResult> {
        let statements = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| SheetQlError::query(format!("SQL parse error: {}", e)))?;

        if statements.is_empty() {
            return Ok(ClassificationResult::with_warning(
                SafetyLevel::Destructive,
                StatementType::Unknown,
                "Empty SQL statement",
            ));
        }

        let (level, stmt_type) = if statements.len() == 1 {
            classify_statement(&statements[0])
        } else {
            // Multiple statements: the most dangerous one decides
            let (level, stmt_type) = statements
                .iter()
                .map(classify_statement)
                .fold((SafetyLevel::Safe, StatementType::Unknown), |max, next| {
                    if next.0 > max.0 {
                        next
                    } else {
                        max
                    }
                });
            (level, StatementType::Multiple(Box::new(stmt_type)))
        };

        Ok(if level.is_destructive() {
            ClassificationResult::with_warning(level, stmt_type, DESTRUCTIVE_WARNING)
        } else {
            ClassificationResult::new(level, stmt_type)
        })
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_sql(sql: &str) -> ClassificationResult {
    SqlClassifier::new().classify(sql)
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> (SafetyLevel, StatementType) {
    match statement {
        Statement::Query(query) => classify_query(query),

        // Mutating: cell values change, rows are kept
        Statement::Insert(_) => (SafetyLevel::Mutating, StatementType::Insert),
        Statement::Update { .. } => (SafetyLevel::Mutating, StatementType::Update),

        // Destructive: rows or structure removed
        Statement::Delete(_) => (SafetyLevel::Destructive, StatementType::Delete),
        Statement::Drop { .. } => (SafetyLevel::Destructive, StatementType::Drop),
        Statement::Truncate { .. } => (SafetyLevel::Destructive, StatementType::Truncate),
        Statement::AlterTable { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::CreateTable { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateIndex { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateView { .. } => (SafetyLevel::Destructive, StatementType::Create),

        // Conservative default: treat unknown statements as destructive
        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

/// Classifies a query body, recursing through set operations and nesting.
fn classify_query(query: &Query) -> (SafetyLevel, StatementType) {
    classify_set_expr(&query.body)
}

fn classify_set_expr(set_expr: &SetExpr) -> (SafetyLevel, StatementType) {
    match set_expr {
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => classify_statement(stmt),
        SetExpr::Query(query) => classify_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            let left = classify_set_expr(left);
            let right = classify_set_expr(right);
            if left.0 >= right.0 {
                left
            } else {
                right
            }
        }
        _ => (SafetyLevel::Safe, StatementType::Select),
    }
}
