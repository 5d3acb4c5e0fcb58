//! Statement execution with safety classification.
//!
//! Provides isolated execution that can be tested independently of the CLI:
//! classify, check the policy, parse, then run each statement in order.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::db::{DatabaseClient, QueryResult};
use crate::error::{Result, SheetQlError};
use crate::safety::{classify_sql, ClassificationResult, StatementType};
use crate::sql::parse_statements;

/// What the executor is allowed to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Refuse anything that writes.
    pub read_only: bool,
    /// Permit destructive statements such as DELETE.
    pub allow_destructive: bool,
}

impl ExecutionPolicy {
    /// Returns why the classified SQL may not run, if it may not.
    pub fn refusal(&self, classification: &ClassificationResult) -> Option<String> {
        let kind = &classification.statement_type;
        if self.read_only && classification.writes() {
            return Some(format!("{kind} is not allowed on a read-only connection"));
        }
        if classification.is_destructive() && !self.allow_destructive {
            return Some(format!(
                "{kind} is destructive; pass --allow-destructive to run it"
            ));
        }
        None
    }
}

/// Executor that classifies SQL and runs it against a client.
pub struct QueryExecutor<'a> {
    client: &'a mut dyn DatabaseClient,
    policy: ExecutionPolicy,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new executor.
    pub fn new(client: &'a mut dyn DatabaseClient, policy: ExecutionPolicy) -> Self {
        Self { client, policy }
    }

    /// Classifies and, if the policy allows it, executes SQL text.
    ///
    /// Statements run in order; execution stops at the first failure and the
    /// outcomes of the statements before it are returned with the error.
    pub fn execute(&mut self, sql: &str) -> ExecutionResult {
        let classification = classify_sql(sql);

        // Unparseable SQL is reported by the parser below, not as a refusal.
        if classification.statement_type != StatementType::Unknown {
            if let Some(reason) = self.policy.refusal(&classification) {
                warn!(statement = %classification.statement_type, %reason, "Refused SQL");
                return ExecutionResult::Refused {
                    sql: sql.to_string(),
                    classification,
                    reason,
                };
            }
        }

        let statements = match parse_statements(sql) {
            Ok(statements) => statements,
            Err(error) => {
                return ExecutionResult::Failed {
                    completed: Vec::new(),
                    error,
                }
            }
        };

        let mut completed = Vec::with_capacity(statements.len());
        for statement in statements {
            let start = Instant::now();
            match self.client.execute(&statement.command) {
                Ok(result) => {
                    let execution_time = start.elapsed();
                    debug!(
                        sql = %statement.text,
                        rows = result.row_count,
                        rows_affected = ?result.rows_affected,
                        ?execution_time,
                        "Executed statement"
                    );
                    completed.push(QueryOutcome {
                        sql: statement.text,
                        statement_type: statement.command.statement_type(),
                        result,
                        execution_time,
                    });
                }
                Err(error) => {
                    warn!(sql = %statement.text, %error, "Statement failed");
                    return ExecutionResult::Failed { completed, error };
                }
            }
        }

        ExecutionResult::Success(completed)
    }

    /// Executes SQL text, turning refusals and failures into errors.
    pub fn run(&mut self, sql: &str) -> Result<Vec<QueryOutcome>> {
        self.execute(sql).into_result()
    }
}

/// Result of executing SQL text.
#[derive(Debug)]
pub enum ExecutionResult {
    /// Every statement executed successfully.
    Success(Vec<QueryOutcome>),
    /// The policy does not allow the SQL; nothing was executed.
    Refused {
        sql: String,
        classification: ClassificationResult,
        reason: String,
    },
    /// A statement failed; `completed` holds the ones that ran before it.
    Failed {
        completed: Vec<QueryOutcome>,
        error: SheetQlError,
    },
}

impl ExecutionResult {
    /// Converts into the outcomes, or an error for refusals and failures.
    pub fn into_result(self) -> Result<Vec<QueryOutcome>> {
        match self {
            Self::Success(outcomes) => Ok(outcomes),
            Self::Refused { reason, .. } => Err(SheetQlError::query(reason)),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

/// Outcome of one executed statement.
#[derive(Debug)]
pub struct QueryOutcome {
    /// Normalized text of the statement.
    pub sql: String,
    /// Kind of statement.
    pub statement_type: StatementType,
    /// The statement's result.
    pub result: QueryResult,
    /// How long the statement took to execute.
    pub execution_time: Duration,
}
