//! Statement execution for sheetql.
//!
//! This module isolates SQL classification, policy checks and execution
//! from the command-line front end.

pub mod executor;

pub use executor::{ExecutionPolicy, ExecutionResult, QueryExecutor, QueryOutcome};
