//! In-process SQL over worksheets.
//!
//! Statements are parsed with sqlparser, translated into [`Command`]s that
//! address a single sheet, and executed directly on the workbook model.

mod command;
mod engine;
mod eval;

pub use command::{
    parse_sql, parse_statements, BinaryOp, Command, DeleteCommand, Expr, InsertCommand, OrderKey,
    ParsedStatement, SelectCommand, SelectItem, UnaryOp, UpdateCommand,
};
pub use engine::execute;
pub use eval::{evaluate, matches, RowScope};
