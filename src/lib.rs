//! sheetql - Excel worksheets as SQL tables.
//!
//! This library exposes the core modules for the binary and for
//! integration tests.

pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod demo;
pub mod error;
pub mod logging;
pub mod output;
pub mod query;
pub mod safety;
pub mod sql;
pub mod workbook;
