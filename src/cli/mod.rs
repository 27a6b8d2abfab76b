//! CLI support for safe-expression
//!
//! Provides programmatic access to the `safexpr` commands for embedding
//! in other tools.

mod check;
mod convert;
mod inspect;

pub use check::{execute_check, CheckOptions, CheckResult};
pub use convert::{json_to_value, value_to_json};
pub use inspect::{inspect, Inspection};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Compile(#[from] crate::CompileError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A result that contains itself has no JSON form
    #[error("Converting circular structure to JSON")]
    CircularStructure,

    /// No scope provided
    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,
}
