//! Evaluate expressions against JSON input

use super::{json_to_value, value_to_json, CliError};
use crate::ExpressionParser;

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression to evaluate
    pub expression: String,
    /// JSON scope string
    pub input: Option<String>,
    /// JSON locals string
    pub locals: Option<String>,
    /// Pretty-print the output
    pub pretty: bool,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Expression evaluated successfully with JSON output
    Success(serde_json::Value),
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let compiled = ExpressionParser::new().parse(&options.expression)?;

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let scope = json_to_value(serde_json::from_str(json_str)?);
    let locals = options
        .locals
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()?
        .map(json_to_value);

    let result = compiled.evaluate(&scope, locals.as_ref())?;
    Ok(CheckResult::Success(value_to_json(&result)?))
}
