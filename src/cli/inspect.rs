//! Report what the compiler learned about an expression

use super::CliError;
use crate::{lexer, ExpressionParser};

/// Compiled metadata of an expression
#[derive(Debug, Clone, PartialEq)]
pub struct Inspection {
    pub literal: bool,
    pub constant: bool,
    pub one_time: bool,
    pub assignable: bool,
    /// Number of watched inputs, if any were found
    pub inputs: Option<usize>,
    /// Token texts, after the `::` prefix
    pub tokens: Vec<String>,
}

impl std::fmt::Display for Inspection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "literal:    {}", self.literal)?;
        writeln!(f, "constant:   {}", self.constant)?;
        writeln!(f, "one-time:   {}", self.one_time)?;
        writeln!(f, "assignable: {}", self.assignable)?;
        match self.inputs {
            Some(n) => writeln!(f, "inputs:     {n}")?,
            None => writeln!(f, "inputs:     none")?,
        }
        write!(f, "tokens:     {}", self.tokens.join(" "))
    }
}

/// Compile `expression` and collect its metadata
pub fn inspect(expression: &str) -> Result<Inspection, CliError> {
    let compiled = ExpressionParser::new().parse(expression)?;

    let trimmed = expression.trim();
    let source = trimmed.strip_prefix("::").unwrap_or(trimmed);
    let tokens = lexer::tokenize(source)
        .map_err(crate::CompileError::from)?
        .into_iter()
        .map(|token| token.text)
        .collect();

    Ok(Inspection {
        literal: compiled.literal(),
        constant: compiled.constant(),
        one_time: compiled.one_time(),
        assignable: compiled.assign().is_some(),
        inputs: compiled.inputs().map(<[_]>::len),
        tokens,
    })
}
