use crate::ast::{Expr, NodeId};

/// A top-level expression.
///
/// Programs are `;`-separated sequences of these.
///
/// # Example
/// ```text
/// a = 1; b = a + 1
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub expression: Expr,
}

/// A parsed program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<ExpressionStatement>,

    /// Every statement is constant. Set by static analysis; an empty program is constant.
    pub constant: bool,
}

impl Program {
    /// Finds a node anywhere in the program by id.
    pub fn find(&self, id: NodeId) -> Option<&Expr> {
        self.body
            .iter()
            .find_map(|statement| statement.expression.find(id))
    }

    /// The single statement's expression, if the program has exactly one.
    pub fn single_expression(&self) -> Option<&Expr> {
        match self.body.as_slice() {
            [statement] => Some(&statement.expression),
            _ => None,
        }
    }
}
