//! A safe expression language compiled to closures.
//!
//! Expressions such as `user?.address?.street`, `items[0].price * qty` or
//! `total = subtotal + tax` are tokenized, parsed, analysed and compiled into
//! evaluators that run against a caller-supplied scope. Nothing an expression
//! can name reaches outside that scope.
//!
//! ```
//! use safe_expression::{compile, Value};
//!
//! let expr = compile("a.b.c ? 'yes' : 'no'").unwrap();
//! let scope = Value::object([("a", Value::object([("b", Value::from(23))]))]);
//! assert_eq!(expr.evaluate(&scope, None).unwrap(), Value::from("no"));
//! ```
pub mod analysis;
pub mod ast;
pub mod cache;
pub mod cli;
pub mod compiler;
pub mod expression;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod value;

pub use ast::{Expr, ExprKind, NodeId, Program, Purity, Token, TokenKind};
pub use cache::ExpressionCache;
pub use expression::{
    compile, compile_with, Assigner, CompileError, CompiledExpression, ExpressionParser, Input,
    Interceptor, ParseOptions, ParsedExpression,
};
pub use lexer::{LexError, Lexer};
pub use parser::{Parser, SyntaxError};
pub use value::{EvalError, Function, Value};
