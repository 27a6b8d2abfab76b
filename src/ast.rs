//! # Abstract Syntax Tree
//!
//! This module defines the tokens and tree nodes of the expression language,
//! a small, side-effect-aware subset of arithmetic, logical and member-access
//! syntax evaluated against a data context.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes and their analysis annotations
//! - **[operators]** - Binary, logical and unary operators
//! - **[statements]** - Top-level statements and the program
//!
//! ## Quick Start
//!
//! ```text
//! user?.address?.street
//! items[0].price * quantity
//! total = subtotal + tax; total > 100 ? "free" : "paid"
//! ```
//!
//! ## Node Identity
//!
//! Each [`Expr`] carries a [`NodeId`] assigned by the parser. Static analysis
//! records watch sets as lists of ids, and the compiler uses them to swap a
//! watched sub-expression for a lookup into caller-supplied input values.
//!
//! ## Keywords
//!
//! `this` and `$locals` produce the [`ExprKind::This`] and
//! [`ExprKind::Locals`] nodes; `true`, `false`, `null` and `undefined`
//! produce literals. All other identifiers resolve against the locals object
//! first and the scope second.
pub mod expressions;
pub mod operators;
pub mod statements;
pub mod tokens;

pub use expressions::{
    Annotation, Expr, ExprKind, Literal, MemberProperty, NodeId, Property, PropertyKey, Purity,
};
pub use operators::{BinaryOp, LogicalOp, UnaryOp};
pub use statements::{ExpressionStatement, Program};
pub use tokens::{Token, TokenKind};
