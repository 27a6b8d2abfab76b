use std::collections::VecDeque;

use thiserror::Error;
use tracing::trace;

use crate::{
    ast::{
        BinaryOp, Expr, ExprKind, ExpressionStatement, Literal, LogicalOp, MemberProperty,
        NodeId, Program, Property, PropertyKey, Token, TokenKind, UnaryOp,
    },
    lexer::{LexError, Lexer},
};

/// Grammar errors. Every variant carries the expression text for diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error(
        "Syntax Error: Token '{token}' is unexpected, expecting {expected} at column {} of the expression [{expression}] starting at [{rest}]",
        index + 1
    )]
    UnexpectedToken {
        token: String,
        index: usize,
        expected: String,
        expression: String,
        rest: String,
    },

    #[error("Unexpected end of expression: {expression}")]
    UnexpectedEndOfExpression { expression: String },

    #[error(
        "Trying to assign a value to a non l-value at column {} of the expression [{expression}]",
        index + 1
    )]
    NonAssignableTarget { index: usize, expression: String },

    #[error(
        "Syntax Error: Token '{token}' is an invalid key at column {} of the expression [{expression}]",
        index + 1
    )]
    InvalidObjectKey {
        token: String,
        index: usize,
        expression: String,
    },
}

/// Recursive descent parser, one method per precedence level.
///
/// The parser owns its token queue and pops tokens off the front as it
/// goes; a successful parse leaves the queue empty.
pub struct Parser {
    tokens: VecDeque<Token>,
    text: String,
    next_id: u32,
}

impl Parser {
    /// Tokenizes `text` and prepares a parser over the result.
    pub fn new(text: &str) -> Result<Self, LexError> {
        let tokens = Lexer::new(text).tokenize()?;
        Ok(Self::from_tokens(text, tokens))
    }

    /// Parser over an already tokenized `text`.
    pub fn from_tokens(text: &str, tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into(),
            text: text.to_string(),
            next_id: 0,
        }
    }

    /// Parses the whole token sequence into a program.
    pub fn parse(mut self) -> Result<Program, SyntaxError> {
        let program = self.program()?;
        if let Some(token) = self.tokens.front() {
            return Err(self.unexpected(token, "end of expression"));
        }
        trace!(
            statements = program.body.len(),
            nodes = self.next_id,
            "parsed program"
        );
        Ok(program)
    }

    fn node(&mut self, kind: ExprKind) -> Expr {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Expr::new(id, kind)
    }

    // ========================================
    // Token queue
    // ========================================

    /// Front token if its text is one of `candidates` (any token when empty).
    fn peek(&self, candidates: &[&str]) -> Option<&Token> {
        self.tokens
            .front()
            .filter(|token| token.matches(candidates))
    }

    /// Pops the front token if it matches.
    fn expect(&mut self, candidates: &[&str]) -> Option<Token> {
        self.peek(candidates)?;
        self.tokens.pop_front()
    }

    /// Pops the front token, failing unless it is `expected`.
    fn consume(&mut self, expected: &str) -> Result<Token, SyntaxError> {
        let token = self.peek_token()?;
        if !token.matches(&[expected]) {
            return Err(self.unexpected(token, &format!("[{expected}]")));
        }
        self.next_token()
    }

    fn peek_token(&self) -> Result<&Token, SyntaxError> {
        self.tokens.front().ok_or_else(|| self.end_of_expression())
    }

    fn next_token(&mut self) -> Result<Token, SyntaxError> {
        match self.tokens.pop_front() {
            Some(token) => Ok(token),
            None => Err(self.end_of_expression()),
        }
    }

    fn end_of_expression(&self) -> SyntaxError {
        SyntaxError::UnexpectedEndOfExpression {
            expression: self.text.clone(),
        }
    }

    fn unexpected(&self, token: &Token, expected: &str) -> SyntaxError {
        SyntaxError::UnexpectedToken {
            token: token.text.clone(),
            index: token.index,
            expected: expected.to_string(),
            expression: self.text.clone(),
            rest: self.text.chars().skip(token.index).collect(),
        }
    }

    // ========================================
    // Statements
    // ========================================

    fn program(&mut self) -> Result<Program, SyntaxError> {
        let mut body = Vec::new();
        loop {
            if !self.tokens.is_empty() && self.peek(&["}", ")", ";", "]"]).is_none() {
                body.push(ExpressionStatement {
                    expression: self.expression()?,
                });
            }
            if self.expect(&[";"]).is_none() {
                return Ok(Program {
                    body,
                    constant: false,
                });
            }
        }
    }

    pub fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.assignment()
    }

    // ========================================
    // Precedence levels, lowest first
    // ========================================

    fn assignment(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.ternary()?;
        let Some(operator) = self.expect(&["="]) else {
            return Ok(left);
        };
        if !left.is_assignable() {
            return Err(SyntaxError::NonAssignableTarget {
                index: operator.index,
                expression: self.text.clone(),
            });
        }
        let right = self.assignment()?;
        Ok(self.node(ExprKind::Assignment {
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    fn ternary(&mut self) -> Result<Expr, SyntaxError> {
        let test = self.logical_or()?;
        if self.expect(&["?"]).is_none() {
            return Ok(test);
        }
        let consequent = self.expression()?;
        self.consume(":")?;
        let alternate = self.expression()?;
        Ok(self.node(ExprKind::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }))
    }

    fn logical_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.logical_and()?;
        while self.expect(&["||"]).is_some() {
            let right = self.logical_and()?;
            left = self.node(ExprKind::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.equality()?;
        while self.expect(&["&&"]).is_some() {
            let right = self.equality()?;
            left = self.node(ExprKind::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(&["==", "!=", "===", "!=="], Self::relational)
    }

    fn relational(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(&["<", ">", "<=", ">="], Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(&["+", "-"], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(&["*", "/", "%"], Self::unary)
    }

    /// Left-associative loop shared by the binary operator levels.
    fn binary_level(
        &mut self,
        operators: &[&str],
        next: fn(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        let mut left = next(self)?;
        while let Some(token) = self.expect(operators) {
            let Some(op) = BinaryOp::from_text(&token.text) else {
                return Err(self.unexpected(&token, "a binary operator"));
            };
            let right = next(self)?;
            left = self.node(ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let Some(token) = self.expect(&["+", "-", "!"]) else {
            return self.primary();
        };
        let Some(op) = UnaryOp::from_text(&token.text) else {
            return Err(self.unexpected(&token, "a unary operator"));
        };
        let argument = self.unary()?;
        Ok(self.node(ExprKind::Unary {
            op,
            argument: Box::new(argument),
        }))
    }

    // ========================================
    // Primary expressions and postfix chains
    // ========================================

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let mut primary = if self.expect(&["("]).is_some() {
            let inner = self.expression()?;
            self.consume(")")?;
            inner
        } else if self.expect(&["["]).is_some() {
            self.array()?
        } else if self.expect(&["{"]).is_some() {
            self.object()?
        } else {
            self.atom()?
        };

        while let Some(token) = self.expect(&["(", "[", ".", "?."]) {
            primary = match token.text.as_str() {
                "(" => {
                    let arguments = self.arguments()?;
                    self.consume(")")?;
                    self.node(ExprKind::Call {
                        callee: Box::new(primary),
                        arguments,
                    })
                }
                "[" => {
                    let property = self.expression()?;
                    self.consume("]")?;
                    self.member(primary, MemberProperty::Computed(Box::new(property)), false)
                }
                "." => {
                    let name = self.identifier_name()?;
                    self.member(primary, MemberProperty::Named(name), false)
                }
                _ => {
                    if self.expect(&["["]).is_some() {
                        let property = self.expression()?;
                        self.consume("]")?;
                        self.member(primary, MemberProperty::Computed(Box::new(property)), true)
                    } else {
                        let name = self.identifier_name()?;
                        self.member(primary, MemberProperty::Named(name), true)
                    }
                }
            };
        }
        Ok(primary)
    }

    fn member(&mut self, object: Expr, property: MemberProperty, optional: bool) -> Expr {
        self.node(ExprKind::Member {
            object: Box::new(object),
            property,
            optional,
        })
    }

    /// Keywords, identifiers and literal tokens.
    fn atom(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.next_token()?;
        let kind = match &token.kind {
            TokenKind::Identifier => match token.text.as_str() {
                "this" => ExprKind::This,
                "$locals" => ExprKind::Locals,
                "true" => ExprKind::Literal(Literal::Boolean(true)),
                "false" => ExprKind::Literal(Literal::Boolean(false)),
                "null" => ExprKind::Literal(Literal::Null),
                "undefined" => ExprKind::Literal(Literal::Undefined),
                name => ExprKind::Identifier(name.to_string()),
            },
            TokenKind::Number(n) => ExprKind::Literal(Literal::Number(*n)),
            TokenKind::String(s) => ExprKind::Literal(Literal::String(s.clone())),
            _ => return Err(self.unexpected(&token, "a primary expression")),
        };
        Ok(self.node(kind))
    }

    fn identifier_name(&mut self) -> Result<String, SyntaxError> {
        let token = self.next_token()?;
        if !token.is_identifier() {
            return Err(self.unexpected(&token, "an identifier"));
        }
        Ok(token.text)
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut arguments = Vec::new();
        if self.peek_token()?.text != ")" {
            loop {
                arguments.push(self.expression()?);
                if self.expect(&[","]).is_none() {
                    break;
                }
            }
        }
        Ok(arguments)
    }

    /// `[` already consumed. Accepts a trailing comma.
    fn array(&mut self) -> Result<Expr, SyntaxError> {
        let mut elements = Vec::new();
        if self.peek_token()?.text != "]" {
            loop {
                if self.peek(&["]"]).is_some() {
                    break;
                }
                elements.push(self.expression()?);
                if self.expect(&[","]).is_none() {
                    break;
                }
            }
        }
        self.consume("]")?;
        Ok(self.node(ExprKind::Array(elements)))
    }

    /// `{` already consumed. Accepts a trailing comma.
    fn object(&mut self) -> Result<Expr, SyntaxError> {
        let mut properties = Vec::new();
        if self.peek_token()?.text != "}" {
            loop {
                if self.peek(&["}"]).is_some() {
                    break;
                }
                properties.push(self.property()?);
                if self.expect(&[","]).is_none() {
                    break;
                }
            }
        }
        self.consume("}")?;
        Ok(self.node(ExprKind::Object(properties)))
    }

    fn property(&mut self) -> Result<Property, SyntaxError> {
        let token = self.peek_token()?;

        if token.is_constant() {
            let key = match self.next_token()?.kind {
                TokenKind::Number(n) => Literal::Number(n),
                TokenKind::String(s) => Literal::String(s),
                _ => Literal::Undefined,
            };
            self.consume(":")?;
            let value = self.expression()?;
            return Ok(Property {
                key: PropertyKey::Literal(key),
                value,
            });
        }

        if token.is_identifier() {
            let name = self.identifier_name()?;
            let value = if self.expect(&[":"]).is_some() {
                self.expression()?
            } else {
                // Shorthand `{name}` reads `name`
                self.node(ExprKind::Identifier(name.clone()))
            };
            return Ok(Property {
                key: PropertyKey::Identifier(name),
                value,
            });
        }

        if token.matches(&["["]) {
            self.consume("[")?;
            let key = self.expression()?;
            self.consume("]")?;
            self.consume(":")?;
            let value = self.expression()?;
            return Ok(Property {
                key: PropertyKey::Computed(Box::new(key)),
                value,
            });
        }

        Err(SyntaxError::InvalidObjectKey {
            token: token.text.clone(),
            index: token.index,
            expression: self.text.clone(),
        })
    }
}
