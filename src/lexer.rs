use thiserror::Error;
use tracing::trace;

use crate::ast::{Token, TokenKind};

/// Operators recognised by longest match over a 1-3 character window.
const OPERATORS: [&str; 17] = [
    "+", "-", "*", "/", "%", "===", "!==", "==", "!=", "<", ">", "<=", ">=", "&&", "||", "!", "=",
];

const PUNCTUATION: &str = "(){}[].,;:?";

/// Errors raised while tokenizing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Lexer error: unexpected character '{character}' at column {} in expression [{expression}]", index + 1)]
    UnexpectedCharacter {
        index: usize,
        character: char,
        expression: String,
    },

    #[error("Lexer error: invalid unicode escape [\\u{hex}] at column {} in expression [{expression}]", index + 1)]
    InvalidUnicodeEscape {
        index: usize,
        hex: String,
        expression: String,
    },

    #[error("Lexer error: invalid exponent at column {} in expression [{expression}]", index + 1)]
    InvalidExponent { index: usize, expression: String },

    #[error("Lexer error: unterminated quote starting at column {} in expression [{expression}]", start + 1)]
    UnterminatedQuote { start: usize, expression: String },
}

impl LexError {
    /// Character offset the error points at.
    pub fn index(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { index, .. }
            | LexError::InvalidUnicodeEscape { index, .. }
            | LexError::InvalidExponent { index, .. } => *index,
            LexError::UnterminatedQuote { start, .. } => *start,
        }
    }
}

/// Single pass, left-to-right tokenizer.
///
/// A lexer owns its input; [`tokenize`](Lexer::tokenize) consumes it, so every
/// parse starts from a fresh token sequence.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn text(&self) -> String {
        self.input.iter().collect()
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.input[start..end.min(self.input.len())].iter().collect()
    }

    fn is_whitespace(ch: char) -> bool {
        matches!(ch, ' ' | '\r' | '\t' | '\n' | '\u{000B}' | '\u{00A0}')
    }

    fn is_identifier_start(ch: char) -> bool {
        ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
    }

    fn is_identifier_continue(ch: char) -> bool {
        Self::is_identifier_start(ch) || ch.is_ascii_digit()
    }

    fn is_exponent_operator(ch: Option<char>) -> bool {
        matches!(ch, Some('+' | '-' | '0'..='9'))
    }

    /// Tokenizes the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        trace!(count = tokens.len(), "tokenized expression");
        Ok(tokens)
    }

    /// Reads the next token, skipping whitespace. `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        while let Some(ch) = self.current_char() {
            if !Self::is_whitespace(ch) {
                break;
            }
            self.advance();
        }

        let Some(ch) = self.current_char() else {
            return Ok(None);
        };
        let start = self.position;
        let next = self.peek_char(1);

        let token = match ch {
            '"' | '\'' => self.read_string(ch)?,
            c if c.is_ascii_digit() => self.read_number()?,
            '.' if next.is_some_and(|c| c.is_ascii_digit()) => self.read_number()?,
            c if Self::is_identifier_start(c) => self.read_identifier(),
            // `a?.5:1` is a ternary, not an optional chain
            '?' if next == Some('.') && !self.peek_char(2).is_some_and(|c| c.is_ascii_digit()) => {
                self.position += 2;
                Token::new(start, "?.", TokenKind::OptionalChain)
            }
            c if PUNCTUATION.contains(c) => {
                self.advance();
                Token::new(start, c.to_string(), TokenKind::Punctuation)
            }
            _ => self.read_operator(ch)?,
        };
        Ok(Some(token))
    }

    fn read_operator(&mut self, ch: char) -> Result<Token, LexError> {
        let start = self.position;
        let operator = (1..=3)
            .rev()
            .map(|len| self.slice(start, start + len))
            .find(|candidate| OPERATORS.contains(&candidate.as_str()));

        match operator {
            Some(text) => {
                self.position += text.chars().count();
                Ok(Token::new(start, text, TokenKind::Operator))
            }
            None => Err(LexError::UnexpectedCharacter {
                index: start,
                character: ch,
                expression: self.text(),
            }),
        }
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.position;
        self.advance();
        while let Some(ch) = self.current_char() {
            if !Self::is_identifier_continue(ch) {
                break;
            }
            self.advance();
        }
        Token::new(start, self.slice(start, self.position), TokenKind::Identifier)
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut number = String::new();
        let mut seen_dot = false;
        let mut seen_exponent = false;

        while let Some(raw) = self.current_char() {
            let ch = raw.to_ascii_lowercase();
            let next = self.peek_char(1);

            if ch.is_ascii_digit() {
                number.push(ch);
            } else if ch == '.' && !seen_dot && !seen_exponent {
                seen_dot = true;
                number.push(ch);
            } else if ch == 'e' && !seen_exponent && Self::is_exponent_operator(next) {
                seen_exponent = true;
                number.push(ch);
            } else if matches!(ch, '+' | '-') && number.ends_with('e') {
                if !next.is_some_and(|c| c.is_ascii_digit()) {
                    return Err(LexError::InvalidExponent {
                        index: self.position,
                        expression: self.text(),
                    });
                }
                number.push(ch);
            } else {
                break;
            }
            self.advance();
        }

        let value = number.parse::<f64>().unwrap_or(f64::NAN);
        Ok(Token::new(start, number, TokenKind::Number(value)))
    }

    fn read_string(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.position;
        self.advance(); // opening quote

        let mut value = String::new();
        let mut pending_high_surrogate: Option<u32> = None;

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    if pending_high_surrogate.take().is_some() {
                        value.push(char::REPLACEMENT_CHARACTER);
                    }
                    return Ok(Token::new(
                        start,
                        self.slice(start, self.position),
                        TokenKind::String(value),
                    ));
                }
                '\\' => {
                    self.advance();
                    let Some(escaped) = self.current_char() else {
                        break;
                    };
                    if escaped == 'u' {
                        let unit = self.read_unicode_escape()?;
                        push_utf16_unit(&mut value, &mut pending_high_surrogate, unit);
                        continue;
                    }
                    flush_surrogate(&mut value, &mut pending_high_surrogate);
                    value.push(match escaped {
                        'n' => '\n',
                        'f' => '\u{000C}',
                        'r' => '\r',
                        't' => '\t',
                        'v' => '\u{000B}',
                        // Identity escape, covers \' \" and \\
                        other => other,
                    });
                    self.advance();
                }
                _ => {
                    flush_surrogate(&mut value, &mut pending_high_surrogate);
                    value.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedQuote {
            start,
            expression: self.text(),
        })
    }

    /// Reads `uXXXX` with the cursor on the `u`, leaving it after the last hex digit.
    fn read_unicode_escape(&mut self) -> Result<u32, LexError> {
        let hex = self.slice(self.position + 1, self.position + 5);
        if hex.len() != 4 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LexError::InvalidUnicodeEscape {
                index: self.position - 1,
                hex,
                expression: self.text(),
            });
        }
        self.position += 5;
        u32::from_str_radix(&hex, 16).map_err(|_| LexError::InvalidUnicodeEscape {
            index: self.position - 6,
            hex,
            expression: self.text(),
        })
    }
}

/// Appends one UTF-16 code unit, pairing surrogates written as consecutive escapes.
fn push_utf16_unit(value: &mut String, pending: &mut Option<u32>, unit: u32) {
    match (pending.take(), unit) {
        (Some(high), 0xDC00..=0xDFFF) => {
            let code = 0x10000 + ((high - 0xD800) << 10) + (unit - 0xDC00);
            value.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
        (previous, 0xD800..=0xDBFF) => {
            if previous.is_some() {
                value.push(char::REPLACEMENT_CHARACTER);
            }
            *pending = Some(unit);
        }
        (previous, _) => {
            if previous.is_some() {
                value.push(char::REPLACEMENT_CHARACTER);
            }
            value.push(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
    }
}

fn flush_surrogate(value: &mut String, pending: &mut Option<u32>) {
    if pending.take().is_some() {
        value.push(char::REPLACEMENT_CHARACTER);
    }
}

/// Tokenizes `text` in one pass.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(text).tokenize()
}

#[test]
fn test_keywords_are_identifiers() {
    let tokens = tokenize("true this $locals undefined").unwrap();
    assert!(tokens.iter().all(Token::is_identifier));
    assert_eq!(tokens[2].text, "$locals");
}

#[test]
fn test_member_chain() {
    let tokens = tokenize("a?.b[0]").unwrap();
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "?.", "b", "[", "0", "]"]);
    assert_eq!(tokens[1].kind, TokenKind::OptionalChain);
    assert_eq!(tokens[4].kind, TokenKind::Number(0.0));
}
