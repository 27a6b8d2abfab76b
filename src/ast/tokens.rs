/// A lexical token.
///
/// Tokens keep the exact source `text` they were read from (string literals
/// keep their quotes) and the character `index` where they start, so the
/// parser can match punctuation by text and report columns in diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Character offset of the first character of the token
    pub index: usize,

    /// Raw source text of the token
    pub text: String,

    /// Token class, with the decoded value for literals
    pub kind: TokenKind,
}

/// Token classes produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// One of `( ) { } [ ] . , ; : ?`
    Punctuation,

    /// One of `+ - * / % === !== == != < > <= >= && || ! =`
    Operator,

    /// Identifier, including keywords such as `true`, `this` or `$locals`
    ///
    /// # Examples
    /// ```text
    /// user
    /// _internal
    /// $locals
    /// ```
    Identifier,

    /// Numeric literal with its decoded value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// .5
    /// 1.5e-3
    /// ```
    Number(f64),

    /// String literal with escapes resolved
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'it\'s'
    /// "é"
    /// ```
    String(String),

    /// Optional chaining marker `?.`
    OptionalChain,
}

impl Token {
    pub fn new(index: usize, text: impl Into<String>, kind: TokenKind) -> Self {
        Token {
            index,
            text: text.into(),
            kind,
        }
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier)
    }

    /// Numeric and string literals
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, TokenKind::Number(_) | TokenKind::String(_))
    }

    /// True when the token text is one of `candidates`, or when no candidates are given.
    pub fn matches(&self, candidates: &[&str]) -> bool {
        candidates.is_empty() || candidates.contains(&self.text.as_str())
    }
}
