use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Name of a token category, as assigned by a tokenizer or by a token
/// wrapper in a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenType(Cow<'static, str>);

impl TokenType {
    /// Comment tokens are diverted into trivia during AST construction.
    pub const COMMENT: TokenType = TokenType::new("COMMENT");

    /// End-of-input marker type, conventionally emitted last by tokenizers.
    pub const EOF: TokenType = TokenType::new("EOF");

    /// Type given to leaves that matched without a token wrapper. The exact
    /// name is not a contract.
    pub const UNDEFINED: TokenType = TokenType::new("TOKEN");

    pub const fn new(name: &'static str) -> Self {
        TokenType(Cow::Borrowed(name))
    }

    pub fn named(name: impl Into<String>) -> Self {
        TokenType(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of non-significant text attached to a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriviaKind {
    Comment,
    SkippedText,
}

/// A piece of non-significant input (comment or skipped text) carried as
/// leading trivia of the token that follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Trivia {
    kind: TriviaKind,
    token: Token,
}

impl Trivia {
    pub fn comment(token: Token) -> Self {
        Trivia {
            kind: TriviaKind::Comment,
            token,
        }
    }

    pub fn skipped(token: Token) -> Self {
        Trivia {
            kind: TriviaKind::SkippedText,
            token,
        }
    }

    pub fn kind(&self) -> TriviaKind {
        self.kind
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn is_comment(&self) -> bool {
        self.kind == TriviaKind::Comment
    }
}

/// A token: typed slice of input with its source position and any leading
/// trivia. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    token_type: TokenType,
    value: String,
    original_value: String,
    line: usize,
    column: usize,
    trivia: Vec<Trivia>,
}

impl Token {
    pub fn new(token_type: TokenType, value: impl Into<String>, line: usize, column: usize) -> Self {
        let value = value.into();
        Token {
            token_type,
            original_value: value.clone(),
            value,
            line,
            column,
            trivia: Vec::new(),
        }
    }

    /// Sets the verbatim input text when it differs from the cooked value.
    pub fn with_original_value(mut self, original_value: impl Into<String>) -> Self {
        self.original_value = original_value.into();
        self
    }

    pub fn with_trivia(mut self, trivia: Vec<Trivia>) -> Self {
        self.trivia = trivia;
        self
    }

    pub fn token_type(&self) -> &TokenType {
        &self.token_type
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn original_value(&self) -> &str {
        &self.original_value
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn trivia(&self) -> &[Trivia] {
        &self.trivia
    }

    pub fn has_trivia(&self) -> bool {
        !self.trivia.is_empty()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}
