use crate::grammar::RuleKey;
use crate::token::{TokenType, TriviaKind};

/// A parsing expression. Rule bodies are trees of these; the compiler
/// flattens them into bytecode.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// All parts in order; fails as soon as one part fails.
    Sequence(Vec<Expression>),
    /// Ordered choice: first alternative to match wins.
    FirstOf(Vec<Expression>),
    Optional(Box<Expression>),
    ZeroOrMore(Box<Expression>),
    OneOrMore(Box<Expression>),
    /// Positive lookahead, consumes nothing.
    Next(Box<Expression>),
    /// Negative lookahead, consumes nothing.
    NextNot(Box<Expression>),
    /// Marks the matched region as a token of the given type.
    Token {
        token_type: TokenType,
        body: Box<Expression>,
    },
    /// Marks the matched region as non-significant text.
    Trivia {
        kind: TriviaKind,
        body: Box<Expression>,
    },
    Literal(String),
    Pattern(String),
    EndOfInput,
    RuleRef(RuleKey),
    /// Lexerful leaf: matches one token of the given type.
    TokenTypeIs(TokenType),
    /// Lexerful leaf: matches one token with the given value.
    TokenValueIs(String),
}

impl Expression {
    pub fn sequence(parts: impl IntoIterator<Item = Expression>) -> Expression {
        Expression::Sequence(parts.into_iter().collect())
    }

    pub fn first_of(alternatives: impl IntoIterator<Item = Expression>) -> Expression {
        Expression::FirstOf(alternatives.into_iter().collect())
    }

    pub fn optional(body: impl Into<Expression>) -> Expression {
        Expression::Optional(Box::new(body.into()))
    }

    pub fn zero_or_more(body: impl Into<Expression>) -> Expression {
        Expression::ZeroOrMore(Box::new(body.into()))
    }

    pub fn one_or_more(body: impl Into<Expression>) -> Expression {
        Expression::OneOrMore(Box::new(body.into()))
    }

    pub fn next(body: impl Into<Expression>) -> Expression {
        Expression::Next(Box::new(body.into()))
    }

    pub fn next_not(body: impl Into<Expression>) -> Expression {
        Expression::NextNot(Box::new(body.into()))
    }

    pub fn token(token_type: TokenType, body: impl Into<Expression>) -> Expression {
        Expression::Token {
            token_type,
            body: Box::new(body.into()),
        }
    }

    pub fn comment_trivia(body: impl Into<Expression>) -> Expression {
        Expression::Trivia {
            kind: TriviaKind::Comment,
            body: Box::new(body.into()),
        }
    }

    pub fn skipped_trivia(body: impl Into<Expression>) -> Expression {
        Expression::Trivia {
            kind: TriviaKind::SkippedText,
            body: Box::new(body.into()),
        }
    }

    pub fn literal(text: impl Into<String>) -> Expression {
        Expression::Literal(text.into())
    }

    pub fn pattern(source: impl Into<String>) -> Expression {
        Expression::Pattern(source.into())
    }

    pub fn end_of_input() -> Expression {
        Expression::EndOfInput
    }

    pub fn token_type_is(token_type: TokenType) -> Expression {
        Expression::TokenTypeIs(token_type)
    }

    pub fn token_value_is(value: impl Into<String>) -> Expression {
        Expression::TokenValueIs(value.into())
    }
}

impl From<RuleKey> for Expression {
    fn from(key: RuleKey) -> Self {
        Expression::RuleRef(key)
    }
}

impl From<&str> for Expression {
    fn from(text: &str) -> Self {
        Expression::Literal(text.to_string())
    }
}

impl From<String> for Expression {
    fn from(text: String) -> Self {
        Expression::Literal(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    #[test]
    fn test_literal_conversions() {
        assert_eq!(Expression::from("foo"), Expression::Literal("foo".to_string()));
        assert_eq!(
            Expression::from("bar".to_string()),
            Expression::Literal("bar".to_string())
        );
    }

    #[test]
    fn test_rule_key_conversion() {
        let mut builder = GrammarBuilder::new();
        let key = builder.rule("expression");
        assert_eq!(Expression::from(key), Expression::RuleRef(key));
    }

    #[test]
    fn test_sequence_constructor() {
        let expression = Expression::sequence(["a".into(), "b".into()]);
        assert!(matches!(expression, Expression::Sequence(ref parts) if parts.len() == 2));
    }

    #[test]
    fn test_wrapper_constructors() {
        assert!(matches!(
            Expression::optional("a"),
            Expression::Optional(_)
        ));
        assert!(matches!(
            Expression::next_not("a"),
            Expression::NextNot(_)
        ));
        assert!(matches!(
            Expression::token(TokenType::new("IDENTIFIER"), "a"),
            Expression::Token { .. }
        ));
        assert!(matches!(
            Expression::comment_trivia("#"),
            Expression::Trivia {
                kind: TriviaKind::Comment,
                ..
            }
        ));
    }
}
