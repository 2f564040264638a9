use crate::grammar::GrammarError;

/// Failure of a lexerful parse.
#[derive(Debug, Clone, PartialEq)]
pub enum ParserError {
    /// The token stream did not match; the message is a pre-rendered
    /// snippet of the offending region
    Recognition { line: usize, message: String },
    /// The grammar itself is broken
    Grammar(GrammarError),
}

impl ParserError {
    pub fn recognition(line: usize, message: impl Into<String>) -> Self {
        ParserError::Recognition {
            line,
            message: message.into(),
        }
    }

    /// Line the failure was detected on, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParserError::Recognition { line, .. } => Some(*line),
            ParserError::Grammar(_) => None,
        }
    }
}

impl From<GrammarError> for ParserError {
    fn from(err: GrammarError) -> Self {
        ParserError::Grammar(err)
    }
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserError::Recognition { message, .. } => write!(f, "{}", message),
            ParserError::Grammar(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ParserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParserError::Recognition { .. } => None,
            ParserError::Grammar(err) => Some(err),
        }
    }
}
