use crate::parser::error_fmt::ParseErrorFormatter;
use crate::parser::input::InputBuffer;
use crate::vm::parse_tree::ParseNode;
use std::rc::Rc;

/// Outcome of a lexerless parse: either a parse tree or the furthest
/// failure offset. A mismatch is data, not an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsingResult {
    input: InputBuffer,
    tree: Option<Rc<ParseNode>>,
    error: Option<ParseError>,
}

/// Where a mismatch happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    error_index: usize,
}

impl ParseError {
    pub fn error_index(&self) -> usize {
        self.error_index
    }
}

impl ParsingResult {
    pub(crate) fn matched(input: InputBuffer, tree: Rc<ParseNode>) -> Self {
        ParsingResult {
            input,
            tree: Some(tree),
            error: None,
        }
    }

    pub(crate) fn mismatch(input: InputBuffer, error_index: usize) -> Self {
        ParsingResult {
            input,
            tree: None,
            error: Some(ParseError { error_index }),
        }
    }

    pub fn is_matched(&self) -> bool {
        self.tree.is_some()
    }

    pub fn parse_tree(&self) -> Option<&Rc<ParseNode>> {
        self.tree.as_ref()
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    pub fn parse_error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Source snippet describing the mismatch.
    pub fn error_message(&self) -> Option<String> {
        self.error
            .map(|error| ParseErrorFormatter.format(&self.input, error.error_index))
    }
}
