use crate::bytecode::MatcherId;
use std::rc::Rc;

/// An immutable parse-tree node. Spans are half-open index ranges into the
/// parsed input (byte offsets lexerless, token offsets lexerful). Nodes are
/// shared via `Rc` so memoized subtrees can appear in several places.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    start: usize,
    end: usize,
    matcher: Option<MatcherId>,
    children: Vec<Rc<ParseNode>>,
}

impl ParseNode {
    pub(crate) fn new(
        start: usize,
        end: usize,
        matcher: Option<MatcherId>,
        children: Vec<Rc<ParseNode>>,
    ) -> Self {
        ParseNode {
            start,
            end,
            matcher,
            children,
        }
    }

    pub(crate) fn leaf(start: usize, end: usize, matcher: Option<MatcherId>) -> Self {
        ParseNode::new(start, end, matcher, Vec::new())
    }

    pub fn start_index(&self) -> usize {
        self.start
    }

    pub fn end_index(&self) -> usize {
        self.end
    }

    pub fn matcher(&self) -> Option<MatcherId> {
        self.matcher
    }

    pub fn children(&self) -> &[Rc<ParseNode>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
