pub mod builder;

pub use builder::AstBuilder;

use crate::grammar::RuleKey;
use crate::token::{Token, TokenType};

/// Index of a node in its `Ast` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AstNodeId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq)]
pub enum AstNodeKind {
    Rule(RuleKey),
    Token(TokenType),
}

/// An AST node. Fields are public: the tree belongs to the consumer once
/// built, and later passes may rewrite it freely.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub kind: AstNodeKind,
    pub name: String,
    /// For token nodes, the token itself; for rule nodes, the first token
    /// underneath
    pub token: Option<Token>,
    pub children: Vec<AstNodeId>,
    pub parent: Option<AstNodeId>,
    pub from_index: usize,
    pub to_index: usize,
}

impl AstNode {
    pub fn is_rule(&self) -> bool {
        matches!(self.kind, AstNodeKind::Rule(_))
    }
}

/// An abstract syntax tree stored as an index arena. Ids stay valid for
/// the life of the tree; nodes hold parent back-references as ids so the
/// arena never forms reference cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    nodes: Vec<AstNode>,
    root: AstNodeId,
}

impl Ast {
    pub(crate) fn new(nodes: Vec<AstNode>, root: AstNodeId) -> Self {
        Ast { nodes, root }
    }

    pub fn root(&self) -> AstNodeId {
        self.root
    }

    pub fn node(&self, id: AstNodeId) -> &AstNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: AstNodeId) -> &mut AstNode {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: AstNodeId) -> impl Iterator<Item = &AstNode> {
        self.nodes[id.0].children.iter().map(|child| &self.nodes[child.0])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
