use crate::ast::{Ast, AstNode, AstNodeId, AstNodeKind};
use crate::bytecode::ir::{CompiledGrammar, Matcher};
use crate::grammar::{ElisionPolicy, RuleKey};
use crate::parser::input::InputBuffer;
use crate::parser::result::ParsingResult;
use crate::token::{Token, TokenType, Trivia, TriviaKind};
use crate::vm::parse_tree::ParseNode;

/// Materializes an AST from a parse tree, applying the grammar's elision
/// policies and diverting trivia into the leading-trivia list of the next
/// real token.
pub struct AstBuilder<'a> {
    grammar: &'a CompiledGrammar,
    input: &'a InputBuffer,
    nodes: Vec<AstNode>,
    /// Trivia seen since the last real token
    pending_trivia: Vec<Trivia>,
}

impl<'a> AstBuilder<'a> {
    /// Builds the AST for a matched result. `None` when the result is a
    /// mismatch.
    pub fn build(grammar: &CompiledGrammar, result: &ParsingResult) -> Option<Ast> {
        let tree = result.parse_tree()?;
        let mut builder = AstBuilder {
            grammar,
            input: result.input(),
            nodes: Vec::new(),
            pending_trivia: Vec::new(),
        };
        // The root node always survives, whatever its elision policy says
        let root = builder.build_rule_node(tree)?;
        Some(Ast::new(builder.nodes, root))
    }

    fn visit(&mut self, node: &ParseNode, out: &mut Vec<AstNodeId>) {
        match self.matcher_of(node) {
            Some(Matcher::Rule {
                key, name, elision, ..
            }) => {
                let (key, name, elision) = (*key, name.clone(), *elision);
                let mut children = Vec::new();
                for child in node.children() {
                    self.visit(child, &mut children);
                }
                let skip = match elision {
                    ElisionPolicy::Never => false,
                    ElisionPolicy::Always => true,
                    ElisionPolicy::IfOneChild => children.len() == 1,
                };
                if skip {
                    // The node vanishes; its children take its place
                    out.extend(children);
                    return;
                }
                out.push(self.finish_rule_node(node, key, name, children));
            }
            _ => {
                if let Some(id) = self.visit_terminal(node) {
                    out.push(id);
                }
            }
        }
    }

    /// Builds the node for a rule without applying its elision policy.
    fn build_rule_node(&mut self, node: &ParseNode) -> Option<AstNodeId> {
        let (key, name) = match self.matcher_of(node) {
            Some(Matcher::Rule { key, name, .. }) => (*key, name.clone()),
            _ => return None,
        };
        let mut children = Vec::new();
        for child in node.children() {
            self.visit(child, &mut children);
        }
        Some(self.finish_rule_node(node, key, name, children))
    }

    fn finish_rule_node(
        &mut self,
        node: &ParseNode,
        key: RuleKey,
        name: String,
        children: Vec<AstNodeId>,
    ) -> AstNodeId {
        // A rule node inherits the first token found among its children
        let token = children
            .iter()
            .find_map(|id| self.nodes[id.0].token.clone());
        let id = self.push(AstNode {
            kind: AstNodeKind::Rule(key),
            name,
            token,
            children: children.clone(),
            parent: None,
            from_index: node.start_index(),
            to_index: node.end_index(),
        });
        for child in children {
            self.nodes[child.0].parent = Some(id);
        }
        id
    }

    fn visit_terminal(&mut self, node: &ParseNode) -> Option<AstNodeId> {
        match self.matcher_of(node) {
            Some(Matcher::Trivia {
                kind: TriviaKind::SkippedText,
            }) => None,
            Some(Matcher::Trivia {
                kind: TriviaKind::Comment,
            }) => {
                let comment = self.token_at(node, TokenType::COMMENT, Vec::new());
                self.pending_trivia.push(Trivia::comment(comment));
                None
            }
            Some(Matcher::Token { token_type }) => {
                let token_type = token_type.clone();
                if token_type == TokenType::COMMENT {
                    let comment = self.token_at(node, token_type, Vec::new());
                    self.pending_trivia.push(Trivia::comment(comment));
                    return None;
                }
                let trivia = std::mem::take(&mut self.pending_trivia);
                let token = self.token_at(node, token_type.clone(), trivia);
                Some(self.push_token_node(node, token_type, token))
            }
            _ => {
                // Leaf without a token wrapper: synthesize an
                // undifferentiated token from its span
                let trivia = std::mem::take(&mut self.pending_trivia);
                let token = self.token_at(node, TokenType::UNDEFINED, trivia);
                Some(self.push_token_node(node, TokenType::UNDEFINED, token))
            }
        }
    }

    fn push_token_node(
        &mut self,
        node: &ParseNode,
        token_type: TokenType,
        token: Token,
    ) -> AstNodeId {
        self.push(AstNode {
            kind: AstNodeKind::Token(token_type.clone()),
            name: token_type.name().to_string(),
            token: Some(token),
            children: Vec::new(),
            parent: None,
            from_index: node.start_index(),
            to_index: node.end_index(),
        })
    }

    fn token_at(&self, node: &ParseNode, token_type: TokenType, trivia: Vec<Trivia>) -> Token {
        let start = node.start_index();
        let end = node.end_index().min(self.input.len());
        let value = &self.input.text()[start..end];
        let position = self.input.position(start);
        Token::new(token_type, value, position.line(), position.column() - 1)
            .with_trivia(trivia)
    }

    fn matcher_of(&self, node: &ParseNode) -> Option<&'a Matcher> {
        node.matcher().map(|id| self.grammar.matcher(id))
    }

    fn push(&mut self, node: AstNode) -> AstNodeId {
        self.nodes.push(node);
        AstNodeId(self.nodes.len() - 1)
    }
}
