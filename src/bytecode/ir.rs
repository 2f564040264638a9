use crate::bytecode::Op;
use crate::grammar::{ElisionPolicy, RuleKey};
use crate::token::{TokenType, TriviaKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index into a grammar's matcher table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatcherId(pub(crate) u16);

/// Identity attached to a parse-tree node: the rule or leaf that produced
/// the match.
#[derive(Debug, Clone)]
pub enum Matcher {
    Rule {
        key: RuleKey,
        name: String,
        elision: ElisionPolicy,
        memoize: bool,
    },
    Token {
        token_type: TokenType,
    },
    Trivia {
        kind: TriviaKind,
    },
    Literal {
        text: String,
    },
    Pattern {
        source: String,
        regex: Regex,
    },
    TokenTypeIs {
        token_type: TokenType,
    },
    TokenValueIs {
        value: String,
    },
}

impl Matcher {
    /// Human-readable name for diagnostics and disassembly.
    pub fn label(&self) -> String {
        match self {
            Matcher::Rule { name, .. } => name.clone(),
            Matcher::Token { token_type } => format!("token {}", token_type),
            Matcher::Trivia {
                kind: TriviaKind::Comment,
            } => "comment trivia".to_string(),
            Matcher::Trivia {
                kind: TriviaKind::SkippedText,
            } => "skipped trivia".to_string(),
            Matcher::Literal { text } => format!("{:?}", text),
            Matcher::Pattern { source, .. } => format!("/{}/", source),
            Matcher::TokenTypeIs { token_type } => format!("type {}", token_type),
            Matcher::TokenValueIs { value } => format!("value {:?}", value),
        }
    }

    /// Only rule matchers participate in memoization, and only when their
    /// memo flag is set.
    pub(crate) fn memoize(&self) -> bool {
        matches!(self, Matcher::Rule { memoize: true, .. })
    }
}

/// An immutable compiled grammar: flat instruction array plus the matcher
/// table its operands index. Safe to share across threads; every parse
/// builds its own machine around a shared reference.
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    pub(crate) ops: Vec<Op>,
    pub(crate) matchers: Vec<Matcher>,
    /// Entry offset of each compiled rule block, for disassembly.
    pub(crate) rule_offsets: BTreeMap<usize, MatcherId>,
    pub(crate) root_key: RuleKey,
    pub(crate) root_matcher: MatcherId,
    pub(crate) root_offset: usize,
}

impl CompiledGrammar {
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn matcher(&self, id: MatcherId) -> &Matcher {
        &self.matchers[id.0 as usize]
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn rule_offsets(&self) -> &BTreeMap<usize, MatcherId> {
        &self.rule_offsets
    }

    pub fn root_key(&self) -> RuleKey {
        self.root_key
    }

    pub fn root_matcher(&self) -> MatcherId {
        self.root_matcher
    }

    pub fn root_offset(&self) -> usize {
        self.root_offset
    }
}
