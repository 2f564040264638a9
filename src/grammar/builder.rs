use crate::bytecode::compile::Compiler;
use crate::bytecode::ir::CompiledGrammar;
use crate::grammar::expression::Expression;
use crate::grammar::grammar_error::GrammarError;
use serde::{Deserialize, Serialize};

/// Stable handle to a declared rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleKey(pub(crate) u16);

/// When a rule's node is removed from the AST, its children taking its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElisionPolicy {
    Never,
    Always,
    IfOneChild,
}

#[derive(Debug, Clone)]
pub(crate) struct RuleSlot {
    pub(crate) name: String,
    pub(crate) expression: Option<Expression>,
    pub(crate) elision: ElisionPolicy,
    pub(crate) memoize: bool,
}

/// Explicit rule registry. Rules are declared by name (yielding a key that
/// can be referenced before the rule is defined, so grammars may be
/// mutually recursive), then given exactly one definition each.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: Vec<RuleSlot>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        GrammarBuilder { rules: Vec::new() }
    }

    /// Declares a rule, or returns the existing key for this name.
    pub fn rule(&mut self, name: &str) -> RuleKey {
        if let Some(index) = self.rules.iter().position(|slot| slot.name == name) {
            return RuleKey(index as u16);
        }
        self.rules.push(RuleSlot {
            name: name.to_string(),
            expression: None,
            elision: ElisionPolicy::Never,
            memoize: true,
        });
        RuleKey((self.rules.len() - 1) as u16)
    }

    /// Attaches a definition to a declared rule. Redefinition is an error.
    pub fn define(
        &mut self,
        key: RuleKey,
        expression: impl Into<Expression>,
    ) -> Result<RuleKey, GrammarError> {
        let slot = &mut self.rules[key.0 as usize];
        if slot.expression.is_some() {
            return Err(GrammarError::already_defined(&slot.name));
        }
        slot.expression = Some(expression.into());
        Ok(key)
    }

    /// The rule's node never appears in the AST; its children are spliced
    /// into its parent.
    pub fn skip(&mut self, key: RuleKey) {
        self.rules[key.0 as usize].elision = ElisionPolicy::Always;
    }

    /// The rule's node is spliced out when it has exactly one child.
    pub fn skip_if_one_child(&mut self, key: RuleKey) {
        self.rules[key.0 as usize].elision = ElisionPolicy::IfOneChild;
    }

    /// Excludes the rule from memoization.
    pub fn no_memo(&mut self, key: RuleKey) {
        self.rules[key.0 as usize].memoize = false;
    }

    pub fn rule_name(&self, key: RuleKey) -> &str {
        &self.rules[key.0 as usize].name
    }

    /// Compiles every rule reachable from `root` into a grammar.
    pub fn build(&self, root: RuleKey) -> Result<CompiledGrammar, GrammarError> {
        Compiler::compile(&self.rules, root)
    }
}
