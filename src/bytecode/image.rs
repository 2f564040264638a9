use crate::bytecode::Op;
use crate::bytecode::compile::compile_pattern;
use crate::bytecode::ir::{CompiledGrammar, Matcher, MatcherId};
use crate::grammar::{ElisionPolicy, GrammarError, RuleKey};
use crate::token::{TokenType, TriviaKind};
use serde::{Deserialize, Serialize};

/// Serializable form of a compiled grammar. Patterns are stored as source
/// text and re-compiled on load, so a loaded image goes through the same
/// validation as a freshly built grammar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarImage {
    ops: Vec<Op>,
    matchers: Vec<MatcherImage>,
    rule_offsets: Vec<(usize, MatcherId)>,
    root_key: RuleKey,
    root_matcher: MatcherId,
    root_offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum MatcherImage {
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
    },
    TokenTypeIs {
        token_type: TokenType,
    },
    TokenValueIs {
        value: String,
    },
}

impl GrammarImage {
    pub fn from_grammar(grammar: &CompiledGrammar) -> Self {
        let matchers = grammar
            .matchers()
            .iter()
            .map(|matcher| match matcher {
                Matcher::Rule {
                    key,
                    name,
                    elision,
                    memoize,
                } => MatcherImage::Rule {
                    key: *key,
                    name: name.clone(),
                    elision: *elision,
                    memoize: *memoize,
                },
                Matcher::Token { token_type } => MatcherImage::Token {
                    token_type: token_type.clone(),
                },
                Matcher::Trivia { kind } => MatcherImage::Trivia { kind: *kind },
                Matcher::Literal { text } => MatcherImage::Literal { text: text.clone() },
                Matcher::Pattern { source, .. } => MatcherImage::Pattern {
                    source: source.clone(),
                },
                Matcher::TokenTypeIs { token_type } => MatcherImage::TokenTypeIs {
                    token_type: token_type.clone(),
                },
                Matcher::TokenValueIs { value } => MatcherImage::TokenValueIs {
                    value: value.clone(),
                },
            })
            .collect();
        GrammarImage {
            ops: grammar.ops.clone(),
            matchers,
            rule_offsets: grammar.rule_offsets.iter().map(|(k, v)| (*k, *v)).collect(),
            root_key: grammar.root_key,
            root_matcher: grammar.root_matcher,
            root_offset: grammar.root_offset,
        }
    }

    pub fn into_grammar(self) -> Result<CompiledGrammar, GrammarError> {
        let mut matchers = Vec::with_capacity(self.matchers.len());
        for matcher in self.matchers {
            matchers.push(match matcher {
                MatcherImage::Rule {
                    key,
                    name,
                    elision,
                    memoize,
                } => Matcher::Rule {
                    key,
                    name,
                    elision,
                    memoize,
                },
                MatcherImage::Token { token_type } => Matcher::Token { token_type },
                MatcherImage::Trivia { kind } => Matcher::Trivia { kind },
                MatcherImage::Literal { text } => Matcher::Literal { text },
                MatcherImage::Pattern { source } => {
                    let regex = compile_pattern(&source)?;
                    Matcher::Pattern { source, regex }
                }
                MatcherImage::TokenTypeIs { token_type } => Matcher::TokenTypeIs { token_type },
                MatcherImage::TokenValueIs { value } => Matcher::TokenValueIs { value },
            });
        }
        Ok(CompiledGrammar {
            ops: self.ops,
            matchers,
            rule_offsets: self.rule_offsets.into_iter().collect(),
            root_key: self.root_key,
            root_matcher: self.root_matcher,
            root_offset: self.root_offset,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expression, GrammarBuilder};
    use crate::vm::Machine;

    fn arithmetic_grammar() -> CompiledGrammar {
        let mut builder = GrammarBuilder::new();
        let expression = builder.rule("expression");
        let number = builder.rule("number");
        builder
            .define(
                expression,
                Expression::sequence([
                    number.into(),
                    Expression::zero_or_more(Expression::sequence(["+".into(), number.into()])),
                    Expression::end_of_input(),
                ]),
            )
            .unwrap();
        builder.define(number, Expression::pattern("[0-9]+")).unwrap();
        builder.build(expression).unwrap()
    }

    #[test]
    fn test_image_round_trip_preserves_behavior() {
        let grammar = arithmetic_grammar();
        let bytes = GrammarImage::from_grammar(&grammar).to_bytes().unwrap();
        let loaded = GrammarImage::from_bytes(&bytes).unwrap().into_grammar().unwrap();

        assert_eq!(grammar.ops(), loaded.ops());
        for input in ["1", "1+2+3", "1+", ""] {
            let before = Machine::parse(input, &grammar).unwrap();
            let after = Machine::parse(input, &loaded).unwrap();
            assert_eq!(before.is_matched(), after.is_matched(), "input {:?}", input);
        }
    }

    #[test]
    fn test_loaded_patterns_are_recompiled() {
        let grammar = arithmetic_grammar();
        let image = GrammarImage::from_grammar(&grammar);
        let loaded = image.into_grammar().unwrap();

        let result = Machine::parse("42", &loaded).unwrap();
        assert!(result.is_matched());
    }
}
