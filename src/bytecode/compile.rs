use crate::bytecode::Op;
use crate::bytecode::ir::{CompiledGrammar, Matcher, MatcherId};
use crate::grammar::builder::RuleSlot;
use crate::grammar::{Expression, GrammarError, RuleKey};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Anchors a pattern so it can only match at the current position.
pub(crate) fn compile_pattern(source: &str) -> Result<Regex, GrammarError> {
    Regex::new(&format!(r"\A(?:{})", source)).map_err(|err| GrammarError::pattern(source, err))
}

/// Compiles rule expressions into a flat instruction array.
///
/// Works to a fixed point over a queue of reachable rules: compiling a body
/// records `RuleRef` placeholders and enqueues their targets; once the queue
/// drains, a linking pass rewrites every placeholder into a `Call` with a
/// relative offset. Rules never referenced from the root are not compiled.
pub struct Compiler {
    ops: Vec<Op>,
    matchers: Vec<Matcher>,
    queue: VecDeque<RuleKey>,
    rule_matchers: HashMap<RuleKey, MatcherId>,
    rule_addresses: HashMap<RuleKey, usize>,
}

impl Compiler {
    pub(crate) fn compile(
        rules: &[RuleSlot],
        root: RuleKey,
    ) -> Result<CompiledGrammar, GrammarError> {
        let mut compiler = Compiler {
            ops: Vec::new(),
            matchers: Vec::new(),
            queue: VecDeque::new(),
            rule_matchers: HashMap::new(),
            rule_addresses: HashMap::new(),
        };

        let root_matcher = compiler.rule_matcher(root, rules);
        while let Some(key) = compiler.queue.pop_front() {
            let slot = &rules[key.0 as usize];
            // Clone the body so the borrow doesn't outlive the slot lookup
            let expression = slot
                .expression
                .clone()
                .ok_or_else(|| GrammarError::undefined_rule(&slot.name))?;
            compiler.rule_addresses.insert(key, compiler.ops.len());
            let mut body = Vec::new();
            compiler.compile_expression(&expression, rules, &mut body)?;
            compiler.ops.append(&mut body);
            compiler.ops.push(Op::Ret);
        }
        compiler.link()?;

        let rule_offsets: BTreeMap<usize, MatcherId> = compiler
            .rule_addresses
            .iter()
            .map(|(key, address)| (*address, compiler.rule_matchers[key]))
            .collect();
        let root_offset = compiler.rule_addresses[&root];
        Ok(CompiledGrammar {
            ops: compiler.ops,
            matchers: compiler.matchers,
            rule_offsets,
            root_key: root,
            root_matcher,
            root_offset,
        })
    }

    /// Rewrites `RuleRef` placeholders into relative `Call`s.
    fn link(&mut self) -> Result<(), GrammarError> {
        for index in 0..self.ops.len() {
            if let Op::RuleRef(key) = self.ops[index] {
                let address = *self
                    .rule_addresses
                    .get(&key)
                    .ok_or_else(|| GrammarError::internal("rule enqueued but never compiled"))?;
                self.ops[index] = Op::Call {
                    offset: address as i32 - index as i32,
                    matcher: self.rule_matchers[&key],
                };
            }
        }
        Ok(())
    }

    /// Returns the rule's matcher id, registering it and enqueuing the rule
    /// for compilation on first sight.
    fn rule_matcher(&mut self, key: RuleKey, rules: &[RuleSlot]) -> MatcherId {
        if let Some(id) = self.rule_matchers.get(&key) {
            return *id;
        }
        let slot = &rules[key.0 as usize];
        let id = self.add_matcher(Matcher::Rule {
            key,
            name: slot.name.clone(),
            elision: slot.elision,
            memoize: slot.memoize,
        });
        self.rule_matchers.insert(key, id);
        self.queue.push_back(key);
        id
    }

    fn add_matcher(&mut self, matcher: Matcher) -> MatcherId {
        self.matchers.push(matcher);
        MatcherId((self.matchers.len() - 1) as u16)
    }

    fn compile_expression(
        &mut self,
        expression: &Expression,
        rules: &[RuleSlot],
        out: &mut Vec<Op>,
    ) -> Result<(), GrammarError> {
        match expression {
            Expression::Sequence(parts) => {
                for part in parts {
                    self.compile_expression(part, rules, out)?;
                }
            }

            Expression::FirstOf(alternatives) => {
                if alternatives.is_empty() {
                    return Err(GrammarError::internal("empty ordered choice"));
                }
                let mut bodies = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    let mut body = Vec::new();
                    self.compile_expression(alternative, rules, &mut body)?;
                    bodies.push(body);
                }
                // Layout per non-final alternative i (n_i = body length):
                //   Choice(n_i + 2)   -> next alternative
                //   body_i
                //   Commit(to end)
                // The final alternative is laid out bare.
                let total: usize = bodies.iter().map(Vec::len).sum::<usize>()
                    + 2 * (bodies.len() - 1);
                let last = bodies
                    .pop()
                    .ok_or_else(|| GrammarError::internal("empty ordered choice"))?;
                let mut written = 0;
                for mut body in bodies {
                    out.push(Op::Choice(body.len() as i32 + 2));
                    written += body.len() + 1;
                    out.append(&mut body);
                    out.push(Op::Commit((total - written) as i32));
                    written += 1;
                }
                out.extend(last);
            }

            Expression::Optional(body) => {
                // Choice(n+2), body, Commit(1)
                let mut sub = Vec::new();
                self.compile_expression(body, rules, &mut sub)?;
                out.push(Op::Choice(sub.len() as i32 + 2));
                out.append(&mut sub);
                out.push(Op::Commit(1));
            }

            Expression::ZeroOrMore(body) => {
                // Choice(n+2), body, CommitVerify(-1-n) -> loops to the Choice
                let mut sub = Vec::new();
                self.compile_expression(body, rules, &mut sub)?;
                let n = sub.len() as i32;
                out.push(Op::Choice(n + 2));
                out.append(&mut sub);
                out.push(Op::CommitVerify(-1 - n));
            }

            Expression::OneOrMore(body) => {
                // Choice(n+4), body, CommitVerify(1), Choice(3), Jump(-2-n),
                // Backtrack. The first iteration is mandatory; later ones
                // loop through the Jump.
                let mut sub = Vec::new();
                self.compile_expression(body, rules, &mut sub)?;
                let n = sub.len() as i32;
                out.push(Op::Choice(n + 4));
                out.append(&mut sub);
                out.push(Op::CommitVerify(1));
                out.push(Op::Choice(3));
                out.push(Op::Jump(-2 - n));
                out.push(Op::Backtrack);
            }

            Expression::Next(body) => {
                // Choice(n+2), body, BackCommit(2), Backtrack
                let mut sub = Vec::new();
                self.compile_expression(body, rules, &mut sub)?;
                out.push(Op::Choice(sub.len() as i32 + 2));
                out.append(&mut sub);
                out.push(Op::BackCommit(2));
                out.push(Op::Backtrack);
            }

            Expression::NextNot(body) => {
                // PredicateChoice(n+2), body, FailTwice
                let mut sub = Vec::new();
                self.compile_expression(body, rules, &mut sub)?;
                out.push(Op::PredicateChoice(sub.len() as i32 + 2));
                out.append(&mut sub);
                out.push(Op::FailTwice);
            }

            Expression::Token { token_type, body } => {
                let id = self.add_matcher(Matcher::Token {
                    token_type: token_type.clone(),
                });
                self.compile_wrapper(id, body, rules, out)?;
            }

            Expression::Trivia { kind, body } => {
                let id = self.add_matcher(Matcher::Trivia { kind: *kind });
                self.compile_wrapper(id, body, rules, out)?;
            }

            Expression::Literal(text) => {
                let id = self.add_matcher(Matcher::Literal { text: text.clone() });
                out.push(Op::Literal(id));
            }

            Expression::Pattern(source) => {
                let regex = compile_pattern(source)?;
                let id = self.add_matcher(Matcher::Pattern {
                    source: source.clone(),
                    regex,
                });
                out.push(Op::Pattern(id));
            }

            Expression::EndOfInput => out.push(Op::EndOfInput),

            Expression::RuleRef(key) => {
                self.rule_matcher(*key, rules);
                out.push(Op::RuleRef(*key));
            }

            Expression::TokenTypeIs(token_type) => {
                let id = self.add_matcher(Matcher::TokenTypeIs {
                    token_type: token_type.clone(),
                });
                out.push(Op::TokenTypeIs(id));
            }

            Expression::TokenValueIs(value) => {
                let id = self.add_matcher(Matcher::TokenValueIs {
                    value: value.clone(),
                });
                out.push(Op::TokenValueIs(id));
            }
        }
        Ok(())
    }

    /// Token and trivia wrappers compile to an inline subroutine so the
    /// machine creates a dedicated node for the wrapped region:
    ///   Call(2, self), Jump(n+3), IgnoreErrors, body, Ret
    fn compile_wrapper(
        &mut self,
        matcher: MatcherId,
        body: &Expression,
        rules: &[RuleSlot],
        out: &mut Vec<Op>,
    ) -> Result<(), GrammarError> {
        let mut sub = Vec::new();
        self.compile_expression(body, rules, &mut sub)?;
        let n = sub.len() as i32;
        out.push(Op::Call { offset: 2, matcher });
        out.push(Op::Jump(n + 3));
        out.push(Op::IgnoreErrors);
        out.append(&mut sub);
        out.push(Op::Ret);
        Ok(())
    }
}
