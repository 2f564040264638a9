use crate::bytecode::ir::{CompiledGrammar, Matcher, MatcherId};
use crate::bytecode::Op;
use crate::grammar::GrammarError;
use crate::parser::error_fmt::LexerfulParseErrorFormatter;
use crate::parser::input::InputBuffer;
use crate::parser::parser_error::ParserError;
use crate::parser::result::ParsingResult;
use crate::token::Token;
use crate::vm::handler::{ErrorLocatingHandler, MachineHandler, NopHandler};
use crate::vm::parse_tree::ParseNode;
use crate::vm::stack::{MachineStack, StackFrame};
use std::rc::Rc;

/// The parsing machine: a fetch-decode-execute loop over a compiled
/// grammar's instructions. One machine serves one parse; the grammar is
/// shared, all mutable state lives here.
pub struct Machine<'a> {
    input: &'a str,
    tokens: &'a [Token],
    grammar: &'a CompiledGrammar,
    input_len: usize,
    stack: MachineStack,
    /// One slot per input position; holds the last memoizable node
    /// produced there
    memos: Vec<Option<Rc<ParseNode>>>,
    /// Left-recursion guard: per instruction, the input position of the
    /// call currently executing it (-1 when none)
    calls: Vec<isize>,
    address: isize,
    index: usize,
    ignore_errors: bool,
    matched: bool,
}

impl<'a> Machine<'a> {
    /// Parses text against the grammar. A mismatch is an ordinary outcome
    /// carried by the result; only grammar bugs surface as `Err`.
    pub fn parse(input: &str, grammar: &CompiledGrammar) -> Result<ParsingResult, GrammarError> {
        let mut handler = ErrorLocatingHandler::new();
        let mut machine = Machine::new(input, &[], grammar);
        let root = machine.run(&mut handler)?;
        let buffer = InputBuffer::new(input);
        match root {
            Some(tree) => Ok(ParsingResult::matched(buffer, tree)),
            None => Ok(ParsingResult::mismatch(buffer, handler.error_index())),
        }
    }

    /// Recognition check without diagnostics.
    pub fn matches(input: &str, grammar: &CompiledGrammar) -> Result<bool, GrammarError> {
        let mut machine = Machine::new(input, &[], grammar);
        Ok(machine.run(&mut NopHandler)?.is_some())
    }

    /// Parses a token stream against the grammar. Mismatches come back as
    /// a recognition error with a pre-rendered token-context snippet.
    pub fn parse_tokens(
        tokens: &'a [Token],
        grammar: &CompiledGrammar,
    ) -> Result<Rc<ParseNode>, ParserError> {
        let mut handler = ErrorLocatingHandler::new();
        let mut machine = Machine::new("", tokens, grammar);
        match machine.run(&mut handler)? {
            Some(tree) => Ok(tree),
            None => {
                if tokens.is_empty() {
                    return Err(ParserError::recognition(1, "no tokens"));
                }
                let error_index = handler.error_index();
                let line = tokens[error_index.min(tokens.len() - 1)].line();
                let message = LexerfulParseErrorFormatter.format(tokens, error_index);
                Err(ParserError::recognition(line, message))
            }
        }
    }

    fn new(input: &'a str, tokens: &'a [Token], grammar: &'a CompiledGrammar) -> Self {
        let input_len = if tokens.is_empty() {
            input.len()
        } else {
            tokens.len()
        };
        Machine {
            input,
            tokens,
            grammar,
            input_len,
            stack: MachineStack::new(),
            memos: vec![None; input_len + 1],
            calls: vec![-1; grammar.ops().len()],
            address: 0,
            index: 0,
            ignore_errors: false,
            matched: true,
        }
    }

    /// Runs the root rule to completion. `None` means the input did not
    /// match; the handler has seen every reportable failure.
    fn run(
        &mut self,
        handler: &mut dyn MachineHandler,
    ) -> Result<Option<Rc<ParseNode>>, GrammarError> {
        self.stack.push(StackFrame {
            address: -1,
            index: 0,
            ignore_errors: false,
            matcher: Some(self.grammar.root_matcher()),
            nodes: Vec::new(),
            called_address: self.grammar.root_offset(),
            left_recursion: -1,
        });
        self.address = self.grammar.root_offset() as isize;
        while self.address != -1 {
            self.step(handler)?;
        }
        if self.matched {
            Ok(self.stack.take_root())
        } else {
            Ok(None)
        }
    }

    fn step(&mut self, handler: &mut dyn MachineHandler) -> Result<(), GrammarError> {
        let grammar = self.grammar;
        let op = *grammar
            .ops()
            .get(self.address as usize)
            .ok_or_else(|| GrammarError::internal("instruction address out of range"))?;

        match op {
            Op::Jump(offset) => self.address += offset as isize,

            Op::Call { offset, matcher } => self.call(1, matcher, offset)?,

            Op::Ret => {
                self.create_node();
                let frame = self.stack.top();
                self.address = frame.address;
                self.ignore_errors = frame.ignore_errors;
                self.pop_return();
            }

            Op::Choice(offset) => {
                self.push_backtrack(self.address + offset as isize);
                self.address += 1;
            }

            Op::PredicateChoice(offset) => {
                // Failures under a predicate are not parse errors
                self.push_backtrack(self.address + offset as isize);
                self.ignore_errors = true;
                self.address += 1;
            }

            Op::Commit(offset) => {
                self.commit();
                self.address += offset as isize;
            }

            Op::CommitVerify(offset) => {
                if self.index == self.stack.top().index {
                    return Err(GrammarError::empty_repetition(self.enclosing_rule_name()));
                }
                self.commit();
                self.address += offset as isize;
            }

            Op::BackCommit(offset) => {
                let frame = self.stack.pop();
                self.index = frame.index;
                self.ignore_errors = frame.ignore_errors;
                self.address += offset as isize;
            }

            Op::Backtrack => self.backtrack(handler),

            Op::FailTwice => {
                let frame = self.stack.pop();
                self.index = frame.index;
                self.backtrack(handler);
            }

            Op::IgnoreErrors => {
                self.ignore_errors = true;
                self.address += 1;
            }

            Op::Literal(id) => match grammar.matcher(id) {
                Matcher::Literal { text } => {
                    let hit = self
                        .input
                        .get(self.index..)
                        .is_some_and(|rest| rest.starts_with(text.as_str()));
                    if hit {
                        self.create_leaf(id, text.len());
                        self.address += 1;
                    } else {
                        self.backtrack(handler);
                    }
                }
                _ => return Err(GrammarError::internal("matcher table corrupted")),
            },

            Op::Pattern(id) => match grammar.matcher(id) {
                Matcher::Pattern { regex, .. } => {
                    match self.input.get(self.index..).and_then(|rest| regex.find(rest)) {
                        Some(found) => {
                            self.create_leaf(id, found.end());
                            self.address += 1;
                        }
                        None => self.backtrack(handler),
                    }
                }
                _ => return Err(GrammarError::internal("matcher table corrupted")),
            },

            Op::EndOfInput => {
                if self.index == self.input_len {
                    self.address += 1;
                } else {
                    self.backtrack(handler);
                }
            }

            Op::TokenTypeIs(id) => match grammar.matcher(id) {
                Matcher::TokenTypeIs { token_type } => {
                    let hit = self
                        .tokens
                        .get(self.index)
                        .is_some_and(|token| token.token_type() == token_type);
                    if hit {
                        self.create_leaf(id, 1);
                        self.address += 1;
                    } else {
                        self.backtrack(handler);
                    }
                }
                _ => return Err(GrammarError::internal("matcher table corrupted")),
            },

            Op::TokenValueIs(id) => match grammar.matcher(id) {
                Matcher::TokenValueIs { value } => {
                    let hit = self
                        .tokens
                        .get(self.index)
                        .is_some_and(|token| token.value() == value);
                    if hit {
                        self.create_leaf(id, 1);
                        self.address += 1;
                    } else {
                        self.backtrack(handler);
                    }
                }
                _ => return Err(GrammarError::internal("matcher table corrupted")),
            },

            Op::RuleRef(_) => {
                return Err(GrammarError::internal(
                    "unlinked rule reference reached the machine",
                ));
            }
        }
        Ok(())
    }

    /// Enters a rule: memo hit short-circuits the call, otherwise a return
    /// frame is pushed and the left-recursion guard armed.
    fn call(
        &mut self,
        return_offset: isize,
        matcher: MatcherId,
        call_offset: i32,
    ) -> Result<(), GrammarError> {
        if let Some(memo) = &self.memos[self.index] {
            if memo.matcher() == Some(matcher) {
                let memo = memo.clone();
                self.index = memo.end_index();
                self.stack.top_mut().nodes.push(memo);
                self.address += return_offset;
                return Ok(());
            }
        }

        self.stack.push(StackFrame {
            address: self.address + return_offset,
            index: self.index,
            ignore_errors: self.ignore_errors,
            matcher: Some(matcher),
            nodes: Vec::new(),
            called_address: 0,
            left_recursion: -1,
        });
        self.address += call_offset as isize;

        let target = self.address as usize;
        if self.calls[target] == self.index as isize {
            return Err(GrammarError::left_recursion(
                self.grammar.matcher(matcher).label(),
            ));
        }
        let top = self.stack.top_mut();
        top.called_address = target;
        top.left_recursion = self.calls[target];
        self.calls[target] = self.index as isize;
        Ok(())
    }

    fn pop_return(&mut self) {
        let frame = self.stack.pop();
        self.calls[frame.called_address] = frame.left_recursion;
    }

    fn push_backtrack(&mut self, resume_address: isize) {
        self.stack.push(StackFrame {
            address: resume_address,
            index: self.index,
            ignore_errors: self.ignore_errors,
            matcher: None,
            nodes: Vec::new(),
            called_address: 0,
            left_recursion: -1,
        });
    }

    /// Drops the nearest backtrack frame, keeping what it matched.
    fn commit(&mut self) {
        let mut frame = self.stack.pop();
        self.stack.top_mut().nodes.append(&mut frame.nodes);
    }

    /// Failure: unwind return frames (reporting each unless suppressed),
    /// then resume at the nearest backtrack frame. An empty stack means
    /// the whole parse failed.
    fn backtrack(&mut self, handler: &mut dyn MachineHandler) {
        while !self.stack.at_base() && self.stack.top().is_return() {
            self.ignore_errors = self.stack.top().ignore_errors;
            if !self.ignore_errors {
                handler.on_backtrack(self.index);
            }
            self.pop_return();
        }
        if self.stack.at_base() {
            self.address = -1;
            self.matched = false;
        } else {
            let frame = self.stack.pop();
            self.index = frame.index;
            self.address = frame.address;
            self.ignore_errors = frame.ignore_errors;
        }
    }

    /// Wraps the top frame's pending nodes into the frame's own node and
    /// hands it to the parent; memoizable nodes are also recorded.
    fn create_node(&mut self) {
        let grammar = self.grammar;
        let (start, matcher, children) = {
            let frame = self.stack.top_mut();
            (frame.index, frame.matcher, std::mem::take(&mut frame.nodes))
        };
        let node = Rc::new(ParseNode::new(start, self.index, matcher, children));
        self.stack.parent_mut().nodes.push(node.clone());
        let memoize = matcher.is_some_and(|id| grammar.matcher(id).memoize());
        if memoize {
            self.memos[start] = Some(node);
        }
    }

    fn create_leaf(&mut self, matcher: MatcherId, width: usize) {
        let node = Rc::new(ParseNode::leaf(self.index, self.index + width, Some(matcher)));
        self.stack.top_mut().nodes.push(node);
        self.index += width;
    }

    /// Name of the innermost rule currently being matched.
    fn enclosing_rule_name(&self) -> Option<String> {
        self.stack.iter_top_down().find_map(|frame| {
            frame.matcher.and_then(|id| match self.grammar.matcher(id) {
                Matcher::Rule { name, .. } => Some(name.clone()),
                _ => None,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expression, GrammarBuilder};
    use crate::token::TokenType;

    fn compile_single(expression: Expression) -> CompiledGrammar {
        let mut builder = GrammarBuilder::new();
        let rule = builder.rule("r");
        builder.define(rule, expression).unwrap();
        builder.build(rule).unwrap()
    }

    #[test]
    fn test_literal_match() {
        let grammar = compile_single("foo".into());

        let result = Machine::parse("foo", &grammar).unwrap();
        assert!(result.is_matched());
        let tree = result.parse_tree().unwrap();
        assert_eq!(tree.start_index(), 0);
        assert_eq!(tree.end_index(), 3);

        assert!(!Machine::parse("bar", &grammar).unwrap().is_matched());
    }

    #[test]
    fn test_prefix_match_does_not_consume_all_input() {
        let grammar = compile_single("foo".into());
        let result = Machine::parse("foobar", &grammar).unwrap();
        assert!(result.is_matched());
        assert_eq!(result.parse_tree().unwrap().end_index(), 3);
    }

    #[test]
    fn test_first_of_tries_alternatives_in_order() {
        let grammar = compile_single(Expression::first_of([
            "foo".into(),
            "bar".into(),
            "baz".into(),
        ]));

        for input in ["foo", "bar", "baz"] {
            assert!(Machine::parse(input, &grammar).unwrap().is_matched(), "{}", input);
        }
        assert!(!Machine::parse("qux", &grammar).unwrap().is_matched());
    }

    #[test]
    fn test_optional_and_zero_or_more_match_empty_input() {
        assert!(
            Machine::parse("", &compile_single(Expression::optional("a")))
                .unwrap()
                .is_matched()
        );
        assert!(
            Machine::parse("", &compile_single(Expression::zero_or_more("a")))
                .unwrap()
                .is_matched()
        );
    }

    #[test]
    fn test_one_or_more_requires_one_match() {
        let grammar = compile_single(Expression::one_or_more("a"));
        assert!(!Machine::parse("", &grammar).unwrap().is_matched());
        assert!(Machine::parse("a", &grammar).unwrap().is_matched());
        let result = Machine::parse("aaa", &grammar).unwrap();
        assert_eq!(result.parse_tree().unwrap().end_index(), 3);
    }

    #[test]
    fn test_empty_repetition_is_fatal() {
        let mut builder = GrammarBuilder::new();
        let list = builder.rule("list");
        builder
            .define(
                list,
                Expression::one_or_more(Expression::first_of(["foo".into(), "".into()])),
            )
            .unwrap();
        let grammar = builder.build(list).unwrap();

        let err = Machine::parse("foo", &grammar).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::EmptyRepetition { rule: Some(ref rule) } if rule == "list"
        ));
    }

    #[test]
    fn test_lookahead_consumes_nothing() {
        let grammar = compile_single(Expression::sequence([
            Expression::next("ba"),
            "bar".into(),
        ]));
        let result = Machine::parse("bar", &grammar).unwrap();
        assert!(result.is_matched());
        assert_eq!(result.parse_tree().unwrap().end_index(), 3);
    }

    #[test]
    fn test_negative_lookahead() {
        let grammar = compile_single(Expression::sequence([
            Expression::next_not("foo"),
            Expression::pattern("[a-z]+"),
        ]));
        assert!(Machine::parse("bar", &grammar).unwrap().is_matched());
        assert!(!Machine::parse("foo", &grammar).unwrap().is_matched());
    }

    #[test]
    fn test_direct_left_recursion_is_fatal() {
        let mut builder = GrammarBuilder::new();
        let r = builder.rule("expression");
        builder
            .define(r, Expression::sequence([r.into(), "a".into()]))
            .unwrap();
        let grammar = builder.build(r).unwrap();

        let err = Machine::parse("a", &grammar).unwrap_err();
        assert!(matches!(
            err,
            GrammarError::LeftRecursion { rule } if rule == "expression"
        ));
    }

    #[test]
    fn test_indirect_left_recursion_is_fatal() {
        let mut builder = GrammarBuilder::new();
        let a = builder.rule("a");
        let b = builder.rule("b");
        builder
            .define(a, Expression::sequence([b.into(), "x".into()]))
            .unwrap();
        builder
            .define(b, Expression::first_of([a.into(), "y".into()]))
            .unwrap();
        let grammar = builder.build(a).unwrap();

        let err = Machine::parse("y", &grammar).unwrap_err();
        assert!(matches!(err, GrammarError::LeftRecursion { .. }));
    }

    #[test]
    fn test_recursion_at_advancing_positions_is_fine() {
        let mut builder = GrammarBuilder::new();
        let r = builder.rule("parens");
        builder
            .define(
                r,
                Expression::first_of([
                    Expression::sequence(["(".into(), r.into(), ")".into()]),
                    "x".into(),
                ]),
            )
            .unwrap();
        let grammar = builder.build(r).unwrap();

        assert!(Machine::parse("((x))", &grammar).unwrap().is_matched());
        assert!(!Machine::parse("((x)", &grammar).unwrap().is_matched());
    }

    fn shared_rule_grammar(memoize: bool) -> CompiledGrammar {
        let mut builder = GrammarBuilder::new();
        let root = builder.rule("root");
        let prefix = builder.rule("prefix");
        builder
            .define(
                root,
                Expression::first_of([
                    Expression::sequence([prefix.into(), "x".into()]),
                    Expression::sequence([prefix.into(), "y".into()]),
                ]),
            )
            .unwrap();
        builder.define(prefix, "ab").unwrap();
        if !memoize {
            builder.no_memo(prefix);
        }
        builder.build(root).unwrap()
    }

    #[test]
    fn test_memoization_does_not_change_outcomes() {
        let with_memo = shared_rule_grammar(true);
        let without_memo = shared_rule_grammar(false);

        for input in ["abx", "aby", "abz", "ab", ""] {
            let a = Machine::parse(input, &with_memo).unwrap();
            let b = Machine::parse(input, &without_memo).unwrap();
            assert_eq!(a.is_matched(), b.is_matched(), "input {:?}", input);
            assert_eq!(a.parse_tree(), b.parse_tree(), "input {:?}", input);
        }
    }

    #[test]
    fn test_memoized_subtree_is_reused() {
        let grammar = shared_rule_grammar(true);
        let result = Machine::parse("aby", &grammar).unwrap();
        assert!(result.is_matched());

        // The prefix node parsed in the failed first alternative is reused
        // by the second; its span survives intact.
        let root = result.parse_tree().unwrap();
        let prefix = &root.children()[0];
        assert_eq!(prefix.start_index(), 0);
        assert_eq!(prefix.end_index(), 2);
        assert!(!prefix.is_leaf());
    }

    #[test]
    fn test_error_offset_is_the_furthest_failure() {
        let grammar = compile_single(Expression::sequence([
            "term".into(),
            " ".into(),
            "+".into(),
            " ".into(),
            "term".into(),
        ]));

        let result = Machine::parse("term +", &grammar).unwrap();
        assert!(!result.is_matched());
        assert_eq!(result.parse_error().unwrap().error_index(), 6);
    }

    #[test]
    fn test_error_offset_across_alternatives() {
        let grammar = compile_single(Expression::first_of([
            Expression::sequence(["term".into(), " + ".into(), "term".into()]),
            Expression::sequence(["term".into(), "-".into()]),
        ]));

        // First alternative dies at 6, second at 4; the furthest wins.
        let result = Machine::parse("term +", &grammar).unwrap();
        assert!(!result.is_matched());
        assert_eq!(result.parse_error().unwrap().error_index(), 6);
    }

    #[test]
    fn test_end_of_input() {
        let grammar = compile_single(Expression::sequence([
            "foo".into(),
            Expression::end_of_input(),
        ]));
        assert!(Machine::parse("foo", &grammar).unwrap().is_matched());

        let result = Machine::parse("foox", &grammar).unwrap();
        assert!(!result.is_matched());
        assert_eq!(result.parse_error().unwrap().error_index(), 3);
    }

    #[test]
    fn test_predicate_failures_are_not_reported() {
        let mut builder = GrammarBuilder::new();
        let root = builder.rule("root");
        let pair = builder.rule("pair");
        builder
            .define(
                root,
                Expression::sequence([Expression::next_not(Expression::from(pair)), "z".into()]),
            )
            .unwrap();
        builder
            .define(pair, Expression::sequence(["a".into(), "b".into()]))
            .unwrap();
        let grammar = builder.build(root).unwrap();

        // Inside the predicate, pair gets to index 1 before failing; that
        // failure is suppressed, so the reported offset is the real one.
        let result = Machine::parse("ax", &grammar).unwrap();
        assert!(!result.is_matched());
        assert_eq!(result.parse_error().unwrap().error_index(), 0);
    }

    #[test]
    fn test_matches_convenience() {
        let grammar = compile_single("foo".into());
        assert!(Machine::matches("foo", &grammar).unwrap());
        assert!(!Machine::matches("bar", &grammar).unwrap());
    }

    #[test]
    fn test_token_wrapper_creates_a_node() {
        let grammar = compile_single(Expression::token(
            TokenType::new("IDENTIFIER"),
            Expression::pattern("[a-z]+"),
        ));

        let result = Machine::parse("abc", &grammar).unwrap();
        let root = result.parse_tree().unwrap();
        let token_node = &root.children()[0];
        assert!(matches!(
            grammar.matcher(token_node.matcher().unwrap()),
            Matcher::Token { token_type } if token_type.name() == "IDENTIFIER"
        ));
        assert_eq!(token_node.end_index(), 3);
    }

    // ==== lexerful mode ====

    fn ident(value: &str, line: usize, column: usize) -> Token {
        Token::new(TokenType::new("IDENTIFIER"), value, line, column)
    }

    fn lexerful_grammar() -> CompiledGrammar {
        let mut builder = GrammarBuilder::new();
        let root = builder.rule("addition");
        builder
            .define(
                root,
                Expression::sequence([
                    Expression::token_type_is(TokenType::new("IDENTIFIER")),
                    Expression::token_value_is("+"),
                    Expression::token_type_is(TokenType::new("IDENTIFIER")),
                    Expression::token_type_is(TokenType::EOF),
                ]),
            )
            .unwrap();
        builder.build(root).unwrap()
    }

    #[test]
    fn test_lexerful_parse() {
        let tokens = vec![
            ident("a", 1, 0),
            Token::new(TokenType::new("OPERATOR"), "+", 1, 2),
            ident("b", 1, 4),
            Token::new(TokenType::EOF, "", 1, 5),
        ];
        let tree = Machine::parse_tokens(&tokens, &lexerful_grammar()).unwrap();
        assert_eq!(tree.start_index(), 0);
        assert_eq!(tree.end_index(), 4);
    }

    #[test]
    fn test_lexerful_mismatch_reports_line_and_snippet() {
        let tokens = vec![
            ident("a", 2, 0),
            Token::new(TokenType::new("OPERATOR"), "+", 2, 2),
            Token::new(TokenType::EOF, "", 2, 3),
        ];
        let err = Machine::parse_tokens(&tokens, &lexerful_grammar()).unwrap_err();
        match err {
            ParserError::Recognition { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("Parse error"));
                assert!(message.contains("-->"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_lexerful_rejects_empty_token_stream() {
        let err = Machine::parse_tokens(&[], &lexerful_grammar()).unwrap_err();
        assert!(matches!(
            err,
            ParserError::Recognition { line: 1, ref message } if message == "no tokens"
        ));
    }
}
