//! A parsing-expression-grammar engine: grammars are built as expression
//! trees, compiled to flat bytecode, and executed by a backtracking
//! virtual machine that produces parse trees and, from those, ASTs.
//!
//! ```
//! use pegvm::{AstBuilder, Expression, GrammarBuilder, Machine};
//!
//! let mut builder = GrammarBuilder::new();
//! let greeting = builder.rule("greeting");
//! builder
//!     .define(
//!         greeting,
//!         Expression::sequence([
//!             "hello".into(),
//!             Expression::pattern("[ ]+"),
//!             Expression::pattern("[a-z]+"),
//!             Expression::end_of_input(),
//!         ]),
//!     )
//!     .unwrap();
//! let grammar = builder.build(greeting).unwrap();
//!
//! let result = Machine::parse("hello world", &grammar).unwrap();
//! assert!(result.is_matched());
//! let ast = AstBuilder::build(&grammar, &result).unwrap();
//! assert_eq!(ast.node(ast.root()).name, "greeting");
//! ```

pub mod ast;
pub mod bytecode;
pub mod grammar;
pub mod parser;
pub mod token;
pub mod vm;

pub use ast::{Ast, AstBuilder, AstNode, AstNodeId, AstNodeKind};
pub use bytecode::{CompiledGrammar, GrammarImage, Matcher, MatcherId, Op};
pub use grammar::{ElisionPolicy, Expression, GrammarBuilder, GrammarError, RuleKey};
pub use parser::{InputBuffer, ParseError, ParserError, ParsingResult, Position};
pub use token::{Token, TokenType, Trivia, TriviaKind};
pub use vm::{ErrorLocatingHandler, Machine, MachineHandler, NopHandler, ParseNode};
