pub mod compile;
pub mod disasm;
pub mod image;
pub mod ir;
pub mod op;

pub use compile::Compiler;
pub use image::GrammarImage;
pub use ir::{CompiledGrammar, Matcher, MatcherId};
pub use op::Op;
