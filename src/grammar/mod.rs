pub mod builder;
pub mod expression;
pub mod grammar_error;

pub use builder::{ElisionPolicy, GrammarBuilder, RuleKey};
pub use expression::Expression;
pub use grammar_error::GrammarError;
