use crate::bytecode::ir::MatcherId;
use crate::grammar::RuleKey;
use serde::{Deserialize, Serialize};

/// A bytecode instruction. Jump offsets are relative to the instruction's
/// own address; matcher operands index the grammar's matcher table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    // Control flow
    /// Unconditional relative jump
    Jump(i32),
    /// Push a return frame and jump into a rule body
    Call { offset: i32, matcher: MatcherId },
    /// Return from a rule body, producing a parse node
    Ret,

    // Choice points
    /// Push a backtrack frame resuming at the given offset
    Choice(i32),
    /// Like Choice, but suppresses failure reporting underneath it
    PredicateChoice(i32),
    /// Drop the nearest backtrack frame, keep its pending nodes, jump
    Commit(i32),
    /// Commit that aborts if the iteration consumed no input
    CommitVerify(i32),
    /// Rewind input to the nearest backtrack frame, drop it, jump
    BackCommit(i32),

    // Failure
    /// Fail and unwind to the nearest backtrack frame
    Backtrack,
    /// Drop the nearest backtrack frame, rewind, then fail
    FailTwice,
    /// Suppress failure reporting until the enclosing frame pops
    IgnoreErrors,

    // Native leaves
    /// Match a literal string at the current position
    Literal(MatcherId),
    /// Match an anchored regex at the current position
    Pattern(MatcherId),
    /// Succeed only at the end of the input
    EndOfInput,
    /// Lexerful: match one token by type
    TokenTypeIs(MatcherId),
    /// Lexerful: match one token by value
    TokenValueIs(MatcherId),

    /// Link-time placeholder for a rule call; never executed
    RuleRef(RuleKey),
}
