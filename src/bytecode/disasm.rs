use crate::bytecode::Op;
use crate::bytecode::ir::CompiledGrammar;
use std::fmt::Write;

/// Print disassembly of a compiled grammar
pub fn print_grammar(grammar: &CompiledGrammar) {
    print!("{}", disassemble_to_string(grammar));
}

/// Disassemble a compiled grammar into a string
pub fn disassemble_to_string(grammar: &CompiledGrammar) -> String {
    let jump_targets = collect_jump_targets(grammar.ops());
    let mut out = String::new();

    for (ip, op) in grammar.ops().iter().enumerate() {
        if let Some(matcher) = grammar.rule_offsets().get(&ip) {
            let _ = writeln!(out, "════ {} ════", grammar.matcher(*matcher).label());
        }

        let marker = if jump_targets.contains(&ip) { "► " } else { "  " };
        let _ = writeln!(out, "{:04} {}{}", ip, marker, format_op(grammar, *op, ip));
    }
    out
}

fn collect_jump_targets(ops: &[Op]) -> Vec<usize> {
    let mut targets = Vec::new();

    for (ip, op) in ops.iter().enumerate() {
        let offset = match op {
            Op::Jump(offset)
            | Op::Call { offset, .. }
            | Op::Choice(offset)
            | Op::PredicateChoice(offset)
            | Op::Commit(offset)
            | Op::CommitVerify(offset)
            | Op::BackCommit(offset) => Some(*offset),
            _ => None,
        };

        if let Some(offset) = offset {
            let target = (ip as i32 + offset) as usize;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    targets
}

fn format_op(grammar: &CompiledGrammar, op: Op, ip: usize) -> String {
    let jump = |offset: i32| {
        let target = (ip as i32 + offset) as usize;
        let direction = if offset < 0 { "↑" } else { "↓" };
        format!("{:+} {} (→ {:04})", offset, direction, target)
    };
    let label = |id| grammar.matcher(id).label();

    match op {
        Op::Jump(offset) => format!("JUMP        {}", jump(offset)),
        Op::Call { offset, matcher } => {
            format!("CALL        {}  ; {}", jump(offset), label(matcher))
        }
        Op::Ret => "RET".to_string(),

        Op::Choice(offset) => format!("CHOICE      {}", jump(offset)),
        Op::PredicateChoice(offset) => format!("PRED_CHOICE {}", jump(offset)),
        Op::Commit(offset) => format!("COMMIT      {}", jump(offset)),
        Op::CommitVerify(offset) => format!("COMMIT_VRFY {}", jump(offset)),
        Op::BackCommit(offset) => format!("BACK_COMMIT {}", jump(offset)),

        Op::Backtrack => "BACKTRACK".to_string(),
        Op::FailTwice => "FAIL_TWICE".to_string(),
        Op::IgnoreErrors => "IGNORE_ERRS".to_string(),

        Op::Literal(id) => format!("LITERAL     {}", label(id)),
        Op::Pattern(id) => format!("PATTERN     {}", label(id)),
        Op::EndOfInput => "END_OF_INPUT".to_string(),
        Op::TokenTypeIs(id) => format!("TOKEN_TYPE  {}", label(id)),
        Op::TokenValueIs(id) => format!("TOKEN_VALUE {}", label(id)),

        Op::RuleRef(key) => format!("RULE_REF    <unlinked {:?}>", key),
    }
}
