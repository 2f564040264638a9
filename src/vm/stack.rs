use crate::bytecode::MatcherId;
use crate::vm::parse_tree::ParseNode;
use std::rc::Rc;

/// One machine frame. Backtrack frames (no matcher) record where to resume
/// on failure; return frames (with matcher) record where to resume on `Ret`
/// plus the left-recursion slot they displaced.
#[derive(Debug)]
pub(crate) struct StackFrame {
    pub(crate) address: isize,
    pub(crate) index: usize,
    pub(crate) ignore_errors: bool,
    pub(crate) matcher: Option<MatcherId>,
    /// Child nodes pending until this frame commits or returns
    pub(crate) nodes: Vec<Rc<ParseNode>>,
    pub(crate) called_address: usize,
    pub(crate) left_recursion: isize,
}

impl StackFrame {
    pub(crate) fn is_return(&self) -> bool {
        self.matcher.is_some()
    }
}

/// Frame stack. A base frame sits at the bottom and collects the root
/// node; it is never popped.
#[derive(Debug)]
pub(crate) struct MachineStack {
    frames: Vec<StackFrame>,
}

impl MachineStack {
    pub(crate) fn new() -> Self {
        MachineStack {
            frames: vec![StackFrame {
                address: -1,
                index: 0,
                ignore_errors: false,
                matcher: None,
                nodes: Vec::new(),
                called_address: 0,
                left_recursion: -1,
            }],
        }
    }

    pub(crate) fn push(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) -> StackFrame {
        debug_assert!(self.frames.len() > 1);
        // The base frame is never popped, so the stack is never empty
        self.frames.pop().expect("frame stack is never empty")
    }

    pub(crate) fn top(&self) -> &StackFrame {
        self.frames.last().expect("frame stack is never empty")
    }

    pub(crate) fn top_mut(&mut self) -> &mut StackFrame {
        self.frames.last_mut().expect("frame stack is never empty")
    }

    /// Frame directly under the top.
    pub(crate) fn parent_mut(&mut self) -> &mut StackFrame {
        let index = self.frames.len() - 2;
        &mut self.frames[index]
    }

    pub(crate) fn at_base(&self) -> bool {
        self.frames.len() == 1
    }

    /// Walks from the top down (excluding the base frame).
    pub(crate) fn iter_top_down(&self) -> impl Iterator<Item = &StackFrame> {
        self.frames[1..].iter().rev()
    }

    /// Removes the root node collected by the base frame.
    pub(crate) fn take_root(&mut self) -> Option<Rc<ParseNode>> {
        self.frames[0].nodes.pop()
    }
}
