/// Observer of machine failure events. Called on every reportable
/// backtrack; backtracks under a predicate or inside a token wrapper are
/// suppressed and never reach the handler.
pub trait MachineHandler {
    fn on_backtrack(&mut self, index: usize);
}

/// Handler that ignores everything.
pub struct NopHandler;

impl MachineHandler for NopHandler {
    fn on_backtrack(&mut self, _index: usize) {}
}

/// Tracks the furthest input position any alternative reached before
/// failing. Reported as the error offset of a mismatch.
#[derive(Debug, Default)]
pub struct ErrorLocatingHandler {
    error_index: usize,
}

impl ErrorLocatingHandler {
    pub fn new() -> Self {
        ErrorLocatingHandler { error_index: 0 }
    }

    pub fn error_index(&self) -> usize {
        self.error_index
    }
}

impl MachineHandler for ErrorLocatingHandler {
    fn on_backtrack(&mut self, index: usize) {
        if index > self.error_index {
            self.error_index = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_furthest_index() {
        let mut handler = ErrorLocatingHandler::new();
        handler.on_backtrack(3);
        handler.on_backtrack(7);
        handler.on_backtrack(5);
        assert_eq!(handler.error_index(), 7);
    }

    #[test]
    fn test_defaults_to_start_of_input() {
        assert_eq!(ErrorLocatingHandler::new().error_index(), 0);
    }
}
