/// The parsed text plus a line-start table for position lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct InputBuffer {
    text: String,
    /// Byte offset of each line start, with the text length as sentinel
    lines: Vec<usize>,
}

/// 1-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    line: usize,
    column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.line, self.column)
    }
}

impl InputBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let bytes = text.as_bytes();
        let mut lines = vec![0];
        for i in 0..bytes.len() {
            if is_end_of_line(bytes, i) {
                lines.push(i + 1);
            }
        }
        lines.push(bytes.len());
        InputBuffer { text, lines }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len() - 1
    }

    /// The text of a 1-based line, including its terminator.
    pub fn extract_line(&self, line: usize) -> &str {
        &self.text[self.lines[line - 1]..self.lines[line]]
    }

    /// Position of a byte offset; offsets at or past the end land on the
    /// last line.
    pub fn position(&self, index: usize) -> Position {
        let line = match self.lines.binary_search(&index) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
        .min(self.line_count());
        Position::new(line, index - self.lines[line - 1] + 1)
    }
}

/// True when the byte at `i` terminates a line. A CR followed by LF does
/// not terminate on its own; the LF does.
fn is_end_of_line(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'\n' || (bytes[i] == b'\r' && (i + 1 == bytes.len() || bytes[i + 1] != b'\n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let buffer = InputBuffer::new("abc");
        assert_eq!(buffer.line_count(), 1);
        assert_eq!(buffer.extract_line(1), "abc");
        assert_eq!(buffer.position(0), Position::new(1, 1));
        assert_eq!(buffer.position(2), Position::new(1, 3));
        assert_eq!(buffer.position(3), Position::new(1, 4));
    }

    #[test]
    fn test_empty_input() {
        let buffer = InputBuffer::new("");
        assert_eq!(buffer.line_count(), 1);
        assert_eq!(buffer.extract_line(1), "");
        assert_eq!(buffer.position(0), Position::new(1, 1));
    }

    #[test]
    fn test_lf_lines() {
        let buffer = InputBuffer::new("ab\ncd");
        assert_eq!(buffer.line_count(), 2);
        assert_eq!(buffer.extract_line(1), "ab\n");
        assert_eq!(buffer.extract_line(2), "cd");
        assert_eq!(buffer.position(2), Position::new(1, 3));
        assert_eq!(buffer.position(3), Position::new(2, 1));
        assert_eq!(buffer.position(5), Position::new(2, 3));
    }

    #[test]
    fn test_crlf_counts_as_one_break() {
        let buffer = InputBuffer::new("a\r\nb");
        assert_eq!(buffer.line_count(), 2);
        assert_eq!(buffer.position(1), Position::new(1, 2));
        assert_eq!(buffer.position(3), Position::new(2, 1));
    }

    #[test]
    fn test_lone_cr_breaks_a_line() {
        let buffer = InputBuffer::new("a\rb");
        assert_eq!(buffer.line_count(), 2);
        assert_eq!(buffer.position(2), Position::new(2, 1));
    }

    #[test]
    fn test_trailing_newline() {
        let buffer = InputBuffer::new("ab\n");
        assert_eq!(buffer.line_count(), 2);
        assert_eq!(buffer.position(3).line(), 2);
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(3, 7).to_string(), "(3, 7)");
    }
}
