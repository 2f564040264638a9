use crate::parser::input::{InputBuffer, Position};
use crate::token::Token;

/// Lines of context shown around a lexerless parse error.
const SNIPPET_LINES: usize = 10;

/// Tokens of context shown around a lexerful parse error.
const SNIPPET_TOKENS: usize = 30;

/// Renders a lexerless mismatch as a numbered source snippet with a caret
/// under the error column.
pub struct ParseErrorFormatter;

impl ParseErrorFormatter {
    pub fn format(&self, input: &InputBuffer, error_index: usize) -> String {
        let position = input.position(error_index);
        let mut out = format!(
            "Parse error at line {} column {}:\n\n",
            position.line(),
            position.column()
        );
        self.append_snippet(&mut out, input, position);
        out
    }

    fn append_snippet(&self, out: &mut String, input: &InputBuffer, position: Position) {
        let first = position.line().saturating_sub(SNIPPET_LINES).max(1);
        let last = (position.line() + SNIPPET_LINES).min(input.line_count());
        let padding = last.to_string().len();

        for line in first..=last {
            out.push_str(&format!("{:>width$}: ", line, width = padding));
            out.push_str(
                &trim_trailing_line_separator(input.extract_line(line)).replace('\t', " "),
            );
            out.push('\n');
            if line == position.line() {
                for _ in 0..(position.column() + padding + 1) {
                    out.push(' ');
                }
                out.push_str("^\n");
            }
        }
    }
}

/// Renders a lexerful mismatch by reconstructing source lines from the
/// token stream, marking the error line with an arrow.
pub struct LexerfulParseErrorFormatter;

impl LexerfulParseErrorFormatter {
    pub fn format(&self, tokens: &[Token], error_index: usize) -> String {
        let error = if error_index < tokens.len() {
            let token = &tokens[error_index];
            Position::new(token.line(), token.column() + 1)
        } else {
            token_end(&tokens[tokens.len() - 1])
        };
        let mut out = format!(
            "Parse error at line {} column {}:\n\n",
            error.line(),
            error.column()
        );
        let first = error_index.saturating_sub(SNIPPET_TOKENS);
        let last = (error_index + SNIPPET_TOKENS).min(tokens.len());
        self.append_snippet(&mut out, &tokens[first..last], error.line());
        out
    }

    fn append_snippet(&self, out: &mut String, tokens: &[Token], error_line: usize) {
        let Some(first) = tokens.first() else {
            return;
        };
        let mut line = first.line();
        let mut column = 0;
        out.push_str(&line_prefix(line, error_line));

        for token in tokens {
            while line < token.line() {
                out.push('\n');
                line += 1;
                column = 0;
                out.push_str(&line_prefix(line, error_line));
            }
            while column < token.column() {
                out.push(' ');
                column += 1;
            }
            for (i, piece) in token.original_value().split('\n').enumerate() {
                let piece = piece.strip_suffix('\r').unwrap_or(piece);
                if i > 0 {
                    out.push('\n');
                    line += 1;
                    column = 0;
                    out.push_str(&line_prefix(line, error_line));
                }
                out.push_str(piece);
                column += piece.chars().count();
            }
        }
        out.push('\n');
    }
}

fn line_prefix(line: usize, error_line: usize) -> String {
    if line == error_line {
        "  -->  ".to_string()
    } else {
        format!("{:>5}: ", line)
    }
}

/// Position one past a token, accounting for line breaks inside its
/// verbatim text.
fn token_end(token: &Token) -> Position {
    let pieces: Vec<&str> = token.original_value().split('\n').collect();
    if pieces.len() > 1 {
        let last = pieces[pieces.len() - 1];
        Position::new(
            token.line() + pieces.len() - 1,
            last.strip_suffix('\r').unwrap_or(last).chars().count() + 1,
        )
    } else {
        Position::new(token.line(), token.column() + token.original_value().chars().count() + 1)
    }
}

pub(crate) fn trim_trailing_line_separator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}
