pub mod error_fmt;
pub mod input;
pub mod parser_error;
pub mod result;

pub use error_fmt::{LexerfulParseErrorFormatter, ParseErrorFormatter};
pub use input::{InputBuffer, Position};
pub use parser_error::ParserError;
pub use result::{ParseError, ParsingResult};
