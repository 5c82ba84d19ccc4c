//! Front end for the Kotlin subset understood by the playground.
//!
//! [`parse_file`] turns one source file into a [`ParsedFile`]: a declaration
//! tree plus the syntax errors found along the way. Parsing is total; callers
//! decide what a syntax error means for them.

pub mod ast;
pub mod lexer;
mod line_index;
mod parser;

pub use lexer::{lex, Token, TokenKind};
pub use line_index::{LineIndex, Span};
pub use parser::{parse_file, ParsedFile, SyntaxError};
