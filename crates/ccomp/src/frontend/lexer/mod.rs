//! Lexer with the built-in preprocessor

mod scanner;
mod token;

pub use scanner::{DEFAULT_MAX_NESTING_DEPTH, Lexer, LexerConfig};
pub use token::{Token, TokenKind};
