//! Tokenizer for script source units.

mod cursor;
#[allow(clippy::module_inception)]
mod lexer;
mod token;

pub use lexer::{Lexer, TokenBuffer};
pub use token::{Token, TokenKind, lookup_keyword};
