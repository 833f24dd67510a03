//! vxscript parser crate.
//!
//! This crate turns script source into a concrete syntax tree:
//! - Lexical analysis ([`Lexer`]), producing trivia-inclusive tokens
//! - The arena-backed tree ([`Cst`]) with explicit node ownership
//! - The recursive-descent [`parse`] entry point with error recovery
//!
//! # Example
//!
//! ```
//! use vxscript_parser::{NodeKind, parse};
//!
//! let source = r#"
//!     int health = 100;
//!
//!     void take_damage(int amount) {
//!         health -= amount;
//!     }
//! "#;
//!
//! let output = parse(source);
//! assert!(output.errors.is_empty());
//! let root = output.root().unwrap();
//! let kinds: Vec<_> = output.cst.children(root).map(|id| output.cst.kind(id)).collect();
//! assert_eq!(kinds, [NodeKind::GlobalVar, NodeKind::Function]);
//! ```

pub mod cst;
pub mod lexer;
mod parser;
mod source;

pub use cst::{Cst, Node, NodeId, NodeKind};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseOutput, parse};
pub use source::SourceUnit;
pub use vxscript_core::{ParseError, ParseErrors, Span};
