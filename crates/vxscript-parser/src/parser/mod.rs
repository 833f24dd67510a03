//! Recursive-descent parser building a [`Cst`].
//!
//! Every production returns `Result<NodeId, ParseError>`. A production that
//! fails destroys the node it allocated, so a failed subtree never stays in
//! the arena. Errors are caught at statement and declaration boundaries,
//! recorded, and the parser skips ahead to the next `;` or past the next
//! balanced `{ ... }` before it continues.
//!
//! Lookahead is done by scanning ahead and rewinding to a saved token index.

mod expr;
mod script;
mod stmt;
mod types;

use bumpalo::Bump;
use vxscript_core::{ParseError, ParseErrors};

use crate::cst::{Cst, NodeId, NodeKind};
use crate::lexer::{Lexer, Token, TokenKind};

type PResult = Result<NodeId, ParseError>;

/// Tree and errors produced for one source unit.
#[derive(Debug)]
pub struct ParseOutput {
    pub cst: Cst,
    pub errors: ParseErrors,
}

impl ParseOutput {
    pub fn root(&self) -> Option<NodeId> {
        self.cst.root()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse a whole script. The tree root is a `Script` node.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn parse(source: &str) -> ParseOutput {
    let arena = Bump::new();
    let buffer = Lexer::new(source).tokenize_in(&arena);

    let mut parser = Parser::new(&buffer.tokens);
    for error in buffer.errors {
        parser.errors.push(error.into());
    }
    let root = parser.parse_script();
    parser.cst.set_root(root);
    parser.finish()
}

pub(crate) struct Parser<'t, 'src> {
    tokens: &'t [Token<'src>],
    /// Index of the current token; never points at trivia.
    pos: usize,
    cst: Cst,
    errors: ParseErrors,
}

impl<'t, 'src> Parser<'t, 'src> {
    fn new(tokens: &'t [Token<'src>]) -> Self {
        let mut parser = Self {
            tokens,
            pos: 0,
            cst: Cst::new(),
            errors: ParseErrors::new(),
        };
        parser.skip_trivia();
        parser
    }

    fn finish(self) -> ParseOutput {
        ParseOutput {
            cst: self.cst,
            errors: self.errors,
        }
    }

    // =========================================
    // Token cursor
    // =========================================

    /// Unrecognized characters were already reported by the lexer and are
    /// skipped like whitespace.
    fn skip_trivia(&mut self) {
        while self.pos + 1 < self.tokens.len() {
            let kind = self.tokens[self.pos].kind;
            if !kind.is_trivia() && kind != TokenKind::Error {
                break;
            }
            self.pos += 1;
        }
    }

    #[inline]
    fn peek(&self) -> Token<'src> {
        self.tokens[self.pos]
    }

    /// The `n`-th significant token after the current one.
    fn peek_nth(&self, n: usize) -> Token<'src> {
        let mut seen = 0;
        let mut index = self.pos;
        while index + 1 < self.tokens.len() {
            if seen == n {
                break;
            }
            index += 1;
            let kind = self.tokens[index].kind;
            if !kind.is_trivia() && kind != TokenKind::Error {
                seen += 1;
            }
        }
        self.tokens[index]
    }

    #[inline]
    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token<'src> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
            self.skip_trivia();
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token<'src>> {
        if self.check(kind) { Some(self.advance()) } else { None }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let found = self.peek();
        if found.kind == TokenKind::Eof {
            return Err(ParseError::unexpected_eof(found.span));
        }
        Err(ParseError::expected_token(found.span, kind.description(), found.lexeme))
    }

    #[inline]
    fn checkpoint(&self) -> usize {
        self.pos
    }

    #[inline]
    fn rewind(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    fn unexpected(&self, token: &Token<'_>) -> ParseError {
        if token.kind == TokenKind::Eof {
            ParseError::unexpected_eof(token.span)
        } else {
            ParseError::unexpected_token(token.span, token.lexeme)
        }
    }

    // =========================================
    // Tree building
    // =========================================

    /// Allocate a node of `kind`, let `fill` attach its children, and destroy
    /// the partial node if `fill` fails.
    fn build(
        &mut self,
        kind: NodeKind,
        fill: impl FnOnce(&mut Self, NodeId) -> Result<(), ParseError>,
    ) -> PResult {
        let node = self.cst.alloc(kind);
        match fill(self, node) {
            Ok(()) => Ok(node),
            Err(err) => {
                self.cst.destroy(node);
                Err(err)
            }
        }
    }

    /// Consume the current token as a childless node under `parent`.
    fn leaf(&mut self, parent: NodeId, kind: NodeKind) -> Token<'src> {
        let token = self.advance();
        let node = self.cst.alloc_token(kind, &token);
        self.cst.add_child_last(parent, node);
        token
    }

    /// Attach the result of a child production.
    fn child(&mut self, parent: NodeId, result: PResult) -> Result<(), ParseError> {
        let node = result?;
        self.cst.add_child_last(parent, node);
        Ok(())
    }

    fn expect_identifier(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let token = self.peek();
        if token.kind != TokenKind::Identifier {
            return Err(match token.kind {
                TokenKind::Eof => ParseError::unexpected_eof(token.span),
                _ => ParseError::expected_identifier(token.span, token.lexeme),
            });
        }
        self.leaf(parent, NodeKind::Identifier);
        Ok(())
    }

    // =========================================
    // Error recovery
    // =========================================

    fn report(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    /// Skip to the end of the broken statement. Inside a block a closing
    /// brace is left for the block to consume.
    fn synchronize(&mut self, in_block: bool) {
        loop {
            match self.peek().kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::LeftBrace => {
                    self.skip_block();
                    return;
                }
                TokenKind::RightBrace => {
                    if !in_block {
                        self.advance();
                    }
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skip a `{ ... }` group including nested groups.
    fn skip_block(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.advance().kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                TokenKind::Eof => return,
                _ => {}
            }
        }
    }
}
