//! Statements and statement blocks.

use vxscript_core::{ParseError, ParseErrorKind};

use super::{PResult, Parser};
use crate::cst::{NodeId, NodeKind};
use crate::lexer::TokenKind;

impl Parser<'_, '_> {
    /// `{ (declaration | statement)* }`. Errors inside the block are
    /// recorded and parsing resumes at the next statement.
    pub(super) fn parse_statement_block(&mut self) -> PResult {
        self.build(NodeKind::StatementBlock, |p, node| {
            let open = p.expect(TokenKind::LeftBrace)?;
            p.cst.update_source_pos(node, &open);

            loop {
                let token = p.peek();
                match token.kind {
                    TokenKind::RightBrace => {
                        p.advance();
                        p.cst.update_source_pos(node, &token);
                        return Ok(());
                    }
                    TokenKind::Eof => {
                        p.report(ParseError::unexpected_eof(token.span));
                        return Ok(());
                    }
                    _ => {
                        let result = if p.is_var_decl() {
                            p.parse_declaration(NodeKind::Declaration)
                        } else {
                            p.parse_statement()
                        };
                        p.attach_or_recover(node, result);
                    }
                }
            }
        })
    }

    fn attach_or_recover(&mut self, parent: NodeId, result: PResult) {
        match result {
            Ok(child) => self.cst.add_child_last(parent, child),
            Err(err) => {
                self.report(err);
                self.synchronize(true);
            }
        }
    }

    pub(super) fn parse_statement(&mut self) -> PResult {
        match self.peek().kind {
            TokenKind::LeftBrace => self.parse_statement_block(),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => self.parse_keyword_statement(NodeKind::Break),
            TokenKind::Continue => self.parse_keyword_statement(NodeKind::Continue),
            TokenKind::Case | TokenKind::Default | TokenKind::Else => {
                let token = self.peek();
                Err(self.unexpected(&token))
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// `;` or `assignment ;`
    pub(super) fn parse_expression_statement(&mut self) -> PResult {
        self.build(NodeKind::ExpressionStatement, |p, node| {
            if !p.check(TokenKind::Semicolon) {
                let expr = p.parse_assignment();
                p.child(node, expr)?;
            }
            let end = p.expect(TokenKind::Semicolon)?;
            p.cst.update_source_pos(node, &end);
            Ok(())
        })
    }

    /// `( assignment )` as used by `if`, `while` and `switch`.
    fn parse_paren_condition(&mut self, node: NodeId) -> Result<(), ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_assignment();
        self.child(node, condition)?;
        self.expect(TokenKind::RightParen)?;
        Ok(())
    }

    fn parse_if(&mut self) -> PResult {
        self.build(NodeKind::If, |p, node| {
            let keyword = p.advance();
            p.cst.update_source_pos(node, &keyword);
            p.parse_paren_condition(node)?;
            let then = p.parse_statement();
            p.child(node, then)?;
            if p.eat(TokenKind::Else).is_some() {
                let otherwise = p.parse_statement();
                p.child(node, otherwise)?;
            }
            Ok(())
        })
    }

    /// `for ( init cond ; increment? ) statement`
    fn parse_for(&mut self) -> PResult {
        self.build(NodeKind::For, |p, node| {
            let keyword = p.advance();
            p.cst.update_source_pos(node, &keyword);
            p.expect(TokenKind::LeftParen)?;

            let init = if p.is_var_decl() {
                p.parse_declaration(NodeKind::Declaration)
            } else {
                p.parse_expression_statement()
            };
            p.child(node, init)?;

            let condition = p.parse_expression_statement();
            p.child(node, condition)?;

            if !p.check(TokenKind::RightParen) {
                let increment = p.parse_assignment();
                p.child(node, increment)?;
            }
            p.expect(TokenKind::RightParen)?;

            let body = p.parse_statement();
            p.child(node, body)
        })
    }

    fn parse_while(&mut self) -> PResult {
        self.build(NodeKind::While, |p, node| {
            let keyword = p.advance();
            p.cst.update_source_pos(node, &keyword);
            p.parse_paren_condition(node)?;
            let body = p.parse_statement();
            p.child(node, body)
        })
    }

    /// `do statement while ( assignment ) ;`
    fn parse_do_while(&mut self) -> PResult {
        self.build(NodeKind::DoWhile, |p, node| {
            let keyword = p.advance();
            p.cst.update_source_pos(node, &keyword);
            let body = p.parse_statement();
            p.child(node, body)?;
            p.expect(TokenKind::While)?;
            p.parse_paren_condition(node)?;
            let end = p.expect(TokenKind::Semicolon)?;
            p.cst.update_source_pos(node, &end);
            Ok(())
        })
    }

    fn parse_return(&mut self) -> PResult {
        self.build(NodeKind::Return, |p, node| {
            let keyword = p.advance();
            p.cst.update_source_pos(node, &keyword);
            if !p.check(TokenKind::Semicolon) {
                let value = p.parse_assignment();
                p.child(node, value)?;
            }
            let end = p.expect(TokenKind::Semicolon)?;
            p.cst.update_source_pos(node, &end);
            Ok(())
        })
    }

    /// `break ;` and `continue ;`
    fn parse_keyword_statement(&mut self, kind: NodeKind) -> PResult {
        self.build(kind, |p, node| {
            let keyword = p.advance();
            p.cst.set_token(node, &keyword);
            let end = p.expect(TokenKind::Semicolon)?;
            p.cst.update_source_pos(node, &end);
            Ok(())
        })
    }

    /// `switch ( assignment ) { case* }`
    fn parse_switch(&mut self) -> PResult {
        self.build(NodeKind::Switch, |p, node| {
            let keyword = p.advance();
            p.cst.update_source_pos(node, &keyword);
            p.parse_paren_condition(node)?;
            p.expect(TokenKind::LeftBrace)?;

            loop {
                let token = p.peek();
                match token.kind {
                    TokenKind::RightBrace => {
                        p.advance();
                        p.cst.update_source_pos(node, &token);
                        return Ok(());
                    }
                    TokenKind::Case | TokenKind::Default => {
                        let case = p.parse_case();
                        p.child(node, case)?;
                    }
                    TokenKind::Eof => return Err(ParseError::unexpected_eof(token.span)),
                    _ => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnexpectedToken,
                            token.span,
                            format!("Expected 'case' or 'default', found '{}'", token.lexeme),
                        ));
                    }
                }
            }
        })
    }

    /// `case expression :` or `default :`, then statements up to the next
    /// label or the end of the switch.
    fn parse_case(&mut self) -> PResult {
        self.build(NodeKind::Case, |p, node| {
            let label = p.advance();
            p.cst.set_token(node, &label);
            if label.kind == TokenKind::Case {
                let value = p.parse_expression();
                p.child(node, value)?;
            }
            p.expect(TokenKind::Colon)?;

            loop {
                let token = p.peek();
                match token.kind {
                    TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof => {
                        return Ok(());
                    }
                    _ if p.is_var_decl() => {
                        let err = ParseError::new(
                            ParseErrorKind::ExpectedStatement,
                            token.span,
                            "Variable declarations in a case must be enclosed in a statement block",
                        );
                        p.report(err);
                        p.synchronize(true);
                    }
                    _ => {
                        let statement = p.parse_statement();
                        p.attach_or_recover(node, statement);
                    }
                }
            }
        })
    }
}
