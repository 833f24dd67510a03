//! Data types, type modifiers and parameter lists.

use vxscript_core::ParseError;

use super::{PResult, Parser};
use crate::cst::NodeKind;
use crate::lexer::TokenKind;

impl Parser<'_, '_> {
    fn is_type_base(kind: TokenKind) -> bool {
        kind == TokenKind::Identifier || kind.primitive_kind().is_some()
    }

    /// `const? base ([] | @)*`
    pub(super) fn parse_type(&mut self) -> PResult {
        self.build(NodeKind::DataType, |p, node| {
            if p.check(TokenKind::Const) {
                p.leaf(node, NodeKind::Undefined);
            }

            let base = p.peek();
            if !Self::is_type_base(base.kind) {
                return Err(match base.kind {
                    TokenKind::Eof => ParseError::unexpected_eof(base.span),
                    _ => ParseError::expected_type(base.span, base.lexeme),
                });
            }
            p.leaf(node, NodeKind::Undefined);
            p.cst.set_token(node, &base);

            loop {
                match p.peek().kind {
                    TokenKind::LeftBracket => {
                        let open = p.advance();
                        let close = p.expect(TokenKind::RightBracket)?;
                        let modifier = p.cst.alloc_token(NodeKind::Undefined, &open);
                        p.cst.update_source_pos(modifier, &close);
                        p.cst.add_child_last(node, modifier);
                    }
                    TokenKind::At => {
                        p.leaf(node, NodeKind::Undefined);
                    }
                    _ => return Ok(()),
                }
            }
        })
    }

    /// Empty, or `&` followed by an optional `in`, `out` or `inout`.
    pub(super) fn parse_type_mod(&mut self) -> PResult {
        self.build(NodeKind::TypeMod, |p, node| {
            if p.check(TokenKind::Amp) {
                p.leaf(node, NodeKind::Undefined);
                if matches!(p.peek().kind, TokenKind::In | TokenKind::Out | TokenKind::InOut) {
                    p.leaf(node, NodeKind::Undefined);
                }
            }
            Ok(())
        })
    }

    /// `( )`, `( void )` or `( param (, param)* )` where a parameter is a
    /// type, a type modifier and an optional name.
    pub(super) fn parse_parameter_list(&mut self) -> PResult {
        self.build(NodeKind::ParameterList, |p, node| {
            let open = p.expect(TokenKind::LeftParen)?;
            p.cst.update_source_pos(node, &open);

            if p.check(TokenKind::Void) && p.peek_nth(1).kind == TokenKind::RightParen {
                p.advance();
            }
            if let Some(close) = p.eat(TokenKind::RightParen) {
                p.cst.update_source_pos(node, &close);
                return Ok(());
            }

            loop {
                let ty = p.parse_type();
                p.child(node, ty)?;
                let modifier = p.parse_type_mod();
                p.child(node, modifier)?;
                if p.check(TokenKind::Identifier) {
                    p.leaf(node, NodeKind::Identifier);
                }

                if p.eat(TokenKind::Comma).is_some() {
                    continue;
                }
                let close = p.expect(TokenKind::RightParen)?;
                p.cst.update_source_pos(node, &close);
                return Ok(());
            }
        })
    }

    // =========================================
    // Lookahead
    // =========================================

    /// Consume `const? base ([] | @)*` if present.
    fn scan_type(&mut self) -> bool {
        self.eat(TokenKind::Const);
        if !Self::is_type_base(self.peek().kind) {
            return false;
        }
        self.advance();
        loop {
            match self.peek().kind {
                TokenKind::LeftBracket => {
                    self.advance();
                    if self.eat(TokenKind::RightBracket).is_none() {
                        return false;
                    }
                }
                TokenKind::At => {
                    self.advance();
                }
                _ => return true,
            }
        }
    }

    /// A type followed by a name starts a variable declaration.
    pub(super) fn is_var_decl(&mut self) -> bool {
        let checkpoint = self.checkpoint();
        let result = self.scan_type() && self.check(TokenKind::Identifier);
        self.rewind(checkpoint);
        result
    }

    /// A type, a name and a parenthesized list followed by `{` start a
    /// function definition.
    pub(super) fn is_function_decl(&mut self) -> bool {
        let checkpoint = self.checkpoint();
        let result = self.scan_function_head() && self.check(TokenKind::LeftBrace);
        self.rewind(checkpoint);
        result
    }

    fn scan_function_head(&mut self) -> bool {
        if !self.scan_type() {
            return false;
        }
        if self.eat(TokenKind::Amp).is_some() {
            self.eat(TokenKind::In);
            self.eat(TokenKind::Out);
            self.eat(TokenKind::InOut);
        }
        if self.eat(TokenKind::Identifier).is_none() || !self.check(TokenKind::LeftParen) {
            return false;
        }
        let mut depth = 0usize;
        loop {
            match self.advance().kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                TokenKind::Eof | TokenKind::Semicolon | TokenKind::LeftBrace | TokenKind::RightBrace => {
                    return false;
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::dump;
    use super::super::parse;

    #[test]
    fn data_type_children_in_source_order() {
        let source = "const int[]@ x;";
        assert_eq!(
            dump(source),
            "Script\n\
             \x20 GlobalVar\n\
             \x20   DataType\n\
             \x20     Undefined 'const'\n\
             \x20     Undefined 'int'\n\
             \x20     Undefined '[]'\n\
             \x20     Undefined '@'\n\
             \x20   Identifier 'x'\n"
        );
    }

    #[test]
    fn parameters_with_modifiers_and_optional_names() {
        let source = "void f(int &in a, float &out, bits &, Obj@ o) {}";
        let output = parse(source);
        assert!(output.errors.is_empty(), "{}", output.errors);
        let text = output.cst.dump(output.root().unwrap(), source);
        assert!(text.contains("Undefined 'in'"));
        assert!(text.contains("Undefined 'out'"));
        assert!(text.contains("Identifier 'o'"));
        assert_eq!(text.matches("TypeMod").count(), 5);
    }

    #[test]
    fn void_parameter_list_is_empty() {
        let text = dump("int f(void) { return 0; }");
        assert!(text.contains("ParameterList\n    StatementBlock"));
    }

    #[test]
    fn unclosed_array_modifier_is_an_error() {
        let output = parse("int[ x;");
        assert!(output.has_errors());
    }
}
