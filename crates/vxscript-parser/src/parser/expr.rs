//! Expressions.
//!
//! Binary expressions are kept flat: an `Expression` node holds its terms
//! and operators in source order and the compiler orders them by
//! precedence.

use vxscript_core::ParseError;

use super::{PResult, Parser};
use crate::cst::NodeKind;
use crate::lexer::TokenKind;

impl Parser<'_, '_> {
    /// `condition (assign-op assignment)?`, right associative.
    pub(super) fn parse_assignment(&mut self) -> PResult {
        self.build(NodeKind::Assignment, |p, node| {
            let condition = p.parse_condition();
            p.child(node, condition)?;
            if p.peek().kind.assign_operator().is_some() {
                p.leaf(node, NodeKind::ExprOperator);
                let rhs = p.parse_assignment();
                p.child(node, rhs)?;
            }
            Ok(())
        })
    }

    /// `expression (? assignment : assignment)?`
    fn parse_condition(&mut self) -> PResult {
        self.build(NodeKind::Condition, |p, node| {
            let expr = p.parse_expression();
            p.child(node, expr)?;
            if p.eat(TokenKind::Question).is_some() {
                let when_true = p.parse_assignment();
                p.child(node, when_true)?;
                p.expect(TokenKind::Colon)?;
                let when_false = p.parse_assignment();
                p.child(node, when_false)?;
            }
            Ok(())
        })
    }

    /// `term (binary-op term)*`
    pub(super) fn parse_expression(&mut self) -> PResult {
        self.build(NodeKind::Expression, |p, node| {
            let term = p.parse_expr_term();
            p.child(node, term)?;
            while p.peek().kind.binary_operator().is_some() {
                p.leaf(node, NodeKind::ExprOperator);
                let term = p.parse_expr_term();
                p.child(node, term)?;
            }
            Ok(())
        })
    }

    /// `pre-op* value post-op*`
    fn parse_expr_term(&mut self) -> PResult {
        self.build(NodeKind::ExprTerm, |p, node| {
            while p.peek().kind.prefix_operator().is_some() {
                p.leaf(node, NodeKind::ExprPreOp);
            }
            let value = p.parse_expr_value();
            p.child(node, value)?;
            while p.peek().kind.is_postfix_operator() {
                let op = p.parse_expr_post_op();
                p.child(node, op)?;
            }
            Ok(())
        })
    }

    fn parse_expr_post_op(&mut self) -> PResult {
        self.build(NodeKind::ExprPostOp, |p, node| {
            let op = p.advance();
            p.cst.set_token(node, &op);
            match op.kind {
                TokenKind::Dot => {
                    let name = p.peek();
                    if name.kind != TokenKind::Identifier {
                        return Err(ParseError::expected_identifier(name.span, name.lexeme));
                    }
                    if p.peek_nth(1).kind == TokenKind::LeftParen {
                        let call = p.parse_function_call();
                        p.child(node, call)
                    } else {
                        p.leaf(node, NodeKind::Identifier);
                        Ok(())
                    }
                }
                TokenKind::LeftBracket => {
                    let index = p.parse_assignment();
                    p.child(node, index)?;
                    let close = p.expect(TokenKind::RightBracket)?;
                    p.cst.update_source_pos(node, &close);
                    Ok(())
                }
                _ => Ok(()),
            }
        })
    }

    fn parse_expr_value(&mut self) -> PResult {
        self.build(NodeKind::ExprValue, |p, node| {
            let token = p.peek();
            let next = p.peek_nth(1).kind;
            match token.kind {
                kind if kind.is_constant() => {
                    let constant = p.parse_constant();
                    p.child(node, constant)
                }
                TokenKind::LeftParen => {
                    p.advance();
                    let inner = p.parse_assignment();
                    p.child(node, inner)?;
                    p.expect(TokenKind::RightParen)?;
                    Ok(())
                }
                TokenKind::Identifier if next == TokenKind::LeftParen => {
                    let call = p.parse_function_call();
                    p.child(node, call)
                }
                TokenKind::Identifier => {
                    p.leaf(node, NodeKind::Identifier);
                    Ok(())
                }
                kind if kind.primitive_kind().is_some() && next == TokenKind::LeftParen => {
                    let call = p.parse_function_call();
                    p.child(node, call)
                }
                TokenKind::Eof => Err(ParseError::unexpected_eof(token.span)),
                _ => Err(ParseError::expected_expression(token.span, token.lexeme)),
            }
        })
    }

    /// A literal. Adjacent string literals form a single constant with one
    /// child per literal.
    pub(super) fn parse_constant(&mut self) -> PResult {
        self.build(NodeKind::Constant, |p, node| {
            let token = p.peek();
            if !token.kind.is_constant() {
                return Err(ParseError::new(
                    vxscript_core::ParseErrorKind::ExpectedConstant,
                    token.span,
                    format!("Expected constant, found '{}'", token.lexeme),
                ));
            }
            if !token.kind.is_string() {
                p.advance();
                p.cst.set_token(node, &token);
                return Ok(());
            }
            p.cst.set_token(node, &token);
            while p.peek().kind.is_string() {
                p.leaf(node, NodeKind::Constant);
            }
            Ok(())
        })
    }

    /// `name(args)`, `Type(args)` or `prim(expr)`.
    pub(super) fn parse_function_call(&mut self) -> PResult {
        self.build(NodeKind::FunctionCall, |p, node| {
            let callee = p.parse_type();
            p.child(node, callee)?;
            let args = p.parse_arg_list();
            p.child(node, args)
        })
    }

    /// `( (assignment (, assignment)*)? )`
    pub(super) fn parse_arg_list(&mut self) -> PResult {
        self.build(NodeKind::ArgList, |p, node| {
            let open = p.expect(TokenKind::LeftParen)?;
            p.cst.update_source_pos(node, &open);
            if let Some(close) = p.eat(TokenKind::RightParen) {
                p.cst.update_source_pos(node, &close);
                return Ok(());
            }
            loop {
                let arg = p.parse_assignment();
                p.child(node, arg)?;
                if p.eat(TokenKind::Comma).is_some() {
                    continue;
                }
                let close = p.expect(TokenKind::RightParen)?;
                p.cst.update_source_pos(node, &close);
                return Ok(());
            }
        })
    }

    /// `{ (assignment | init-list)? (, (assignment | init-list)?)* }`.
    /// A missing element is recorded as an `Undefined` node.
    pub(super) fn parse_init_list(&mut self) -> PResult {
        self.build(NodeKind::InitList, |p, node| {
            let open = p.expect(TokenKind::LeftBrace)?;
            p.cst.update_source_pos(node, &open);

            loop {
                let token = p.peek();
                match token.kind {
                    TokenKind::Comma => {
                        p.leaf(node, NodeKind::Undefined);
                        if p.check(TokenKind::RightBrace) {
                            let close = p.peek();
                            let empty = p.cst.alloc_token(NodeKind::Undefined, &close);
                            p.cst.add_child_last(node, empty);
                            p.advance();
                            return Ok(());
                        }
                        continue;
                    }
                    TokenKind::RightBrace => {
                        p.advance();
                        p.cst.update_source_pos(node, &token);
                        return Ok(());
                    }
                    TokenKind::LeftBrace => {
                        let nested = p.parse_init_list();
                        p.child(node, nested)?;
                    }
                    _ => {
                        let value = p.parse_assignment();
                        p.child(node, value)?;
                    }
                }

                let next = p.peek();
                match next.kind {
                    TokenKind::Comma => {
                        p.advance();
                    }
                    TokenKind::RightBrace => {
                        p.advance();
                        p.cst.update_source_pos(node, &next);
                        return Ok(());
                    }
                    TokenKind::Eof => return Err(ParseError::unexpected_eof(next.span)),
                    _ => return Err(ParseError::expected_token(next.span, "}", next.lexeme)),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::super::tests::parse_ok;
    use crate::cst::{NodeId, NodeKind};

    /// Dump of the first statement's assignment in `void f() { <stmt> }`.
    fn dump_stmt(stmt: &str) -> String {
        let source = format!("void f() {{ {stmt} }}");
        let output = parse_ok(&source);
        let root = output.root().unwrap();
        let func = output.cst.first_child(root).unwrap();
        let block = output.cst.last_child(func).unwrap();
        let first: NodeId = output.cst.first_child(block).unwrap();
        let assignment = output.cst.first_child(first).unwrap();
        output.cst.dump(assignment, &source)
    }

    #[test]
    fn binary_expression_is_flat() {
        let text = dump_stmt("a + b * c;");
        assert_eq!(
            text,
            "Assignment\n\
             \x20 Condition\n\
             \x20   Expression\n\
             \x20     ExprTerm\n\
             \x20       ExprValue\n\
             \x20         Identifier 'a'\n\
             \x20     ExprOperator '+'\n\
             \x20     ExprTerm\n\
             \x20       ExprValue\n\
             \x20         Identifier 'b'\n\
             \x20     ExprOperator '*'\n\
             \x20     ExprTerm\n\
             \x20       ExprValue\n\
             \x20         Identifier 'c'\n"
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        let text = dump_stmt("a = b += 1;");
        assert_eq!(text.matches("Assignment").count(), 3);
        assert!(text.contains("ExprOperator '='"));
        assert!(text.contains("ExprOperator '+='"));
    }

    #[test]
    fn ternary_condition() {
        let text = dump_stmt("x = a ? 1 : 2;");
        assert!(text.contains("Condition\n      Expression"));
        assert_eq!(text.matches("Constant").count(), 2);
    }

    #[test]
    fn prefix_and_postfix_operators() {
        let text = dump_stmt("-!x++;");
        assert!(text.contains("ExprPreOp '-'"));
        assert!(text.contains("ExprPreOp '!'"));
        assert!(text.contains("ExprPostOp '++'"));
    }

    #[test]
    fn member_access_index_and_method_call() {
        let text = dump_stmt("p.items[2].size();");
        let posts = text.matches("ExprPostOp").count();
        assert_eq!(posts, 3);
        assert!(text.contains("Identifier 'items'"));
        assert!(text.contains("FunctionCall"));
    }

    #[test]
    fn conversion_and_constructor_calls() {
        let text = dump_stmt("x = int(2.5f) + Vec(1, 2);");
        assert_eq!(text.matches("FunctionCall").count(), 2);
        assert!(text.contains("Undefined 'int'"));
        assert!(text.contains("Undefined 'Vec'"));
    }

    #[test]
    fn adjacent_strings_form_one_constant() {
        let text = dump_stmt(r#"s = "ab" "cd";"#);
        assert!(text.contains("Constant\n"));
        assert!(text.contains(r#"Constant '"ab"'"#));
        assert!(text.contains(r#"Constant '"cd"'"#));
    }

    #[test]
    fn init_list_empty_slots() {
        let source = "int[] a = {1,,{2},}; int[] b = {,};";
        let output = parse_ok(source);
        let root = output.root().unwrap();
        let globals: Vec<_> = output.cst.children(root).collect();
        let first = output.cst.last_child(globals[0]).unwrap();
        let kinds: Vec<_> = output.cst.children(first).map(|id| output.cst.kind(id)).collect();
        assert_eq!(kinds, vec![NodeKind::Assignment, NodeKind::Undefined, NodeKind::InitList]);

        let second = output.cst.last_child(globals[1]).unwrap();
        let kinds: Vec<_> = output.cst.children(second).map(|id| output.cst.kind(id)).collect();
        assert_eq!(kinds, vec![NodeKind::Undefined, NodeKind::Undefined]);
    }

    #[test]
    fn missing_operand_is_an_error() {
        let output = parse("void f() { x = 1 + ; }");
        assert_eq!(output.errors.len(), 1);
        let error = output.errors.iter().next().unwrap();
        assert!(error.message.starts_with("Expected expression value"));
    }

    #[test]
    fn unbalanced_parenthesis() {
        let output = parse("void f() { x = (1 + 2; }");
        assert_eq!(output.errors.len(), 1);
    }
}
