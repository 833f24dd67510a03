//! Top-level declarations.

use vxscript_core::ParseError;

use super::{PResult, Parser};
use crate::cst::{NodeId, NodeKind};
use crate::lexer::TokenKind;

impl Parser<'_, '_> {
    pub(super) fn parse_script(&mut self) -> NodeId {
        let root = self.cst.alloc(NodeKind::Script);
        loop {
            let token = self.peek();
            let result = match token.kind {
                TokenKind::Eof => break,
                TokenKind::Semicolon => {
                    self.advance();
                    continue;
                }
                TokenKind::Import => self.parse_import(),
                TokenKind::Struct => self.parse_struct(),
                _ if self.is_function_decl() => self.parse_function(),
                _ if self.is_var_decl() => self.parse_declaration(NodeKind::GlobalVar),
                _ => Err(self.unexpected(&token)),
            };
            match result {
                Ok(node) => self.cst.add_child_last(root, node),
                Err(err) => {
                    self.report(err);
                    self.synchronize(false);
                }
            }
        }
        root
    }

    /// `import type &? name(params) from "module";`
    fn parse_import(&mut self) -> PResult {
        self.build(NodeKind::Import, |p, node| {
            let keyword = p.expect(TokenKind::Import)?;
            p.cst.update_source_pos(node, &keyword);

            let signature = p.parse_function_signature();
            p.child(node, signature)?;

            let from = p.peek();
            if from.kind != TokenKind::Identifier || from.lexeme != "from" {
                return Err(ParseError::expected_token(from.span, "from", from.lexeme));
            }
            p.advance();

            let module = p.peek();
            if !module.kind.is_string() {
                return Err(ParseError::expected_token(module.span, "string constant", module.lexeme));
            }
            let constant = p.parse_constant();
            p.child(node, constant)?;

            let end = p.expect(TokenKind::Semicolon)?;
            p.cst.update_source_pos(node, &end);
            Ok(())
        })
    }

    /// `struct Name { (type name (, name)* ;)* } ;?`
    fn parse_struct(&mut self) -> PResult {
        self.build(NodeKind::Struct, |p, node| {
            let keyword = p.expect(TokenKind::Struct)?;
            p.cst.update_source_pos(node, &keyword);
            p.expect_identifier(node)?;
            p.expect(TokenKind::LeftBrace)?;

            while !p.check(TokenKind::RightBrace) {
                if p.check(TokenKind::Eof) {
                    return Err(ParseError::unexpected_eof(p.peek().span));
                }
                let ty = p.parse_type();
                p.child(node, ty)?;
                loop {
                    p.expect_identifier(node)?;
                    if p.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
                p.expect(TokenKind::Semicolon)?;
            }
            let close = p.advance();
            p.cst.update_source_pos(node, &close);
            p.eat(TokenKind::Semicolon);
            Ok(())
        })
    }

    /// `DataType TypeMod Identifier ParameterList` without a body.
    fn parse_function_signature(&mut self) -> PResult {
        self.build(NodeKind::Function, |p, node| p.parse_function_head(node))
    }

    fn parse_function_head(&mut self, node: NodeId) -> Result<(), ParseError> {
        let ty = self.parse_type();
        self.child(node, ty)?;
        let modifier = self.parse_type_mod();
        self.child(node, modifier)?;
        self.expect_identifier(node)?;
        let params = self.parse_parameter_list();
        self.child(node, params)
    }

    pub(super) fn parse_function(&mut self) -> PResult {
        self.build(NodeKind::Function, |p, node| {
            p.parse_function_head(node)?;
            let body = p.parse_statement_block();
            p.child(node, body)
        })
    }

    /// Global or local variable declaration:
    /// `type name (= init | (args))? (, name ...)* ;`
    pub(super) fn parse_declaration(&mut self, kind: NodeKind) -> PResult {
        self.build(kind, |p, node| {
            let ty = p.parse_type();
            p.child(node, ty)?;

            loop {
                p.expect_identifier(node)?;

                if p.eat(TokenKind::Equal).is_some() {
                    let init = if p.check(TokenKind::LeftBrace) {
                        p.parse_init_list()
                    } else {
                        p.parse_assignment()
                    };
                    p.child(node, init)?;
                } else if p.check(TokenKind::LeftParen) {
                    let args = p.parse_arg_list();
                    p.child(node, args)?;
                }

                if p.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }

            let end = p.expect(TokenKind::Semicolon)?;
            p.cst.update_source_pos(node, &end);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use super::super::tests::{dump, parse_ok};
    use crate::cst::NodeKind;

    #[test]
    fn function_layout() {
        let output = parse_ok("int add(int a, int b) { return a + b; }");
        let root = output.root().unwrap();
        let func = output.cst.first_child(root).unwrap();
        assert_eq!(output.cst.kind(func), NodeKind::Function);
        let kinds: Vec<_> = output.cst.children(func).map(|id| output.cst.kind(id)).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::DataType,
                NodeKind::TypeMod,
                NodeKind::Identifier,
                NodeKind::ParameterList,
                NodeKind::StatementBlock,
            ]
        );
    }

    #[test]
    fn import_layout() {
        let source = r#"import int helper(float) from "tools";"#;
        assert_eq!(
            dump(source),
            "Script\n\
             \x20 Import\n\
             \x20   Function\n\
             \x20     DataType\n\
             \x20       Undefined 'int'\n\
             \x20     TypeMod\n\
             \x20     Identifier 'helper'\n\
             \x20     ParameterList\n\
             \x20       DataType\n\
             \x20         Undefined 'float'\n\
             \x20       TypeMod\n\
             \x20   Constant\n\
             \x20     Constant '\"tools\"'\n"
        );
    }

    #[test]
    fn import_without_from_is_an_error() {
        let output = parse(r#"import void f() "m";"#);
        assert!(output.has_errors());
        assert!(output.errors.iter().any(|e| e.message.contains("'from'")));
    }

    #[test]
    fn struct_members() {
        let source = "struct Point { float x, y; int tag; };";
        let output = parse_ok(source);
        let root = output.root().unwrap();
        let decl = output.cst.first_child(root).unwrap();
        let kinds: Vec<_> = output.cst.children(decl).map(|id| output.cst.kind(id)).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Identifier,
                NodeKind::DataType,
                NodeKind::Identifier,
                NodeKind::Identifier,
                NodeKind::DataType,
                NodeKind::Identifier,
            ]
        );
    }

    #[test]
    fn global_declarations_with_initializers() {
        let source = "int a = 1, b, c(2); int[] list = {1, 2};";
        let output = parse_ok(source);
        let root = output.root().unwrap();
        let globals: Vec<_> = output.cst.children(root).collect();
        assert_eq!(globals.len(), 2);
        let first: Vec<_> = output.cst.children(globals[0]).map(|id| output.cst.kind(id)).collect();
        assert_eq!(
            first,
            vec![
                NodeKind::DataType,
                NodeKind::Identifier,
                NodeKind::Assignment,
                NodeKind::Identifier,
                NodeKind::Identifier,
                NodeKind::ArgList,
            ]
        );
        let last = output.cst.last_child(globals[1]).unwrap();
        assert_eq!(output.cst.kind(last), NodeKind::InitList);
    }

    #[test]
    fn reference_return_type() {
        let output = parse_ok("int &get() { return g; } int g;");
        let root = output.root().unwrap();
        let func = output.cst.first_child(root).unwrap();
        let modifier = output.cst.children(func).nth(1).unwrap();
        assert_eq!(output.cst.child_count(modifier), 1);
    }

    #[test]
    fn unexpected_top_level_token() {
        let output = parse("return 1; int x;");
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors.iter().next().unwrap().message.contains("return"));
        assert_eq!(output.cst.child_count(output.root().unwrap()), 1);
    }
}
