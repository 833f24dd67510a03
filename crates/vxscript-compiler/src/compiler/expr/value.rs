//! Variables, literals and parenthesized expressions.

use vxscript_core::{DataType, PrimitiveKind};
use vxscript_parser::{NodeId, NodeKind, TokenKind};

use super::super::variables::DUMMY_OFFSET;
use super::super::{CResult, Compiler, ExprContext, TypeInfo};
use crate::builder::symbols::GlobalRef;
use crate::bytecode::OpCode;
use crate::module::HOST_GLOBAL_FLAG;

impl Compiler<'_, '_> {
    pub(crate) fn compile_expression_value(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let Some(vnode) = self.cst.first_child(node) else {
            return Err(self.error(node, "Expected expression value"));
        };
        match self.kind(vnode) {
            NodeKind::Identifier => self.compile_variable_access(vnode, ctx),
            NodeKind::Constant => self.compile_constant(vnode, ctx),
            NodeKind::FunctionCall => {
                if self.is_global_expression {
                    return Err(self.error(vnode, "Function call in global expression"));
                }
                self.compile_function_call(vnode, ctx, None, false)
            }
            NodeKind::Assignment => {
                let mut e = ExprContext::new();
                self.compile_assignment(vnode, &mut e)?;
                ctx.merge(&mut e);
                ctx.ty = e.ty;
                Ok(())
            }
            _ => Err(self.error(vnode, "Expected expression value")),
        }
    }

    /// Locals shadow globals; script globals shadow host properties.
    fn compile_variable_access(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let name = self.text(node);

        if let Some(var) = self.scopes.lookup(name).cloned() {
            let dt = var.data_type;
            if let Some(value) = var.constant {
                ctx.ty.set_constant(dt, value);
            } else if dt.is_primitive() {
                if dt.is_reference {
                    // Reference parameters hold the address.
                    ctx.bc.instr_w(OpCode::CpyVtoR4, var.offset);
                    ctx.ty.set(dt);
                } else {
                    ctx.ty.set_variable(dt, var.offset, false);
                }
            } else {
                ctx.bc.instr_w(OpCode::PSF, var.offset);
                ctx.ty.set_variable(dt, var.offset, false);
                ctx.ty.data_type.is_reference = true;
                if dt.is_reference && dt.is_object_handle() {
                    ctx.bc.instr(OpCode::RDS4);
                }
            }
            return Ok(());
        }

        match self.symbols.lookup_global(name) {
            Some(GlobalRef::Script(index)) => {
                let Some(global) = self.symbols.globals.get(index).cloned() else {
                    return Err(self.error(node, format!("'{name}' is not declared")));
                };
                if !global.is_compiled {
                    return Err(self.error(node, format!("Use of uninitialized global variable '{name}'")));
                }
                match global.constant {
                    Some(value) => ctx.ty.set_constant(global.data_type, value),
                    None => self.global_address(ctx, global.data_type, global.index),
                }
                Ok(())
            }
            Some(GlobalRef::Host(prop)) => {
                self.symbols.use_group(prop.group);
                match prop.constant {
                    Some(value) => ctx.ty.set_constant(prop.data_type, value),
                    None => self.global_address(ctx, prop.data_type, prop.index | HOST_GLOBAL_FLAG),
                }
                Ok(())
            }
            None => {
                let reported = self.error(node, format!("'{name}' is not declared"));
                // Later uses of the name don't repeat the error.
                if self.scopes.declare(name, DataType::int(), DUMMY_OFFSET).is_ok()
                    && let Some(v) = self.scopes.lookup_mut(name)
                {
                    v.is_initialized = true;
                }
                Err(reported)
            }
        }
    }

    /// Primitives load their address into the register, objects push it.
    fn global_address(&mut self, ctx: &mut ExprContext, dt: DataType, operand: u32) {
        if dt.is_primitive() {
            ctx.bc.instr_dword(OpCode::LDG, operand);
        } else {
            ctx.bc.instr_dword(OpCode::PGA, operand);
        }
        ctx.ty.set(dt.with_reference(true));
    }

    fn compile_constant(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let Some(token) = self.token(node) else {
            return Err(self.error(node, "Expected constant"));
        };
        let text = self.text(node);

        match token {
            TokenKind::IntLiteral if text.starts_with('\'') => {
                let value = unescape(text.get(1..text.len().saturating_sub(1)).unwrap_or_default());
                let Some(&code) = value.as_bytes().first() else {
                    return Err(self.error(node, "Empty character literal"));
                };
                ctx.ty.set_constant(DataType::uint().with_read_only(true), u64::from(code));
            }
            TokenKind::IntLiteral => {
                let value = text
                    .bytes()
                    .filter(u8::is_ascii_digit)
                    .fold(0u32, |acc, d| acc.wrapping_mul(10).wrapping_add(u32::from(d - b'0')));
                ctx.ty.set_constant(DataType::uint().with_read_only(true), u64::from(value));
            }
            TokenKind::BitsLiteral => {
                let value = text
                    .get(2..)
                    .unwrap_or_default()
                    .chars()
                    .filter_map(|c| c.to_digit(16))
                    .fold(0u32, |acc, d| acc.wrapping_shl(4) | d);
                let dt = DataType::primitive(PrimitiveKind::Bits32).with_read_only(true);
                ctx.ty.set_constant(dt, u64::from(value));
            }
            TokenKind::FloatLiteral => {
                let digits = text.trim_end_matches(['f', 'F']);
                let Ok(value) = digits.parse::<f32>() else {
                    return Err(self.error(node, format!("Invalid constant '{text}'")));
                };
                ctx.ty.set_constant(DataType::primitive(PrimitiveKind::Float).with_read_only(true), 0);
                ctx.ty.set_float(value);
            }
            TokenKind::DoubleLiteral => {
                let Ok(value) = text.parse::<f64>() else {
                    return Err(self.error(node, format!("Invalid constant '{text}'")));
                };
                ctx.ty.set_constant(DataType::primitive(PrimitiveKind::Double).with_read_only(true), 0);
                ctx.ty.set_double(value);
            }
            TokenKind::True | TokenKind::False => {
                let value = u64::from(token == TokenKind::True);
                ctx.ty.set_constant(DataType::bool().with_read_only(true), value);
            }
            TokenKind::Null => ctx.ty = TypeInfo::null_constant(),
            TokenKind::StringLiteral | TokenKind::HeredocLiteral => self.compile_string_constant(node, ctx)?,
            _ => return Err(self.error(node, "Expected constant")),
        }
        Ok(())
    }

    /// Adjacent literals are joined into one string constant which the
    /// host's string factory turns into an object.
    fn compile_string_constant(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let mut value = String::new();
        let parts: Vec<NodeId> = self.cst.children(node).collect();
        for part in parts {
            let text = self.text(part);
            match self.token(part) {
                Some(TokenKind::HeredocLiteral) => {
                    let inner = text.get(3..text.len().saturating_sub(3)).unwrap_or_default();
                    value.push_str(&trim_heredoc(inner));
                }
                _ => {
                    let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or_default();
                    value.push_str(&unescape(inner));
                }
            }
        }

        let Some(factory) = self.symbols.registry().string_factory() else {
            return Err(self.error(node, "Strings are not recognized by the application"));
        };
        let id = self.symbols.intern_string(&value);
        let mut desc = self.describe(node, factory, None)?;
        // STR pushes the constant's address and length.
        desc.params = vec![DataType::uint(), DataType::uint()];
        desc.param_modes = vec![Default::default(); 2];

        ctx.bc.instr_w(OpCode::STR, id as i16);
        self.perform_function_call(&desc, ctx, false, None, None)
    }
}

/// Resolve the escape sequences of a quoted literal body.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('x' | 'X') => {
                let mut value = 0u32;
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from(value as u8));
            }
            // Reported by the lexer.
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Drop a first and last line holding only whitespace.
fn trim_heredoc(raw: &str) -> String {
    let mut s = raw;
    if let Some(pos) = s.find('\n')
        && s[..pos].trim().is_empty()
    {
        s = &s[pos + 1..];
    }
    if let Some(pos) = s.rfind('\n')
        && s[pos + 1..].trim().is_empty()
    {
        s = &s[..pos];
    }
    s.to_string()
}
