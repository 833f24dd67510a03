//! Prefix and postfix operators, member access and indexing.

use vxscript_core::{DataType, Operator, PrimitiveKind, RefModifier, VALUE_OF_BOOLEAN_TRUE};
use vxscript_parser::{NodeId, NodeKind, TokenKind};

use super::super::{CResult, Compiler, DeferredParam, ExprContext, TypeInfo};
use crate::bytecode::OpCode;

impl Compiler<'_, '_> {
    // ==========================================================================
    // Prefix operators
    // ==========================================================================

    pub(crate) fn compile_expression_pre_op(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let Some(op) = self.token(node).and_then(TokenKind::prefix_operator) else {
            return Err(self.error(node, "Expected prefix operator"));
        };
        match op {
            Operator::Handle => self.compile_handle_of(node, ctx),
            Operator::Negate | Operator::Plus => self.compile_sign(node, op, ctx),
            Operator::Not => self.compile_not(node, ctx),
            Operator::BitNot => self.compile_bit_not(node, ctx),
            Operator::Increment | Operator::Decrement => {
                self.prepare_increment(node, ctx)?;
                self.emit_increment(node, op == Operator::Increment, ctx)
            }
            _ => Err(self.error(node, "Illegal operation")),
        }
    }

    /// `@expr` marks the value as an explicit handle.
    fn compile_handle_of(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let dt = ctx.ty.data_type;
        if ctx.ty.is_explicit_handle
            || !dt.is_object()
            || dt.is_null()
            || !self.behaviours(&dt).supports_handles()
        {
            return Err(self.error(node, "Object handle is not supported for this type"));
        }
        if !dt.is_reference && ctx.ty.is_variable {
            return Err(self.error(node, "Not a valid reference"));
        }

        // Taking the handle of an object yields a handle to const.
        let make_const = !dt.is_object_handle();
        ctx.ty.data_type.is_handle = true;
        ctx.ty.is_explicit_handle = true;
        if make_const {
            ctx.ty.data_type.is_read_only = true;
        }
        Ok(())
    }

    fn compile_sign(&mut self, node: NodeId, op: Operator, ctx: &mut ExprContext) -> CResult {
        let dt = ctx.ty.data_type;
        if dt.is_object() {
            if op == Operator::Plus {
                return Err(self.error(node, "Illegal operation"));
            }
            return self.compile_object_negate(node, ctx);
        }

        // Unsigned values are negated as the signed type of the same size.
        if dt.is_unsigned_type() {
            let kind = PrimitiveKind::Int32.with_size(dt.size_in_memory_bytes()).unwrap_or(PrimitiveKind::Int32);
            let to = dt.with_kind(kind).with_reference(false);
            self.implicit_conversion(ctx, to, node, false, true, &[])?;
        }
        let dt = ctx.ty.data_type;
        if !(dt.is_integer_type() || dt.is_float_type() || dt.is_double_type()) {
            return Err(self.error(node, "Illegal operation"));
        }
        if op == Operator::Plus {
            return Ok(());
        }

        if ctx.ty.is_constant {
            if dt.is_integer_type() {
                let v = ctx.ty.int_value().wrapping_neg();
                ctx.ty.set_int(v);
            } else if dt.is_float_type() {
                let v = -ctx.ty.float_value();
                ctx.ty.set_float(v);
            } else {
                let v = -ctx.ty.double_value();
                ctx.ty.set_double(v);
            }
            return Ok(());
        }

        self.is_variable_initialized(&ctx.ty, node);
        self.convert_to_temp_variable(ctx, node)?;
        let neg = if dt.is_integer_type() {
            OpCode::NEGi
        } else if dt.is_float_type() {
            OpCode::NEGf
        } else {
            OpCode::NEGd
        };
        ctx.bc.instr_w(neg, ctx.ty.stack_offset);
        Ok(())
    }

    /// Call the object's parameterless negate operator.
    fn compile_object_negate(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let owner = ctx.ty.data_type.object_hash();
        let funcs: Vec<_> = self.behaviours(&ctx.ty.data_type).operators_for(Operator::Negate).collect();
        let mut found = None;
        for id in funcs {
            if self.symbols.describe(id, owner).is_some_and(|d| d.params.is_empty()) {
                found = Some(id);
                break;
            }
        }
        let Some(func) = found else {
            return Err(self.error(node, "Object doesn't support the negate operator"));
        };
        let desc = self.describe(node, func, owner)?;
        let obj = ctx.ty;
        self.dereference(ctx, true);
        self.perform_function_call(&desc, ctx, false, None, owner)?;
        self.release_object(ctx, obj, node);
        Ok(())
    }

    fn compile_not(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        if !ctx.ty.data_type.equal_except_ref_and_const(&DataType::bool()) {
            return Err(self.error(node, "Illegal operation"));
        }
        if ctx.ty.is_constant {
            let v = if ctx.ty.dword_value() == 0 { VALUE_OF_BOOLEAN_TRUE } else { 0 };
            ctx.ty.set_dword(v);
            return Ok(());
        }
        self.is_variable_initialized(&ctx.ty, node);
        self.convert_to_temp_variable(ctx, node)?;
        ctx.bc.instr_w(OpCode::NOT, ctx.ty.stack_offset);
        Ok(())
    }

    fn compile_bit_not(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let dt = ctx.ty.data_type;
        if !(dt.is_integer_type() || dt.is_unsigned_type() || dt.is_bit_vector_type()) {
            return Err(self.error(node, "Illegal operation"));
        }
        let size = dt.size_in_memory_bytes();
        if !dt.is_bit_vector_type() {
            let kind = PrimitiveKind::Bits32.with_size(size).unwrap_or(PrimitiveKind::Bits32);
            let to = dt.with_kind(kind).with_reference(false);
            self.implicit_conversion(ctx, to, node, false, true, &[])?;
        }

        if ctx.ty.is_constant {
            let mask = match size {
                1 => 0xFF,
                2 => 0xFFFF,
                _ => u32::MAX,
            };
            let v = !ctx.ty.dword_value() & mask;
            ctx.ty.set_dword(v);
            return Ok(());
        }
        self.is_variable_initialized(&ctx.ty, node);
        self.convert_to_temp_variable(ctx, node)?;
        ctx.bc.instr_w(OpCode::BNOT, ctx.ty.stack_offset);
        Ok(())
    }

    /// Checks shared by prefix and postfix `++`/`--`. Leaves the address of
    /// the value in the register.
    fn prepare_increment(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        if self.is_global_expression {
            return Err(self.error(node, "Increment operator in global expression"));
        }
        if ctx.ty.is_temporary {
            return Err(self.error(node, "Reference is temporary"));
        }
        if ctx.ty.data_type.is_read_only || ctx.ty.is_constant {
            return Err(self.error(node, "Reference is read-only"));
        }
        self.is_variable_initialized(&ctx.ty, node);
        if ctx.ty.is_variable && ctx.ty.data_type.is_primitive() && !ctx.ty.data_type.is_reference {
            self.convert_to_reference(ctx);
        } else if !ctx.ty.data_type.is_reference {
            return Err(self.error(node, "Not a valid reference"));
        }
        Ok(())
    }

    /// Increment or decrement the value whose address is in the register.
    fn emit_increment(&mut self, node: NodeId, increment: bool, ctx: &mut ExprContext) -> CResult {
        let dt = ctx.ty.data_type;
        let op = match (dt.primitive_kind(), increment) {
            (Some(PrimitiveKind::Int32 | PrimitiveKind::UInt32), true) => OpCode::INCi,
            (Some(PrimitiveKind::Int32 | PrimitiveKind::UInt32), false) => OpCode::DECi,
            (Some(PrimitiveKind::Int16 | PrimitiveKind::UInt16), true) => OpCode::INCi16,
            (Some(PrimitiveKind::Int16 | PrimitiveKind::UInt16), false) => OpCode::DECi16,
            (Some(PrimitiveKind::Int8 | PrimitiveKind::UInt8), true) => OpCode::INCi8,
            (Some(PrimitiveKind::Int8 | PrimitiveKind::UInt8), false) => OpCode::DECi8,
            (Some(PrimitiveKind::Float), true) => OpCode::INCf,
            (Some(PrimitiveKind::Float), false) => OpCode::DECf,
            (Some(PrimitiveKind::Double), true) => OpCode::INCd,
            (Some(PrimitiveKind::Double), false) => OpCode::DECd,
            _ => return Err(self.error(node, "Illegal operation")),
        };
        ctx.bc.instr(op);
        Ok(())
    }

    // ==========================================================================
    // Postfix operators
    // ==========================================================================

    pub(crate) fn compile_expression_post_op(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        match self.token(node) {
            Some(TokenKind::PlusPlus) => self.compile_post_increment(node, true, ctx),
            Some(TokenKind::MinusMinus) => self.compile_post_increment(node, false, ctx),
            Some(TokenKind::Dot) => {
                let Some(member) = self.cst.first_child(node) else {
                    return Err(self.error(node, "Expected identifier"));
                };
                if self.kind(member) == NodeKind::FunctionCall {
                    self.compile_method_call(node, member, ctx)
                } else {
                    self.compile_property_access(node, member, ctx)
                }
            }
            Some(TokenKind::LeftBracket) => {
                let Some(index) = self.cst.first_child(node) else {
                    return Err(self.error(node, "Expected expression"));
                };
                self.compile_index(node, index, ctx)
            }
            _ => Err(self.error(node, "Expected postfix operator")),
        }
    }

    /// The result is a copy of the old value.
    fn compile_post_increment(&mut self, node: NodeId, increment: bool, ctx: &mut ExprContext) -> CResult {
        self.prepare_increment(node, ctx)?;
        if !ctx.ty.data_type.is_primitive() {
            return Err(self.error(node, "Illegal operation"));
        }
        let target = ctx.ty.data_type;
        // Reading into the temporary keeps the address in the register.
        self.convert_to_temp_variable(ctx, node)?;
        let mut reference = ExprContext::with_type(TypeInfo::new(target));
        self.emit_increment(node, increment, &mut reference)?;
        ctx.merge(&mut reference);
        Ok(())
    }

    fn compile_method_call(&mut self, node: NodeId, call: NodeId, ctx: &mut ExprContext) -> CResult {
        if self.is_global_expression {
            return Err(self.error(node, "Method call in global expression"));
        }
        let dt = ctx.ty.data_type;
        let Some(hash) = dt.object_hash().filter(|_| dt.is_object() && !dt.is_null()) else {
            let name = self.type_name(&dt);
            return Err(self.error(node, format!("Illegal operation on '{name}'")));
        };

        let obj = ctx.ty;
        self.dereference(ctx, true);
        self.compile_function_call(call, ctx, Some(hash), dt.is_read_only)?;
        self.release_object(ctx, obj, node);
        Ok(())
    }

    fn compile_property_access(&mut self, node: NodeId, member: NodeId, ctx: &mut ExprContext) -> CResult {
        let dt = ctx.ty.data_type;
        if !dt.is_object() || dt.is_null() {
            let name = self.type_name(&dt);
            return Err(self.error(node, format!("Illegal operation on '{name}'")));
        }
        let name = self.text(member);
        let prop = self.object_type_of(&dt).and_then(|t| t.property(name)).cloned();
        let Some(prop) = prop else {
            let type_name = self.type_name(&dt.with_reference(false).with_read_only(false).with_handle(false));
            return Err(self.error(member, format!("'{name}' is not a member of '{type_name}'")));
        };

        let obj = ctx.ty;
        self.dereference(ctx, true);
        if ctx.ty.data_type.is_object_handle() && !ctx.ty.is_explicit_handle {
            ctx.bc.instr(OpCode::CHKREF);
        }

        ctx.bc.instr_dword(OpCode::ADDSi, prop.byte_offset);
        // Object members are stored as pointers.
        if prop.data_type.is_reference {
            ctx.bc.instr(OpCode::RDS4);
        }
        let mut member_type = prop.data_type.with_reference(true);
        if member_type.is_primitive() {
            ctx.bc.instr(OpCode::PopRPtr);
        } else if !member_type.is_object_handle() {
            member_type.is_reference = false;
        }
        if dt.is_read_only {
            member_type.is_read_only = true;
        }
        ctx.ty.set(member_type);

        self.release_object(ctx, obj, node);
        Ok(())
    }

    /// `expr[index]` through the object's index operator.
    fn compile_index(&mut self, node: NodeId, index: NodeId, ctx: &mut ExprContext) -> CResult {
        let dt = ctx.ty.data_type;
        let Some(hash) = dt.object_hash().filter(|_| dt.is_object() && !dt.is_null()) else {
            return Err(self.error(node, "Object doesn't support the index operator"));
        };
        let owner = Some(hash);
        let is_const = dt.is_read_only;

        let mut candidates: Vec<_> = self.behaviours(&dt).operators_for(Operator::Index).collect();
        if candidates.is_empty() {
            return Err(self.error(node, "Object doesn't support the index operator"));
        }
        if is_const {
            candidates.retain(|&id| self.symbols.describe(id, owner).is_some_and(|d| d.is_read_only));
        }

        let mut expr = ExprContext::new();
        self.compile_assignment(index, &mut expr)?;
        expr.node = Some(index);

        let mut matches = self.match_argument(&candidates, &expr.ty, 0, owner, index);
        if !is_const {
            self.filter_const(&mut matches, owner);
        }
        let func = match matches.as_slice() {
            [func] => *func,
            [] => {
                let name = self.type_name(&expr.ty.data_type.with_reference(false));
                return Err(self.error(index, format!("No matching operator that takes the type '{name}' found")));
            }
            _ => return Err(self.error(index, "Found more than one matching operator")),
        };
        let desc = self.describe(node, func, owner)?;

        let obj = ctx.ty;
        self.dereference(ctx, true);
        let obj_bc = ctx.take_code();

        let param = desc.params.first().copied().unwrap_or_else(DataType::void);
        let mode = desc.param_modes.first().copied().unwrap_or(RefModifier::None);
        self.prepare_argument(param, mode, &mut expr, index, true, &[])?;
        self.relocate_temporary(&mut expr.ty, &mut expr.bc, &obj_bc);
        ctx.merge(&mut expr);
        ctx.bc.add_code(obj_bc);

        let mut args = [expr];
        self.move_args_to_stack(&desc, &mut ctx.bc, &mut args, true);
        self.perform_function_call(&desc, ctx, false, Some(&mut args), owner)?;
        if is_const {
            ctx.ty.data_type.is_read_only = true;
        }

        self.release_object(ctx, obj, node);
        Ok(())
    }

    /// Free a temporary object once its member or call result is used.
    /// References into it keep it alive until the deferred list runs.
    fn release_object(&mut self, ctx: &mut ExprContext, mut obj: TypeInfo, node: NodeId) {
        if !obj.is_temporary {
            return;
        }
        if ctx.ty.data_type.is_reference || (ctx.ty.data_type.is_object() && !ctx.ty.is_variable) {
            ctx.deferred.push(DeferredParam {
                arg_type: obj,
                mode: RefModifier::In,
                orig: None,
                node: Some(node),
            });
        } else {
            self.release_temporary(&mut obj, &mut ctx.bc);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok, build_with_host};

    #[test]
    fn negating_a_literal_folds() {
        let module = build_ok("int f() { return -5; }");
        let f = module.function("f").unwrap();
        assert_eq!(f.count_op(OpCode::NEGi), 0);
        let set = f.instructions.iter().find(|i| i.op == OpCode::SetV4).unwrap();
        assert_eq!(set.arg as u32 as i32, -5);
    }

    #[test]
    fn negating_a_variable_uses_a_temporary() {
        let module = build_ok("float f(float x) { return -x; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::CpyVtoV4, OpCode::NEGf]);
    }

    #[test]
    fn not_requires_bool() {
        let (_, diags) = build("bool f(int x) { return !x; }");
        assert!(diags.errors().any(|d| d.message == "Illegal operation"));
    }

    #[test]
    fn bit_not_makes_bits() {
        let module = build_ok("bits f() { return ~0xF0; }");
        let set = module
            .function("f")
            .unwrap()
            .instructions
            .iter()
            .find(|i| i.op == OpCode::SetV4)
            .cloned()
            .unwrap();
        assert_eq!(set.arg, u64::from(!0xF0u32));
    }

    #[test]
    fn prefix_increment_of_local() {
        let module = build_ok("void f() { int a = 0; ++a; }");
        module
            .function("f")
            .unwrap()
            .assert_contains_opcodes(&[OpCode::LDV, OpCode::INCi]);
    }

    #[test]
    fn postfix_increment_copies_old_value() {
        let module = build_ok("int f() { int a = 0; int b = a++; return b; }");
        module
            .function("f")
            .unwrap()
            .assert_contains_opcodes(&[OpCode::LDV, OpCode::RDR4, OpCode::INCi]);
    }

    #[test]
    fn increment_of_constant_is_rejected() {
        let (_, diags) = build("void f() { const int a = 1; a++; }");
        assert!(diags.errors().any(|d| d.message == "Reference is read-only"));
    }

    #[test]
    fn struct_member_read() {
        let module = build_ok("struct P { int x; int y; } int f() { P p; return p.y; }");
        module
            .function("f")
            .unwrap()
            .assert_contains_opcodes(&[OpCode::PSF, OpCode::RDS4, OpCode::ADDSi, OpCode::PopRPtr, OpCode::RDR4]);
    }

    #[test]
    fn unknown_member_is_reported() {
        let (_, diags) = build("struct P { int x; } int f() { P p; return p.z; }");
        assert!(diags.errors().any(|d| d.message == "'z' is not a member of 'P'"));
    }

    #[test]
    fn array_index_calls_the_operator() {
        let module = build_ok("int f() { int[] a(3); return a[1]; }");
        module
            .function("f")
            .unwrap()
            .assert_contains_opcodes(&[OpCode::PSF, OpCode::RDS4, OpCode::CALLSYS, OpCode::RDR4]);
    }

    #[test]
    fn handle_of_value_type_is_rejected() {
        let (_, diags) = build("struct P { int x; } void f() { P p; int@ h; }");
        assert!(diags.errors().any(|d| d.message == "Object handle is not supported for this type"));
    }

    #[test]
    fn host_property_write() {
        build_with_host("void f(Counter c) { c.count = 3; }");
    }
}
