//! Binary operators.
//!
//! Operands arrive compiled but unmerged; the left operand's code always
//! runs first. Constant operands fold at compile time. Otherwise both are
//! brought into frame slots and the result lands in a fresh temporary.

use std::cmp::Ordering;
use std::mem;

use vxscript_core::{DataType, Operator, PrimitiveKind, VALUE_OF_BOOLEAN_TRUE};
use vxscript_parser::NodeId;

use super::super::{CResult, Compiler, ExprContext};
use crate::bytecode::OpCode;

/// Common type both operands of an arithmetic or comparison operator are
/// converted to.
fn math_type(l: &DataType, r: &DataType) -> Option<DataType> {
    let kind = if l.is_double_type() || r.is_double_type() {
        PrimitiveKind::Double
    } else if l.is_float_type() || r.is_float_type() {
        PrimitiveKind::Float
    } else if l.is_integer_type() || r.is_integer_type() {
        PrimitiveKind::Int32
    } else if l.is_unsigned_type() || r.is_unsigned_type() || l.is_bit_vector_type() || r.is_bit_vector_type() {
        PrimitiveKind::UInt32
    } else {
        return None;
    };
    Some(DataType::primitive(kind))
}

impl Compiler<'_, '_> {
    /// Compile `lctx op rctx` into `ctx`.
    pub(crate) fn compile_operator(
        &mut self,
        node: NodeId,
        op: Operator,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        ctx: &mut ExprContext,
    ) -> CResult {
        self.is_variable_initialized(&lctx.ty, node);
        self.is_variable_initialized(&rctx.ty, node);

        if lctx.ty.is_explicit_handle
            || rctx.ty.is_explicit_handle
            || lctx.ty.is_null_constant()
            || rctx.ty.is_null_constant()
        {
            return self.compile_operator_on_handles(node, op, lctx, rctx, ctx);
        }

        let has_object = lctx.ty.data_type.is_object() || rctx.ty.data_type.is_object();
        if has_object {
            if self.compile_overloaded_operator(node, op, lctx, rctx, ctx)? {
                return Ok(());
            }
            let l = self.type_name(&lctx.ty.data_type.with_reference(false));
            let r = self.type_name(&rctx.ty.data_type.with_reference(false));
            return Err(self.error(node, format!("No matching operator that takes the types '{l}' and '{r}' found")));
        }

        // The left reference is read before the right operand's code runs.
        if lctx.ty.data_type.is_reference {
            let used = rctx.bc.vars_used();
            self.convert_to_variable_not_in(lctx, &used);
        }
        if rctx.ty.data_type.is_reference {
            self.convert_to_variable(rctx);
        }
        self.process_deferred_params(lctx)?;
        self.process_deferred_params(rctx)?;

        if op.is_math() {
            self.compile_math_operator(node, op, lctx, rctx, ctx)
        } else if op.is_bitwise() {
            self.compile_bitwise_operator(node, op, lctx, rctx, ctx)
        } else if op.is_comparison() {
            self.compile_comparison_operator(node, op, lctx, rctx, ctx)
        } else if op.is_boolean() {
            self.compile_boolean_operator(node, op, lctx, rctx, ctx)
        } else {
            Err(self.error(node, "Illegal operation"))
        }
    }

    /// Call a host registered global operator. `Ok(false)` when none
    /// accepts the operands.
    fn compile_overloaded_operator(
        &mut self,
        node: NodeId,
        op: Operator,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        ctx: &mut ExprContext,
    ) -> CResult<bool> {
        let funcs = self.symbols.global_operators(op);
        if funcs.is_empty() {
            return Ok(false);
        }
        let mut matching = self.match_argument(&funcs, &lctx.ty, 0, None, node);
        let right = self.match_argument(&funcs, &rctx.ty, 1, None, node);
        matching.retain(|f| right.contains(f));

        let func = match matching.as_slice() {
            [] => return Ok(false),
            [func] => *func,
            _ => return Err(self.error(node, "Found more than one matching operator")),
        };
        let desc = self.describe(node, func, None)?;
        let (Some(&p0), Some(&p1)) = (desc.params.first(), desc.params.get(1)) else {
            return Ok(false);
        };
        let m0 = desc.param_modes.first().copied().unwrap_or_default();
        let m1 = desc.param_modes.get(1).copied().unwrap_or_default();

        let reserved = rctx.bc.vars_used();
        let mut args = [mem::take(lctx), mem::take(rctx)];
        args[0].node.get_or_insert(node);
        args[1].node.get_or_insert(node);
        let (first, second) = args.split_at_mut(1);
        self.prepare_argument2(ctx, &mut first[0], p0, m0, &reserved, node)?;
        self.prepare_argument2(ctx, &mut second[0], p1, m1, &[], node)?;

        // Both were pushed left first; the callee wants the first on top.
        let swap = match (p0.size_on_stack_dwords(), p1.size_on_stack_dwords()) {
            (1, 1) => OpCode::SWAP4,
            (1, _) => OpCode::SWAP48,
            (_, 1) => OpCode::SWAP84,
            _ => OpCode::SWAP8,
        };
        ctx.bc.instr(swap);

        self.move_args_to_stack(&desc, &mut ctx.bc, &mut args, false);
        self.perform_function_call(&desc, ctx, false, Some(&mut args), None)?;
        Ok(true)
    }

    fn compile_math_operator(
        &mut self,
        node: NodeId,
        op: Operator,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        ctx: &mut ExprContext,
    ) -> CResult {
        let l = lctx.ty;
        let r = rctx.ty;
        let Some(mut to) = math_type(&l.data_type, &r.data_type) else {
            let bad = if math_type(&l.data_type, &l.data_type).is_none() { l.data_type } else { r.data_type };
            let name = self.type_name(&bad);
            return Err(self.error(node, format!("No conversion from '{name}' to math type available.")));
        };
        // A double literal doesn't widen a float variable.
        if to.is_double_type()
            && ((l.is_constant && l.data_type.is_double_type() && !r.is_constant && r.data_type.is_float_type())
                || (r.is_constant && r.data_type.is_double_type() && !l.is_constant && l.data_type.is_float_type()))
        {
            to = DataType::primitive(PrimitiveKind::Float);
        }

        self.convert_operands(node, lctx, rctx, to, "math type")?;

        if matches!(op, Operator::Div | Operator::Mod) && rctx.ty.is_constant && is_zero(&rctx.ty.data_type, rctx.ty.value) {
            return Err(self.error(node, "Divide by zero"));
        }

        if lctx.ty.is_constant && rctx.ty.is_constant {
            let value = fold_math(op, &to, lctx.ty.value, rctx.ty.value);
            ctx.ty.set_constant(to.with_read_only(true), value);
            return Ok(());
        }

        let opcode = match (op, to.primitive_kind()) {
            (Operator::Add, Some(PrimitiveKind::Float)) => OpCode::ADDf,
            (Operator::Sub, Some(PrimitiveKind::Float)) => OpCode::SUBf,
            (Operator::Mul, Some(PrimitiveKind::Float)) => OpCode::MULf,
            (Operator::Div, Some(PrimitiveKind::Float)) => OpCode::DIVf,
            (Operator::Mod, Some(PrimitiveKind::Float)) => OpCode::MODf,
            (Operator::Add, Some(PrimitiveKind::Double)) => OpCode::ADDd,
            (Operator::Sub, Some(PrimitiveKind::Double)) => OpCode::SUBd,
            (Operator::Mul, Some(PrimitiveKind::Double)) => OpCode::MULd,
            (Operator::Div, Some(PrimitiveKind::Double)) => OpCode::DIVd,
            (Operator::Mod, Some(PrimitiveKind::Double)) => OpCode::MODd,
            (Operator::Add, _) => OpCode::ADDi,
            (Operator::Sub, _) => OpCode::SUBi,
            (Operator::Mul, _) => OpCode::MULi,
            (Operator::Div, _) => OpCode::DIVi,
            _ => OpCode::MODi,
        };
        self.emit_binary(opcode, to, lctx, rctx, ctx);
        Ok(())
    }

    fn compile_bitwise_operator(
        &mut self,
        node: NodeId,
        op: Operator,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        ctx: &mut ExprContext,
    ) -> CResult {
        let bits = DataType::primitive(PrimitiveKind::Bits32);
        let is_integral = |dt: &DataType| dt.is_integer_type() || dt.is_unsigned_type() || dt.is_bit_vector_type();

        if op.is_shift() {
            if !is_integral(&lctx.ty.data_type) {
                let name = self.type_name(&lctx.ty.data_type);
                return Err(self.error(node, format!("No conversion from '{name}' to 'bits' available.")));
            }
            if !is_integral(&rctx.ty.data_type) {
                let name = self.type_name(&rctx.ty.data_type);
                return Err(self.error(node, format!("No conversion from '{name}' to 'uint' available.")));
            }
            self.implicit_conversion(lctx, bits, node, false, true, &[])?;
            let used = lctx.bc.vars_used();
            self.implicit_conversion(rctx, DataType::uint(), node, false, true, &used)?;
        } else {
            for side in [&mut *lctx, &mut *rctx] {
                if !is_integral(&side.ty.data_type) {
                    let name = self.type_name(&side.ty.data_type);
                    return Err(self.error(node, format!("No conversion from '{name}' to 'bits' available.")));
                }
            }
            self.implicit_conversion(lctx, bits, node, false, true, &[])?;
            let used = lctx.bc.vars_used();
            self.implicit_conversion(rctx, bits, node, false, true, &used)?;
        }

        if lctx.ty.is_constant && rctx.ty.is_constant {
            let l = lctx.ty.dword_value();
            let r = rctx.ty.dword_value();
            let value = match op {
                Operator::BitAnd => l & r,
                Operator::BitOr => l | r,
                Operator::BitXor => l ^ r,
                Operator::Shl => l.wrapping_shl(r),
                Operator::Shr => l.wrapping_shr(r),
                _ => (l as i32).wrapping_shr(r) as u32,
            };
            ctx.ty.set_constant(bits.with_read_only(true), u64::from(value));
            return Ok(());
        }

        let opcode = match op {
            Operator::BitAnd => OpCode::BAND,
            Operator::BitOr => OpCode::BOR,
            Operator::BitXor => OpCode::BXOR,
            Operator::Shl => OpCode::BSLL,
            Operator::Shr => OpCode::BSRL,
            _ => OpCode::BSRA,
        };
        self.emit_binary(opcode, bits, lctx, rctx, ctx);
        Ok(())
    }

    fn compile_comparison_operator(
        &mut self,
        node: NodeId,
        op: Operator,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        ctx: &mut ExprContext,
    ) -> CResult {
        let l = lctx.ty;
        let r = rctx.ty;
        let both_bool = l.data_type.is_bool_type() && r.data_type.is_bool_type();
        let to = if both_bool {
            DataType::bool()
        } else {
            match math_type(&l.data_type, &r.data_type) {
                Some(to) => to,
                None => {
                    let l = self.type_name(&l.data_type);
                    let r = self.type_name(&r.data_type);
                    return Err(self.error(node, format!("No conversion from '{r}' to '{l}' available.")));
                }
            }
        };

        let mismatch = |a: &super::super::TypeInfo, b: &super::super::TypeInfo| {
            a.data_type.is_unsigned_type()
                && b.data_type.is_integer_type()
                && (!a.is_constant || a.dword_value() > i32::MAX as u32)
        };
        if mismatch(&l, &r) || mismatch(&r, &l) {
            self.warning(node, "Signed/Unsigned mismatch");
        }

        self.convert_operands(node, lctx, rctx, to, "")?;

        if to.is_bool_type() && !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(self.error(node, "Illegal operation"));
        }

        let bool_type = DataType::bool();
        if lctx.ty.is_constant && rctx.ty.is_constant {
            let ordering = compare_constants(&to, lctx.ty.value, rctx.ty.value);
            let result = match ordering {
                Some(ord) => match op {
                    Operator::Equal => ord == Ordering::Equal,
                    Operator::NotEqual => ord != Ordering::Equal,
                    Operator::Less => ord == Ordering::Less,
                    Operator::LessEqual => ord != Ordering::Greater,
                    Operator::Greater => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                },
                // NaN compares unequal to everything.
                None => op == Operator::NotEqual,
            };
            let value = if result { VALUE_OF_BOOLEAN_TRUE } else { 0 };
            ctx.ty.set_constant(bool_type.with_read_only(true), u64::from(value));
            return Ok(());
        }

        let used = rctx.bc.vars_used();
        if to.is_bool_type() {
            // Normalize both to 0/1 before comparing.
            self.convert_to_temp_variable(lctx, node)?;
            lctx.bc.instr_w(OpCode::NOT, lctx.ty.stack_offset);
            self.convert_to_temp_variable(rctx, node)?;
            rctx.bc.instr_w(OpCode::NOT, rctx.ty.stack_offset);
        } else {
            self.convert_to_variable_not_in(lctx, &used);
            self.convert_to_variable(rctx);
        }

        self.release_temporary(&mut lctx.ty, &mut lctx.bc);
        self.release_temporary(&mut rctx.ty, &mut rctx.bc);
        ctx.merge(lctx);
        ctx.merge(rctx);

        let cmp = match to.primitive_kind() {
            Some(PrimitiveKind::UInt32) => OpCode::CMPu,
            Some(PrimitiveKind::Float) => OpCode::CMPf,
            Some(PrimitiveKind::Double) => OpCode::CMPd,
            _ => OpCode::CMPi,
        };
        let test = match op {
            Operator::Equal => OpCode::TZ,
            Operator::NotEqual => OpCode::TNZ,
            Operator::Less => OpCode::TS,
            Operator::LessEqual => OpCode::TNP,
            Operator::Greater => OpCode::TP,
            _ => OpCode::TNS,
        };
        let result = self.allocate(bool_type, true);
        ctx.bc.instr_w_w(cmp, lctx.ty.stack_offset, rctx.ty.stack_offset);
        ctx.bc.instr(test);
        ctx.bc.instr_w(OpCode::CpyRtoV4, result);
        ctx.ty.set_variable(bool_type, result, true);
        Ok(())
    }

    /// `&&` and `||` skip the right operand once the result is known.
    fn compile_boolean_operator(
        &mut self,
        node: NodeId,
        op: Operator,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        ctx: &mut ExprContext,
    ) -> CResult {
        let bool_type = DataType::bool();
        for side in [&*lctx, &*rctx] {
            if !side.ty.data_type.equal_except_ref_and_const(&bool_type) {
                let name = self.type_name(&side.ty.data_type);
                return Err(self.error(node, format!("No conversion from '{name}' to 'bool' available.")));
            }
        }

        if lctx.ty.is_constant && rctx.ty.is_constant {
            let l = lctx.ty.dword_value() != 0;
            let r = rctx.ty.dword_value() != 0;
            let result = match op {
                Operator::And => l && r,
                Operator::Or => l || r,
                _ => l != r,
            };
            let value = if result { VALUE_OF_BOOLEAN_TRUE } else { 0 };
            ctx.ty.set_constant(bool_type.with_read_only(true), u64::from(value));
            return Ok(());
        }

        if op == Operator::Xor {
            let used = rctx.bc.vars_used();
            self.convert_to_variable_not_in(lctx, &used);
            self.convert_to_temp_variable(lctx, node)?;
            lctx.bc.instr_w(OpCode::NOT, lctx.ty.stack_offset);
            self.convert_to_temp_variable(rctx, node)?;
            rctx.bc.instr_w(OpCode::NOT, rctx.ty.stack_offset);
            self.emit_binary(OpCode::BXOR, bool_type, lctx, rctx, ctx);
            return Ok(());
        }

        let used = rctx.bc.vars_used();
        self.convert_to_variable_not_in(lctx, &used);
        let mut exclude = used;
        exclude.push(lctx.ty.stack_offset);
        let result = self.allocate_not_in(bool_type, true, &exclude);

        let eval_right = self.next_label();
        let done = self.next_label();

        ctx.merge(lctx);
        ctx.bc.instr_w(OpCode::CpyVtoR4, lctx.ty.stack_offset);
        if op == Operator::And {
            ctx.bc.jump(OpCode::JNZ, eval_right);
            ctx.bc.instr_w_dword(OpCode::SetV4, result, 0);
        } else {
            ctx.bc.jump(OpCode::JZ, eval_right);
            ctx.bc.instr_w_dword(OpCode::SetV4, result, VALUE_OF_BOOLEAN_TRUE);
        }
        ctx.bc.jump(OpCode::JMP, done);
        ctx.bc.label(eval_right);
        self.release_temporary(&mut lctx.ty, &mut ctx.bc);

        self.convert_to_variable(rctx);
        ctx.merge(rctx);
        ctx.bc.instr_w_w(OpCode::CpyVtoV4, result, rctx.ty.stack_offset);
        self.release_temporary(&mut rctx.ty, &mut ctx.bc);
        ctx.bc.label(done);

        ctx.ty.set_variable(bool_type, result, true);
        Ok(())
    }

    /// `==` and `!=` on handles compare the object addresses.
    fn compile_operator_on_handles(
        &mut self,
        node: NodeId,
        op: Operator,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        ctx: &mut ExprContext,
    ) -> CResult {
        if !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(self.error(node, "Illegal operation"));
        }
        let bool_type = DataType::bool();

        if lctx.ty.is_null_constant() && rctx.ty.is_null_constant() {
            let value = if op == Operator::Equal { VALUE_OF_BOOLEAN_TRUE } else { 0 };
            ctx.ty.set_constant(bool_type.with_read_only(true), u64::from(value));
            return Ok(());
        }
        if lctx.ty.is_null_constant() {
            lctx.ty.data_type = rctx.ty.data_type.with_reference(false);
        } else if rctx.ty.is_null_constant() {
            rctx.ty.data_type = lctx.ty.data_type.with_reference(false);
        }

        let l = lctx.ty.data_type;
        let r = rctx.ty.data_type;
        if !l.is_object_handle() || !r.is_object_handle() || l.object_hash() != r.object_hash() {
            let from = self.type_name(&r);
            let to = self.type_name(&l);
            return Err(self.error(node, format!("No conversion from '{from}' to '{to}' available.")));
        }

        let used = rctx.bc.vars_used();
        self.handle_to_variable(lctx, &used);
        self.handle_to_variable(rctx, &[]);
        self.process_deferred_params(lctx)?;
        self.process_deferred_params(rctx)?;

        ctx.merge(lctx);
        ctx.merge(rctx);
        let result = self.allocate(bool_type, true);
        ctx.bc.instr_w_w(OpCode::CMPi, lctx.ty.stack_offset, rctx.ty.stack_offset);
        ctx.bc.instr(if op == Operator::Equal { OpCode::TZ } else { OpCode::TNZ });
        ctx.bc.instr_w(OpCode::CpyRtoV4, result);
        self.release_temporary(&mut lctx.ty, &mut ctx.bc);
        self.release_temporary(&mut rctx.ty, &mut ctx.bc);

        ctx.ty.set_variable(bool_type, result, true);
        Ok(())
    }

    /// A handle local is compared through its slot; anything else is
    /// copied into a temporary handle.
    fn handle_to_variable(&mut self, ctx: &mut ExprContext, exclude: &[i16]) {
        if ctx.ty.is_constant {
            let dt = ctx.ty.data_type.with_reference(false);
            let offset = self.allocate_not_in(dt, true, exclude);
            ctx.bc.instr_w_dword(OpCode::SetV4, offset, 0);
            ctx.ty.set_variable(dt, offset, true);
            return;
        }
        if ctx.ty.is_variable && ctx.ty.data_type.is_reference && self.slot_holds_value(ctx.ty.stack_offset) {
            ctx.bc.pop(1);
            ctx.ty.data_type.is_reference = false;
            return;
        }
        ctx.ty.is_variable = false;
        self.convert_to_variable_not_in(ctx, exclude);
    }

    /// The slot holds the variable itself, not the address of a reference
    /// parameter.
    fn slot_holds_value(&mut self, offset: i16) -> bool {
        self.scopes.by_offset_mut(offset).is_none_or(|v| !v.data_type.is_reference)
    }

    /// Convert both operands to `to`, reporting the first that can't be.
    fn convert_operands(
        &mut self,
        node: NodeId,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        to: DataType,
        target_name: &str,
    ) -> CResult {
        let used = rctx.bc.vars_used();
        self.implicit_conversion(lctx, to, node, false, true, &used)?;
        let used = lctx.bc.vars_used();
        self.implicit_conversion(rctx, to, node, false, true, &used)?;

        for side in [&*lctx, &*rctx] {
            if !side.ty.data_type.equal_except_ref_and_const(&to) {
                let from = self.type_name(&side.ty.data_type);
                let target = if target_name.is_empty() { self.type_name(&to) } else { target_name.to_string() };
                let text = if target_name.is_empty() {
                    format!("No conversion from '{from}' to '{target}' available.")
                } else {
                    format!("No conversion from '{from}' to {target} available.")
                };
                return Err(self.error(node, text));
            }
        }
        Ok(())
    }

    /// `op result, l, r` into a fresh temporary. Operand temporaries are
    /// freed first so the result may reuse one of them.
    fn emit_binary(&mut self, opcode: OpCode, to: DataType, lctx: &mut ExprContext, rctx: &mut ExprContext, ctx: &mut ExprContext) {
        let used = rctx.bc.vars_used();
        self.convert_to_variable_not_in(lctx, &used);
        self.convert_to_variable(rctx);

        let l = lctx.ty.stack_offset;
        let r = rctx.ty.stack_offset;
        self.release_temporary(&mut lctx.ty, &mut lctx.bc);
        self.release_temporary(&mut rctx.ty, &mut rctx.bc);
        ctx.merge(lctx);
        ctx.merge(rctx);

        let to = to.with_read_only(false).with_reference(false);
        let result = self.allocate(to, true);
        ctx.bc.instr_w_w_w(opcode, result, l, r);
        ctx.ty.set_variable(to, result, true);
    }
}

fn is_zero(dt: &DataType, value: u64) -> bool {
    if dt.is_float_type() {
        f32::from_bits(value as u32) == 0.0
    } else if dt.is_double_type() {
        f64::from_bits(value) == 0.0
    } else {
        value as u32 == 0
    }
}

/// Fold an arithmetic operator over two constants of type `to`.
fn fold_math(op: Operator, to: &DataType, l: u64, r: u64) -> u64 {
    if to.is_float_type() {
        let (a, b) = (f32::from_bits(l as u32), f32::from_bits(r as u32));
        let v = match op {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div => a / b,
            _ => a % b,
        };
        u64::from(v.to_bits())
    } else if to.is_double_type() {
        let (a, b) = (f64::from_bits(l), f64::from_bits(r));
        let v = match op {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div => a / b,
            _ => a % b,
        };
        v.to_bits()
    } else if to.is_integer_type() {
        let (a, b) = (l as u32 as i32, r as u32 as i32);
        let v = match op {
            Operator::Add => a.wrapping_add(b),
            Operator::Sub => a.wrapping_sub(b),
            Operator::Mul => a.wrapping_mul(b),
            Operator::Div => a.checked_div(b).unwrap_or(0),
            _ => a.checked_rem(b).unwrap_or(0),
        };
        u64::from(v as u32)
    } else {
        // Division of unsigned operands runs on DIVi/MODi, so it folds signed.
        let (a, b) = (l as u32, r as u32);
        let (sa, sb) = (a as i32, b as i32);
        let v = match op {
            Operator::Add => a.wrapping_add(b),
            Operator::Sub => a.wrapping_sub(b),
            Operator::Mul => a.wrapping_mul(b),
            Operator::Div => sa.checked_div(sb).unwrap_or(0) as u32,
            _ => sa.checked_rem(sb).unwrap_or(0) as u32,
        };
        u64::from(v)
    }
}

fn compare_constants(to: &DataType, l: u64, r: u64) -> Option<Ordering> {
    if to.is_float_type() {
        f32::from_bits(l as u32).partial_cmp(&f32::from_bits(r as u32))
    } else if to.is_double_type() {
        f64::from_bits(l).partial_cmp(&f64::from_bits(r))
    } else if to.is_integer_type() {
        Some((l as u32 as i32).cmp(&(r as u32 as i32)))
    } else if to.is_bool_type() {
        Some((l as u32 != 0).cmp(&(r as u32 != 0)))
    } else {
        Some((l as u32).cmp(&(r as u32)))
    }
}

#[cfg(test)]
mod tests {
    use vxscript_core::{DataType, Operator, PrimitiveKind};

    use super::{fold_math, math_type};
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok, build_with_host};

    #[test]
    fn math_type_prefers_the_widest_float() {
        let int = DataType::int();
        let float = DataType::primitive(PrimitiveKind::Float);
        let double = DataType::primitive(PrimitiveKind::Double);
        assert_eq!(math_type(&int, &float), Some(float));
        assert_eq!(math_type(&float, &double), Some(double));
        assert_eq!(math_type(&DataType::uint(), &int), Some(int));
        assert_eq!(math_type(&DataType::bool(), &DataType::bool()), None);
    }

    #[test]
    fn integer_folding_wraps() {
        let v = fold_math(Operator::Add, &DataType::int(), u64::from(i32::MAX as u32), 1);
        assert_eq!(v as u32 as i32, i32::MIN);
    }

    #[test]
    fn unsigned_division_folds_like_divi() {
        let uint = DataType::uint();
        let v = fold_math(Operator::Div, &uint, u64::from(u32::MAX), 2);
        assert_eq!(v as u32, (-1i32 / 2) as u32);
        let v = fold_math(Operator::Mod, &uint, u64::from(u32::MAX), 2);
        assert_eq!(v as u32, (-1i32 % 2) as u32);
        let v = fold_math(Operator::Div, &uint, 7, 2);
        assert_eq!(v, 3);
    }

    #[test]
    fn addition_of_locals() {
        let module = build_ok("int f(int a, int b) { return a + b; }");
        let f = module.function("f").unwrap();
        let add = f.instructions.iter().find(|i| i.op == OpCode::ADDi).unwrap();
        assert_eq!(&add.w[1..], &[0, -1]);
    }

    #[test]
    fn float_variable_keeps_double_literal_narrow() {
        let module = build_ok("float f(float a) { return a * 2.0; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::MULf]);
        assert_eq!(f.count_op(OpCode::MULd), 0);
    }

    #[test]
    fn constant_division_by_zero_is_an_error() {
        let (_, diags) = build("int f(int a) { return a / 0; }");
        assert!(diags.errors().any(|d| d.message == "Divide by zero"));
    }

    #[test]
    fn bool_is_not_a_math_type() {
        let (_, diags) = build("int f(bool a) { return a + 1; }");
        assert!(diags.errors().any(|d| d.message == "No conversion from 'bool' to math type available."));
    }

    #[test]
    fn shifts_take_uint_amount() {
        let module = build_ok("bits f(bits a, int n) { return a << n; }");
        module.function("f").unwrap().assert_contains_opcodes(&[OpCode::BSLL]);
    }

    #[test]
    fn bitwise_constants_fold() {
        let module = build_ok("bits f() { return 0xF0 | 0x0F; }");
        let f = module.function("f").unwrap();
        assert_eq!(f.count_op(OpCode::BOR), 0);
        let set = f.instructions.iter().find(|i| i.op == OpCode::SetV4).unwrap();
        assert_eq!(set.arg, 0xFF);
    }

    #[test]
    fn comparison_sets_bool_from_flags() {
        let module = build_ok("bool f(float a, float b) { return a < b; }");
        module
            .function("f")
            .unwrap()
            .assert_contains_opcodes(&[OpCode::CMPf, OpCode::TS, OpCode::CpyRtoV4]);
    }

    #[test]
    fn signed_unsigned_comparison_warns() {
        let (_, diags) = build("bool f(int a, uint b) { return a < b; }");
        assert!(diags.warnings().any(|d| d.message == "Signed/Unsigned mismatch"));
    }

    #[test]
    fn small_unsigned_literal_does_not_warn() {
        let (_, diags) = build("bool f(int a) { return a < 10; }");
        assert!(diags.is_empty());
    }

    #[test]
    fn bools_only_compare_for_equality() {
        let (_, diags) = build("bool f(bool a, bool b) { return a < b; }");
        assert!(diags.errors().any(|d| d.message == "Illegal operation"));
    }

    #[test]
    fn logical_and_short_circuits() {
        let module = build_ok("bool f(bool a, bool b) { return a && b; }");
        module.function("f").unwrap().assert_contains_opcodes(&[
            OpCode::CpyVtoR4,
            OpCode::JNZ,
            OpCode::SetV4,
            OpCode::JMP,
            OpCode::CpyVtoV4,
        ]);
    }

    #[test]
    fn logical_xor_of_constants_folds_without_code() {
        let module = build_ok("bool f() { return true ^^ false; }");
        let f = module.function("f").unwrap();
        assert_eq!(f.count_op(OpCode::PshC4), 0);
        assert_eq!(f.count_op(OpCode::BXOR), 0);
    }

    #[test]
    fn handle_comparison_with_null() {
        let module = build_with_host("bool f() { Node@ r; return @r == null; }");
        module
            .function("f")
            .unwrap()
            .assert_contains_opcodes(&[OpCode::SetV4, OpCode::CMPi, OpCode::TZ]);
    }

    #[test]
    fn host_operator_overload_is_called() {
        let module = build_with_host("int f(Counter a, Counter b) { Counter c = a + b; return c.value(); }");
        module
            .function("f")
            .unwrap()
            .assert_contains_opcodes(&[OpCode::SWAP4, OpCode::CALLSYS]);
    }

    #[test]
    fn objects_without_operator_are_rejected() {
        let (_, diags) = build("struct P { int x; } bool f(P a, P b) { return a < b; }");
        assert!(
            diags
                .errors()
                .any(|d| d.message == "No matching operator that takes the types 'P' and 'P' found")
        );
    }
}
