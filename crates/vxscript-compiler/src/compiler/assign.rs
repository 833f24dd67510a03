//! Assignment, lvalues and temporary objects.

use vxscript_core::{DataType, Operator};
use vxscript_parser::NodeId;

use super::{CResult, Compiler, ExprContext, TypeInfo};
use crate::bytecode::{ByteCode, OpCode};

impl Compiler<'_, '_> {
    /// Convert the rvalue for storing into `lvalue` and check its type.
    ///
    /// A primitive rvalue ends up in a variable whose offset is not in
    /// `exclude`. An object rvalue ends up as a pointer on the stack.
    pub(crate) fn prepare_for_assignment(
        &mut self,
        lvalue: DataType,
        rctx: &mut ExprContext,
        node: NodeId,
        exclude: &[i16],
    ) -> CResult {
        self.is_variable_initialized(&rctx.ty, node);

        if lvalue.is_primitive() {
            if rctx.ty.data_type.is_primitive() {
                if rctx.ty.data_type.is_reference {
                    self.convert_to_variable_not_in(rctx, exclude);
                }
                self.implicit_conversion(rctx, lvalue, node, false, true, exclude)?;
            }
            if !lvalue.equal_except_ref_and_const(&rctx.ty.data_type) {
                return Err(self.cant_convert(node, &rctx.ty.data_type, &lvalue));
            }
            if !rctx.ty.is_variable {
                self.convert_to_variable_not_in(rctx, exclude);
            }
            return Ok(());
        }

        let to = lvalue.with_reference(false);
        self.implicit_conversion(rctx, to, node, false, true, exclude)?;
        if lvalue.is_object_handle() && !rctx.ty.data_type.is_object_handle() {
            return Err(self.error(node, "Need to be a handle"));
        }
        if !lvalue.equal_except_ref_and_const(&rctx.ty.data_type) {
            return Err(self.cant_convert(node, &rctx.ty.data_type, &lvalue));
        }

        if rctx.ty.is_null_constant() {
            rctx.bc.instr_dword(OpCode::PshC4, 0);
            rctx.ty = TypeInfo::new(to);
            rctx.ty.is_explicit_handle = true;
        } else if rctx.ty.is_variable && !rctx.ty.data_type.is_reference {
            // A handle held in a slot.
            rctx.bc.instr_w(OpCode::PSF, rctx.ty.stack_offset);
            rctx.bc.instr(OpCode::RDS4);
            rctx.ty.is_variable = false;
        }
        Ok(())
    }

    pub(crate) fn cant_convert(&mut self, node: NodeId, from: &DataType, to: &DataType) -> super::Reported {
        let from = self.type_name(from);
        let to = self.type_name(to);
        self.error(node, format!("Can't implicitly convert from '{from}' to '{to}'."))
    }

    pub(crate) fn is_lvalue(&self, ty: &TypeInfo) -> bool {
        !ty.data_type.is_read_only
            && (ty.data_type.is_object() || ty.is_variable || ty.data_type.is_reference)
            && !ty.is_temporary
    }

    /// Store a prepared rvalue into `lvalue`.
    ///
    /// Primitives copy from the rvalue's variable. Objects expect the rvalue
    /// pointer and the lvalue address on the stack and leave the lvalue's
    /// object pointer behind.
    pub(crate) fn perform_assignment(
        &mut self,
        lvalue: &mut TypeInfo,
        rvalue: &TypeInfo,
        bc: &mut ByteCode,
        node: NodeId,
    ) -> CResult {
        if lvalue.data_type.is_read_only {
            return Err(self.error(node, "Reference is read-only"));
        }

        if lvalue.data_type.is_primitive() {
            if lvalue.is_variable {
                let op = if lvalue.data_type.size_in_memory_dwords() == 1 {
                    OpCode::CpyVtoV4
                } else {
                    OpCode::CpyVtoV8
                };
                bc.instr_w_w(op, lvalue.stack_offset, rvalue.stack_offset);
                self.mark_initialized(lvalue.stack_offset);
            } else if lvalue.data_type.is_reference {
                let op = match lvalue.data_type.size_in_memory_bytes() {
                    1 => OpCode::WRTV1,
                    2 => OpCode::WRTV2,
                    4 => OpCode::WRTV4,
                    _ => OpCode::WRTV8,
                };
                bc.instr_w(op, rvalue.stack_offset);
            } else {
                return Err(self.error(node, "Not a valid lvalue"));
            }
            return Ok(());
        }

        if !lvalue.is_explicit_handle {
            if lvalue.data_type.is_reference {
                lvalue.data_type.is_reference = false;
                lvalue.is_variable = false;
                bc.instr(OpCode::RDS4);
            }
            let behaviours = self.behaviours(&lvalue.data_type);
            if let Some(copy) = behaviours.copy {
                bc.call(OpCode::CALLSYS, copy.index(), 2);
                bc.instr(OpCode::PshRPtr);
            } else {
                let size = self.object_size_dwords(&lvalue.data_type);
                if size == 0 {
                    return Err(self.error(node, "There is no copy operator for this type available."));
                }
                bc.instr_dword(OpCode::COPY, size);
            }
            return Ok(());
        }

        if !lvalue.data_type.is_reference {
            return Err(self.error(node, "Not a valid reference"));
        }
        if let Some(hash) = lvalue.data_type.object_hash() {
            bc.instr_type(OpCode::REFCPY, hash);
        }
        self.mark_initialized(lvalue.stack_offset);
        Ok(())
    }

    fn mark_initialized(&mut self, offset: i16) {
        if let Some(var) = self.scopes.by_offset_mut(offset) {
            var.is_initialized = true;
        }
    }

    /// Compile `lctx op rctx` for an assignment operator into `ctx`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn do_assignment(
        &mut self,
        ctx: &mut ExprContext,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        lexpr: NodeId,
        rexpr: NodeId,
        op: Operator,
        op_node: NodeId,
    ) -> CResult {
        if lctx.ty.data_type.is_primitive() {
            return self.do_primitive_assignment(ctx, lctx, rctx, rexpr, op, op_node);
        }

        if lctx.ty.is_temporary {
            return Err(self.error(lexpr, "Reference is temporary"));
        }

        if lctx.ty.is_explicit_handle {
            if op != Operator::Assign {
                let name = self.type_name(&lctx.ty.data_type);
                return Err(self.error(lexpr, format!("Illegal operation on '{name}'")));
            }
            return self.assign_object(ctx, lctx, rctx, rexpr, op_node);
        }

        if lctx.ty.data_type.is_object_handle() {
            let to = lctx.ty.data_type.with_handle(false);
            self.implicit_conversion(lctx, to, lexpr, false, true, &[])?;
        }

        let owner = lctx.ty.data_type.object_hash();
        let candidates: Vec<_> = self.behaviours(&lctx.ty.data_type).operators_for(op).collect();
        let matches = self.match_argument(&candidates, &rctx.ty, 0, owner, op_node);

        match matches.as_slice() {
            [func] => {
                let is_array = self.sub_type(&lctx.ty.data_type).is_some();
                if is_array && !lctx.ty.data_type.equal_except_ref_and_const(&rctx.ty.data_type) {
                    return Err(self.error(op_node, "Both sides must be the same type"));
                }
                if lctx.ty.data_type.is_read_only {
                    return Err(self.error(lexpr, "Reference is read-only"));
                }
                let desc = self.describe(op_node, *func, owner)?;
                let param = desc.params.first().copied().unwrap_or_else(DataType::void);
                let mode = desc.param_modes.first().copied().unwrap_or_default();
                self.prepare_argument(param, mode, rctx, rexpr, true, &[])?;

                // The argument's temporary must not be one the object
                // expression uses.
                self.relocate_temporary(&mut rctx.ty, &mut rctx.bc, &lctx.bc);

                ctx.merge(rctx);
                self.dereference(lctx, true);
                ctx.merge(lctx);

                let args = std::slice::from_mut(rctx);
                self.move_args_to_stack(&desc, &mut ctx.bc, args, true);
                self.perform_function_call(&desc, ctx, false, Some(args), None)
            }
            [] => {
                if op != Operator::Assign {
                    let name = self.type_name(&lctx.ty.data_type);
                    return Err(self.error(lexpr, format!("Illegal operation on '{name}'")));
                }
                self.assign_object(ctx, lctx, rctx, rexpr, op_node)
            }
            _ => Err(self.error(op_node, "Found more than one matching operator")),
        }
    }

    fn do_primitive_assignment(
        &mut self,
        ctx: &mut ExprContext,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        rexpr: NodeId,
        op: Operator,
        op_node: NodeId,
    ) -> CResult {
        let lvalue = lctx.ty;

        let Some(base) = op.compound_base() else {
            let exclude = lctx.bc.vars_used();
            self.prepare_for_assignment(lvalue.data_type, rctx, rexpr, &exclude)?;
            ctx.merge(rctx);
            ctx.merge(lctx);
            self.release_temporary(&mut rctx.ty, &mut ctx.bc);
            self.perform_assignment(&mut lctx.ty, &rctx.ty, &mut ctx.bc, op_node)?;
            ctx.ty = lctx.ty;
            return Ok(());
        };

        // The right side is evaluated first so a reference held in the
        // register survives until the write.
        if !rctx.ty.is_constant {
            self.prepare_operand(rctx, rexpr)?;
            self.convert_to_variable(rctx);
        }
        ctx.merge(rctx);

        let mut current = ExprContext::with_type(lvalue);
        current.bc = lctx.take_code();
        let mut right = ExprContext::with_type(rctx.ty);
        let mut result = ExprContext::new();
        self.compile_operator(op_node, base, &mut current, &mut right, &mut result)?;

        self.prepare_for_assignment(lvalue.data_type, &mut result, rexpr, &[])?;
        ctx.merge(&mut result);
        self.release_temporary(&mut result.ty, &mut ctx.bc);
        let mut target = lvalue;
        self.perform_assignment(&mut target, &result.ty, &mut ctx.bc, op_node)?;
        ctx.ty = target;
        Ok(())
    }

    /// Plain copy or handle assignment without an operator overload.
    fn assign_object(
        &mut self,
        ctx: &mut ExprContext,
        lctx: &mut ExprContext,
        rctx: &mut ExprContext,
        rexpr: NodeId,
        op_node: NodeId,
    ) -> CResult {
        let lvalue = lctx.ty.data_type;
        self.prepare_for_assignment(lvalue, rctx, rexpr, &[])?;
        ctx.merge(rctx);
        ctx.merge(lctx);
        self.perform_assignment(&mut lctx.ty, &rctx.ty, &mut ctx.bc, op_node)?;
        self.release_temporary(&mut rctx.ty, &mut ctx.bc);

        let mut result = TypeInfo::new(lvalue.with_reference(false));
        result.is_explicit_handle = lctx.ty.is_explicit_handle;
        ctx.ty = result;
        Ok(())
    }

    /// Copy an object value into a fresh temporary and leave the
    /// temporary's address on the stack.
    pub(crate) fn prepare_temporary_object(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        if ctx.ty.is_temporary {
            return Ok(());
        }
        let dt = ctx.ty.data_type.with_reference(false).with_read_only(false);
        let offset = self.allocate(dt, true);
        self.compile_constructor(dt, offset, &mut ctx.bc);

        let mut temp = TypeInfo::variable(dt.with_reference(true), offset, true);
        temp.is_explicit_handle = ctx.ty.is_explicit_handle;

        self.prepare_for_assignment(temp.data_type, ctx, node, &[])?;
        ctx.bc.instr_w(OpCode::PSF, offset);
        let mut lvalue = temp;
        self.perform_assignment(&mut lvalue, &ctx.ty, &mut ctx.bc, node)?;
        ctx.bc.pop(1);
        self.release_temporary(&mut ctx.ty, &mut ctx.bc);
        ctx.bc.instr_w(OpCode::PSF, offset);
        ctx.ty = temp;
        Ok(())
    }
}
