//! Argument preparation, overload resolution and call emission.
//!
//! Arguments are evaluated last to first so the first argument ends up on
//! top of the stack. While the arguments are evaluated each one leaves a
//! `VAR` placeholder naming the frame slot that holds it; once every
//! argument is in place [`Compiler::move_args_to_stack`] swaps the
//! placeholders for the actual references or object pointers.
//!
//! Temporaries handed to `&out` parameters, and the arguments of calls
//! returning a reference, are released only after the result has been
//! used. They travel with the expression as [`DeferredParam`]s.

use std::mem;

use vxscript_core::{DataType, FunctionDescriptor, FunctionId, Operator, RefModifier, TypeHash};
use vxscript_parser::NodeId;

use super::{CResult, Compiler, DeferredParam, ExprContext, TypeInfo};
use crate::bytecode::{ByteCode, OpCode};

/// How well an argument matches a parameter, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    Exact,
    ExceptConst,
    SameBase,
    Sign,
    Conversion,
}

impl Compiler<'_, '_> {
    // ==========================================================================
    // Arguments
    // ==========================================================================

    /// Compile the expressions of an `ArgList` node, last to first.
    pub(crate) fn compile_argument_list(&mut self, node: NodeId) -> CResult<Vec<ExprContext>> {
        let exprs: Vec<NodeId> = self.cst.children(node).collect();
        let mut args = vec![ExprContext::new(); exprs.len()];
        for (arg, &expr) in args.iter_mut().zip(&exprs).rev() {
            self.compile_assignment(expr, arg)?;
            arg.node = Some(expr);
        }
        Ok(args)
    }

    /// Evaluate every argument of a call to `desc` into `ctx`, last to first.
    pub(crate) fn prepare_function_call(
        &mut self,
        desc: &FunctionDescriptor,
        ctx: &mut ExprContext,
        args: &mut [ExprContext],
        node: NodeId,
    ) -> CResult {
        for n in (0..args.len()).rev() {
            let param = desc.params.get(n).copied().unwrap_or_else(DataType::void);
            let mode = desc.param_modes.get(n).copied().unwrap_or_default();
            self.prepare_argument2(ctx, &mut args[n], param, mode, &[], node)?;
        }
        Ok(())
    }

    /// Prepare one argument and append its code to `ctx`.
    ///
    /// An `&out` argument is not evaluated here: its expression is kept in
    /// `arg.orig` and receives the output value after the call.
    pub(crate) fn prepare_argument2(
        &mut self,
        ctx: &mut ExprContext,
        arg: &mut ExprContext,
        param: DataType,
        mode: RefModifier,
        reserved: &[i16],
        node: NodeId,
    ) -> CResult {
        let node = arg.node.unwrap_or(node);
        let mut e = ExprContext::new();
        if param.is_reference && mode == RefModifier::Out {
            let mut orig = ExprContext::with_type(arg.ty);
            orig.merge(arg);
            orig.node = arg.node;
            arg.orig = Some(Box::new(orig));
        } else {
            e.merge(arg);
        }
        e.ty = arg.ty;

        self.prepare_argument(param, mode, &mut e, node, true, reserved)?;

        arg.ty = e.ty;
        ctx.merge(&mut e);
        Ok(())
    }

    /// Convert the value in `ctx` for passing as `param`.
    ///
    /// References and objects end with a `VAR` placeholder for the slot
    /// holding the argument. Temporaries are allocated outside `reserved`.
    pub(crate) fn prepare_argument(
        &mut self,
        param: DataType,
        mode: RefModifier,
        ctx: &mut ExprContext,
        node: NodeId,
        is_function: bool,
        reserved: &[i16],
    ) -> CResult {
        if is_function && param.is_reference {
            let dt = param.with_reference(false).with_read_only(false);
            match mode {
                RefModifier::In | RefModifier::None => self.prepare_in_reference(param, dt, ctx, node, reserved)?,
                RefModifier::Out => self.prepare_out_reference(dt, ctx, reserved),
                RefModifier::InOut => self.prepare_inout_reference(param, ctx, node, reserved)?,
            }
        } else if param.is_primitive() {
            self.is_variable_initialized(&ctx.ty, node);
            if ctx.ty.data_type.is_reference {
                self.convert_to_variable_not_in(ctx, reserved);
            }
            self.implicit_conversion(ctx, param, node, false, true, reserved)?;
            if !param.equal_except_ref_and_const(&ctx.ty.data_type) {
                return Err(self.cant_convert(node, &ctx.ty.data_type, &param));
            }
            if ctx.ty.is_constant {
                self.convert_to_variable_not_in(ctx, reserved);
            }
            if ctx.ty.is_variable {
                self.push_variable_on_stack(ctx, param.is_reference);
            }
        } else {
            self.is_variable_initialized(&ctx.ty, node);
            self.implicit_conversion(ctx, param, node, false, true, reserved)?;
            if !param.equal_except_ref_and_const(&ctx.ty.data_type) {
                return Err(self.cant_convert(node, &ctx.ty.data_type, &param));
            }
            if param.is_object_handle() {
                ctx.ty.is_explicit_handle = true;
            }
            if !param.is_reference {
                self.prepare_temporary_object(node, ctx)?;
            }
        }

        if param.is_reference || param.is_object() {
            // Only the slot is needed; drop what the expression left on the
            // stack.
            if !(ctx.ty.is_variable && !ctx.ty.data_type.is_reference) {
                ctx.bc.pop(1);
            }
            ctx.bc.instr_w(OpCode::VAR, ctx.ty.stack_offset);
            self.process_deferred_params(ctx)?;
        }
        Ok(())
    }

    fn prepare_in_reference(
        &mut self,
        param: DataType,
        dt: DataType,
        ctx: &mut ExprContext,
        node: NodeId,
        reserved: &[i16],
    ) -> CResult {
        self.is_variable_initialized(&ctx.ty, node);

        if dt.is_primitive() {
            if ctx.ty.data_type.is_reference {
                self.convert_to_variable_not_in(ctx, reserved);
            }
            self.implicit_conversion(ctx, dt, node, false, true, reserved)?;
            if !dt.equal_except_ref_and_const(&ctx.ty.data_type) {
                return Err(self.cant_convert(node, &ctx.ty.data_type, &dt));
            }
            // A const reference may point straight at the variable.
            if !(param.is_read_only && ctx.ty.is_variable) {
                self.convert_to_temp_variable(ctx, node)?;
            }
            self.push_variable_on_stack(ctx, true);
            ctx.ty.data_type.is_read_only = param.is_read_only;
            return Ok(());
        }

        self.implicit_conversion(ctx, param, node, false, true, reserved)?;
        if !dt.equal_except_ref_and_const(&ctx.ty.data_type) {
            return Err(self.cant_convert(node, &ctx.ty.data_type, &param));
        }
        if ctx.ty.is_temporary || (param.is_read_only && ctx.ty.is_variable) {
            return Ok(());
        }

        // Pass a copy so the function can't modify the caller's object.
        let mut used = ctx.bc.vars_used();
        used.extend_from_slice(reserved);
        let offset = self.allocate_not_in(dt, true, &used);
        let mut ctor = ByteCode::new();
        self.compile_constructor(dt, offset, &mut ctor);
        ctx.bc.prepend(ctor);

        self.prepare_for_assignment(dt, ctx, node, &[])?;
        let mut temp = TypeInfo::new(dt.with_reference(true));
        temp.is_temporary = true;
        temp.stack_offset = offset;
        temp.is_explicit_handle = dt.is_object_handle();

        ctx.bc.instr_w(OpCode::PSF, offset);
        let mut lvalue = temp;
        self.perform_assignment(&mut lvalue, &ctx.ty, &mut ctx.bc, node)?;
        ctx.bc.pop(ctx.ty.data_type.size_on_stack_dwords());
        self.release_temporary(&mut ctx.ty, &mut ctx.bc);

        ctx.bc.instr_w(OpCode::PSF, offset);
        if !dt.is_object_handle() {
            ctx.bc.instr(OpCode::RDS4);
        }
        temp.data_type.is_read_only = param.is_read_only;
        ctx.ty = temp;
        Ok(())
    }

    fn prepare_out_reference(&mut self, dt: DataType, ctx: &mut ExprContext, reserved: &[i16]) {
        let mut used = ctx.bc.vars_used();
        used.extend_from_slice(reserved);
        let offset = self.allocate_not_in(dt, true, &used);

        if dt.is_primitive() {
            ctx.ty.set_variable(dt, offset, true);
            self.push_variable_on_stack(ctx, true);
            return;
        }

        let mut ctor = ByteCode::new();
        self.compile_constructor(dt, offset, &mut ctor);
        ctx.bc.prepend(ctor);

        let mut ty = TypeInfo::new(dt.with_reference(dt.is_object_handle()));
        ty.is_temporary = true;
        ty.stack_offset = offset;
        ctx.ty = ty;

        ctx.bc.instr_w(OpCode::PSF, offset);
        if !dt.is_object_handle() {
            ctx.bc.instr(OpCode::RDS4);
        }
    }

    fn prepare_inout_reference(
        &mut self,
        param: DataType,
        ctx: &mut ExprContext,
        node: NodeId,
        reserved: &[i16],
    ) -> CResult {
        if !param.equal_except_ref_and_const(&ctx.ty.data_type) {
            return Err(self.cant_convert(node, &ctx.ty.data_type, &param));
        }
        if ctx.ty.is_variable {
            return Ok(());
        }

        let dt = ctx.ty.data_type;
        if !dt.is_object() || dt.is_object_handle() || !self.symbols.supports_handles(&dt) {
            return Err(self.error(node, "Can't guarantee safety of reference"));
        }

        // Hold a handle to the object for the duration of the call.
        let handle = dt.with_handle(true).with_reference(false).with_read_only(false);
        let mut used = ctx.bc.vars_used();
        used.extend_from_slice(reserved);
        let offset = self.allocate_not_in(handle, true, &used);
        self.dereference(ctx, true);
        ctx.bc.instr_w(OpCode::PSF, offset);
        if let Some(hash) = dt.object_hash() {
            ctx.bc.instr_type(OpCode::REFCPY, hash);
        }
        ctx.ty.set_variable(handle.with_handle(false).with_reference(true), offset, true);
        Ok(())
    }

    /// Replace the `VAR` placeholders of the arguments by the values they
    /// stand for. With `add_one` the object pointer of a method call sits
    /// on top of the arguments.
    pub(crate) fn move_args_to_stack(
        &mut self,
        desc: &FunctionDescriptor,
        bc: &mut ByteCode,
        args: &mut [ExprContext],
        add_one: bool,
    ) {
        let mut offset: i16 = if add_one { 1 } else { 0 };
        for (n, param) in desc.params.iter().enumerate() {
            let Some(arg) = args.get_mut(n) else {
                break;
            };
            if param.is_reference {
                if param.is_object() && !param.is_object_handle() {
                    bc.instr_w(OpCode::GETOBJREF, offset);
                    if arg.ty.data_type.is_object_handle() {
                        bc.instr(OpCode::CHKREF);
                    }
                } else {
                    bc.instr_w(OpCode::GETREF, offset);
                }
            } else if param.is_object() {
                // Ownership of the object moves to the callee.
                bc.instr_w(OpCode::GETOBJ, offset);
                self.deallocate(arg.ty.stack_offset);
                arg.ty.is_temporary = false;
            }
            offset += param.size_on_stack_dwords() as i16;
        }
    }

    /// Move the temporary of `ty` to a slot `other` doesn't use.
    pub(crate) fn relocate_temporary(&mut self, ty: &mut TypeInfo, code: &mut ByteCode, other: &ByteCode) {
        if !ty.is_temporary || !other.is_var_used(ty.stack_offset) {
            return;
        }
        let old = ty.stack_offset;
        self.deallocate(old);
        let mut used = other.vars_used();
        used.extend(code.vars_used());
        let offset = self.allocate_not_in(ty.data_type.with_reference(false), true, &used);
        code.exchange_var(old, offset);
        ty.stack_offset = offset;
    }

    // ==========================================================================
    // Overload resolution
    // ==========================================================================

    /// The one function of `funcs` callable with `args`.
    pub(crate) fn match_functions(
        &mut self,
        mut funcs: Vec<FunctionId>,
        args: &[ExprContext],
        node: NodeId,
        name: &str,
        owner: Option<TypeHash>,
        is_const: bool,
    ) -> CResult<FunctionId> {
        funcs.retain(|&id| {
            self.symbols
                .describe(id, owner)
                .is_some_and(|d| d.params.len() == args.len())
        });

        let mut matching = funcs.clone();
        for (n, arg) in args.iter().enumerate() {
            let accepted = self.match_argument(&funcs, &arg.ty, n, owner, node);
            matching.retain(|f| accepted.contains(f));
        }
        if !is_const {
            self.filter_const(&mut matching, owner);
        }

        if let [func] = matching.as_slice() {
            return Ok(*func);
        }

        let list = args
            .iter()
            .map(|a| self.type_name(&a.ty.data_type.with_reference(false)))
            .collect::<Vec<_>>()
            .join(", ");
        let suffix = if is_const { " const" } else { "" };
        let text = if matching.is_empty() {
            format!("No matching signatures to '{name}({list}){suffix}'")
        } else {
            format!("Multiple matching signatures to '{name}({list}){suffix}'")
        };
        Err(self.error(node, text))
    }

    /// The functions of `funcs` whose parameter `index` accepts `arg`, all
    /// from the best tier that has any.
    pub(crate) fn match_argument(
        &mut self,
        funcs: &[FunctionId],
        arg: &TypeInfo,
        index: usize,
        owner: Option<TypeHash>,
        node: NodeId,
    ) -> Vec<FunctionId> {
        let mut best = MatchTier::Conversion;
        let mut matches = Vec::new();

        for &id in funcs {
            let Some(desc) = self.symbols.describe(id, owner) else {
                continue;
            };
            let Some(&param) = desc.params.get(index) else {
                continue;
            };

            let mut ti = ExprContext::with_type(*arg);
            if ti.ty.data_type.is_primitive() {
                ti.ty.data_type.is_reference = false;
            }
            // Probe the conversion without keeping its diagnostics.
            let before = self.messages.len();
            let had_errors = self.has_errors;
            let converted = self.implicit_conversion(&mut ti, param, node, false, false, &[]);
            self.messages.truncate(before);
            self.has_errors = had_errors;
            if converted.is_err() || !param.equal_except_ref(&ti.ty.data_type) {
                continue;
            }

            let tier = if param.equal_except_ref(&arg.data_type) {
                MatchTier::Exact
            } else if param.equal_except_ref_and_const(&arg.data_type) {
                MatchTier::ExceptConst
            } else if param.same_primitive_base_type(&arg.data_type) {
                MatchTier::SameBase
            } else if (param.is_integer_type() && arg.data_type.is_unsigned_type())
                || (param.is_unsigned_type() && arg.data_type.is_integer_type())
            {
                MatchTier::Sign
            } else {
                MatchTier::Conversion
            };

            if tier < best {
                best = tier;
                matches.clear();
            }
            if tier == best {
                matches.push(id);
            }
        }
        matches
    }

    /// Prefer non-const methods when the object isn't const.
    pub(crate) fn filter_const(&mut self, funcs: &mut Vec<FunctionId>, owner: Option<TypeHash>) {
        let read_only: Vec<(FunctionId, bool, bool)> = funcs
            .iter()
            .filter_map(|&id| {
                self.symbols
                    .describe(id, owner)
                    .map(|d| (id, d.is_method(), d.is_read_only))
            })
            .collect();
        if !read_only.iter().any(|&(_, is_method, _)| is_method) {
            return;
        }
        if read_only.iter().any(|&(_, _, ro)| !ro) {
            funcs.retain(|id| read_only.iter().any(|&(f, _, ro)| f == *id && !ro));
        }
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    /// Emit the call to `desc` and describe its result in `ctx`.
    ///
    /// The arguments must already be on the stack. `obj_type` is the type
    /// being constructed when `is_constructor` is set.
    pub(crate) fn perform_function_call(
        &mut self,
        desc: &FunctionDescriptor,
        ctx: &mut ExprContext,
        is_constructor: bool,
        args: Option<&mut [ExprContext]>,
        obj_type: Option<TypeHash>,
    ) -> CResult {
        let arg_size = desc.space_needed_for_arguments();
        let this_size = u32::from(desc.is_method());
        let ret = desc.return_type;
        ctx.ty.set(ret);

        match desc.id {
            FunctionId::System(index) => {
                self.symbols.use_group(desc.group);
                match obj_type.filter(|_| is_constructor) {
                    Some(hash) => {
                        let type_arg = u32::from(self.needs_type_argument(&DataType::object(hash)));
                        ctx.bc.alloc(hash, index, arg_size + 1 + type_arg);
                    }
                    None => ctx.bc.call(OpCode::CALLSYS, index, arg_size + this_size),
                }
            }
            FunctionId::Imported(index) => ctx.bc.call(OpCode::CALLBND, index, arg_size + this_size),
            FunctionId::Script(index) => ctx.bc.call(OpCode::CALL, index, arg_size + this_size),
        }

        let mut no_args: [ExprContext; 0] = [];
        let args = args.unwrap_or(&mut no_args);

        if ret.is_object() && !ret.is_reference {
            // Objects returned by value are stored in a temporary.
            let dt = ret.with_read_only(false);
            let offset = self.allocate(dt, true);
            ctx.ty.set_variable(dt.with_reference(true), offset, true);
            ctx.bc.instr_w(OpCode::STOREOBJ, offset);
            self.after_function_call(desc, args, ctx, false);
            self.process_deferred_params(ctx)?;
            ctx.bc.instr_w(OpCode::PSF, offset);
        } else if ret.is_reference {
            // The arguments may own what the reference points at.
            self.after_function_call(desc, args, ctx, true);
            if !ret.is_primitive() {
                ctx.bc.instr(OpCode::PshRPtr);
                if !ret.is_object_handle() {
                    ctx.ty.data_type.is_reference = false;
                }
            }
        } else {
            if ret.size_in_memory_bytes() > 0 {
                let dt = ret.with_read_only(false);
                let offset = self.allocate(dt, true);
                if dt.size_in_memory_dwords() == 1 {
                    ctx.bc.instr_w(OpCode::CpyRtoV4, offset);
                    match dt.size_in_memory_bytes() {
                        1 => {
                            let widen = if dt.is_integer_type() { OpCode::SbToI } else { OpCode::UbToI };
                            ctx.bc.instr_w(widen, offset);
                        }
                        2 => {
                            let widen = if dt.is_integer_type() { OpCode::SwToI } else { OpCode::UwToI };
                            ctx.bc.instr_w(widen, offset);
                        }
                        _ => {}
                    }
                } else {
                    ctx.bc.instr_w(OpCode::CpyRtoV8, offset);
                }
                ctx.ty.set_variable(dt, offset, true);
            }
            self.after_function_call(desc, args, ctx, false);
            self.process_deferred_params(ctx)?;
        }
        Ok(())
    }

    /// Release argument temporaries, or defer them when their value is still
    /// needed.
    fn after_function_call(
        &mut self,
        desc: &FunctionDescriptor,
        args: &mut [ExprContext],
        ctx: &mut ExprContext,
        defer_all: bool,
    ) {
        for n in (0..args.len()).rev() {
            let param = desc.params.get(n).copied().unwrap_or_else(DataType::void);
            let mode = desc.param_modes.get(n).copied().unwrap_or_default();
            let arg = &mut args[n];
            if (param.is_reference && mode.writes_value()) || (param.is_object() && defer_all) {
                ctx.deferred.push(DeferredParam {
                    arg_type: arg.ty,
                    mode,
                    orig: arg.orig.take(),
                    node: arg.node,
                });
            } else {
                self.release_temporary(&mut arg.ty, &mut ctx.bc);
            }
        }
    }

    /// Write back `&out` arguments and release deferred temporaries.
    pub(crate) fn process_deferred_params(&mut self, ctx: &mut ExprContext) -> CResult {
        if self.is_processing_deferred {
            return Ok(());
        }
        self.is_processing_deferred = true;
        let result = self.process_deferred_list(ctx);
        self.is_processing_deferred = false;
        result
    }

    fn process_deferred_list(&mut self, ctx: &mut ExprContext) -> CResult {
        while !ctx.deferred.is_empty() {
            for mut param in mem::take(&mut ctx.deferred) {
                match param.mode {
                    RefModifier::None | RefModifier::In => {
                        self.release_temporary(&mut param.arg_type, &mut ctx.bc);
                    }
                    RefModifier::Out => self.write_back_output(ctx, param)?,
                    RefModifier::InOut => {
                        self.release_temporary(&mut param.arg_type, &mut ctx.bc);
                    }
                }
            }
        }
        Ok(())
    }

    fn write_back_output(&mut self, ctx: &mut ExprContext, mut param: DeferredParam) -> CResult {
        let Some(mut expr) = param.orig.take() else {
            self.release_temporary(&mut param.arg_type, &mut ctx.bc);
            return Ok(());
        };
        let Some(node) = param.node.or(expr.node).or(ctx.node) else {
            self.release_temporary(&mut param.arg_type, &mut ctx.bc);
            return Ok(());
        };

        if param.arg_type.data_type.is_object_handle() && expr.ty.data_type.is_object_handle() {
            expr.ty.is_explicit_handle = true;
        }

        if self.is_lvalue(&expr.ty) {
            let mut rctx = ExprContext::with_type(param.arg_type);
            if rctx.ty.data_type.is_primitive() {
                rctx.ty.data_type.is_reference = false;
            } else {
                rctx.bc.instr_w(OpCode::PSF, param.arg_type.stack_offset);
                rctx.ty.data_type.is_reference = true;
            }

            let mut o = ExprContext::new();
            self.do_assignment(&mut o, &mut expr, &mut rctx, node, node, Operator::Assign, node)?;
            if !o.ty.data_type.is_primitive() {
                o.bc.pop(1);
            }
            ctx.merge(&mut o);
        } else {
            // Evaluate the expression for its side effects only.
            ctx.merge(&mut expr);
            let on_stack = expr.ty.data_type.is_object()
                && !expr.ty.is_constant
                && !(expr.ty.is_variable && !expr.ty.data_type.is_reference);
            if on_stack {
                ctx.bc.pop(1);
            }
            self.warning(node, "Argument cannot be assigned. Output will be discarded.");
            self.release_temporary(&mut param.arg_type, &mut ctx.bc);
        }
        self.release_temporary(&mut expr.ty, &mut ctx.bc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vxscript_core::{DataType, FunctionDescriptor, FunctionId, PrimitiveKind, RefModifier};

    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok};

    #[test]
    fn arguments_are_pushed_last_to_first() {
        let module = build_ok("void g(int a, float b) {} void f() { g(1, 2); }");
        let f = module.function("f").unwrap();
        let constants: Vec<u64> = f
            .instructions
            .iter()
            .filter(|i| i.op == OpCode::SetV4)
            .map(|i| i.arg)
            .collect();
        assert_eq!(constants, vec![u64::from(2.0f32.to_bits()), 1]);
        f.assert_contains_opcodes(&[OpCode::PSF, OpCode::RDS4, OpCode::PSF, OpCode::RDS4, OpCode::CALL]);
    }

    #[test]
    fn overloads_prefer_the_exact_match() {
        let module = build_ok(
            "int g(int a) { return 1; } int g(double a) { return 2; } void f() { double d = 1; g(d); }",
        );
        let f = module.function("f").unwrap();
        let call = f.instructions.iter().find(|i| i.op == OpCode::CALL).unwrap();
        assert_eq!(call.arg, 1);
    }

    #[test]
    fn ambiguous_call_is_reported() {
        let (_, diags) = build("void g(float a) {} void g(double a) {} void f() { int i = 1; g(i); }");
        assert!(diags.errors().any(|d| d.message == "Multiple matching signatures to 'g(int)'"));
    }

    #[test]
    fn missing_overload_is_reported() {
        let (_, diags) = build("struct S { int x; } void g(int a) {} void f() { S s; g(s); }");
        assert!(diags.errors().any(|d| d.message == "No matching signatures to 'g(S)'"));
    }

    #[test]
    fn primitive_return_lands_in_a_temporary() {
        let module = build_ok("int g() { return 1; } void f() { int a = g(); }");
        module
            .function("f")
            .unwrap()
            .assert_contains_opcodes(&[OpCode::CALL, OpCode::CpyRtoV4, OpCode::CpyVtoV4]);
    }

    #[test]
    fn out_reference_writes_back_after_the_call() {
        let module = build_ok("void g(int &out a) { a = 1; } void f() { int x; g(x); }");
        module.function("f").unwrap().assert_contains_opcodes(&[
            OpCode::PSF,
            OpCode::GETREF,
            OpCode::CALL,
            OpCode::CpyVtoV4,
        ]);
    }

    #[test]
    fn discarded_output_warns() {
        let (_, diags) = build("void g(int &out a) { a = 1; } void f() { g(1); }");
        assert!(diags
            .warnings()
            .any(|d| d.message == "Argument cannot be assigned. Output will be discarded."));
    }

    #[test]
    fn struct_by_value_argument_moves_the_copy() {
        let module = build_ok("struct S { int x; } void g(S s) {} void f() { S s; g(s); }");
        module
            .function("f")
            .unwrap()
            .assert_contains_opcodes(&[OpCode::VAR, OpCode::GETOBJ, OpCode::CALL]);
    }

    #[test]
    fn descriptor_argument_space_counts_references_as_one() {
        let desc = FunctionDescriptor::new(FunctionId::Script(0), "g", DataType::void())
            .with_param(DataType::primitive(PrimitiveKind::Double), RefModifier::None)
            .with_param(DataType::primitive(PrimitiveKind::Double), RefModifier::In);
        assert_eq!(desc.space_needed_for_arguments(), 3);
    }
}
