//! Function calls, method calls, constructor calls and explicit primitive
//! conversions.

use vxscript_core::{DataType, FunctionId, TypeHash};
use vxscript_parser::{NodeId, NodeKind};

use super::super::{CResult, Compiler, ExprContext, TypeInfo};
use crate::bytecode::OpCode;

impl Compiler<'_, '_> {
    /// Compile a `FunctionCall` node.
    ///
    /// With `object_type` set this is a method call and the object pointer
    /// is already the value of `ctx`.
    pub(crate) fn compile_function_call(
        &mut self,
        node: NodeId,
        ctx: &mut ExprContext,
        object_type: Option<TypeHash>,
        obj_is_const: bool,
    ) -> CResult {
        let (Some(callee), Some(arg_list)) = (self.cst.first_child(node), self.cst.last_child(node)) else {
            return Err(self.error(node, "Expected function call"));
        };
        if self.kind(arg_list) != NodeKind::ArgList {
            return Err(self.error(node, "Expected argument list"));
        }
        let name = self.text(callee);
        let is_type = self.token(callee).and_then(|t| t.primitive_kind()).is_some()
            || (object_type.is_none() && self.symbols.is_type_name(name));

        let mut constructed: Option<TypeInfo> = None;
        let funcs: Vec<FunctionId> = if let Some(hash) = object_type {
            let Some(ty) = self.symbols.object_type(hash) else {
                return Err(self.error(node, "Illegal call"));
            };
            let methods = ty.methods.clone();
            methods
                .into_iter()
                .filter(|&id| {
                    self.symbols
                        .describe(id, Some(hash))
                        .is_some_and(|d| d.name == name && (!obj_is_const || d.is_read_only))
                })
                .collect()
        } else if is_type {
            let cst = self.cst;
            let unit = self.unit;
            let dt = match self.symbols.resolve_type(cst, &unit.code, callee) {
                Ok(dt) => dt,
                Err(text) => return Err(self.error(callee, text)),
            };
            if dt.is_primitive() {
                return self.compile_conversion(node, arg_list, dt, ctx);
            }

            let dt = dt.with_read_only(false);
            let offset = self.allocate(dt, true);
            constructed = Some(TypeInfo::variable(dt.with_reference(true), offset, true));

            // The object address goes under the arguments.
            ctx.bc.instr_w(OpCode::PSF, offset);
            self.behaviours(&dt).constructors
        } else {
            self.symbols.global_functions(name)
        };

        let mut args = self.compile_argument_list(arg_list)?;
        self.drop_void_argument(ctx, &mut args);

        if let Some(temp) = constructed {
            let dt = temp.data_type.with_reference(false);
            if args.is_empty() {
                self.default_constructor(&mut ctx.bc, dt);
            } else {
                let owner = dt.object_hash();
                let type_name = self.type_name(&dt);
                let func = self.match_functions(funcs, &args, node, &type_name, owner, false)?;
                let desc = self.describe(node, func, owner)?;
                self.prepare_function_call(&desc, ctx, &mut args, node)?;
                self.move_args_to_stack(&desc, &mut ctx.bc, &mut args, false);
                if let Some(hash) = owner.filter(|_| self.needs_type_argument(&dt)) {
                    ctx.bc.instr_type(OpCode::OBJTYPE, hash);
                }
                self.perform_function_call(&desc, ctx, true, Some(&mut args), owner)?;
            }
            ctx.ty = temp;
            ctx.bc.instr_w(OpCode::PSF, temp.stack_offset);
            return Ok(());
        }

        if funcs.is_empty() && object_type.is_none() && !self.symbols.has_global_function(name) {
            // A variable isn't callable; anything else is unknown.
            if self.scopes.lookup(name).is_some() || self.symbols.lookup_global(name).is_some() {
                return Err(self.error(callee, format!("'{name}' is not a function")));
            }
        }

        let func = self.match_functions(funcs, &args, node, name, object_type, obj_is_const)?;
        let desc = self.describe(node, func, object_type)?;

        if object_type.is_some() {
            // Arguments first, the object pointer on top.
            let obj_bc = ctx.take_code();
            let obj_ty = ctx.ty;
            self.prepare_function_call(&desc, ctx, &mut args, node)?;
            for arg in args.iter_mut() {
                self.relocate_temporary(&mut arg.ty, &mut ctx.bc, &obj_bc);
            }
            ctx.bc.add_code(obj_bc);
            ctx.ty = obj_ty;
            self.move_args_to_stack(&desc, &mut ctx.bc, &mut args, true);
        } else {
            self.prepare_function_call(&desc, ctx, &mut args, node)?;
            self.move_args_to_stack(&desc, &mut ctx.bc, &mut args, false);
        }

        self.perform_function_call(&desc, ctx, false, Some(&mut args), object_type)
    }

    /// `f(void)` passes no arguments.
    fn drop_void_argument(&mut self, ctx: &mut ExprContext, args: &mut Vec<ExprContext>) {
        if let [only] = args.as_mut_slice()
            && only.ty.data_type.is_void()
            && !only.ty.is_constant
        {
            ctx.merge(only);
            args.clear();
        }
    }

    /// `type(expr)` for a primitive type.
    pub(crate) fn compile_conversion(
        &mut self,
        node: NodeId,
        arg_list: NodeId,
        to: DataType,
        ctx: &mut ExprContext,
    ) -> CResult {
        let exprs: Vec<NodeId> = self.cst.children(arg_list).collect();
        let [expr] = exprs.as_slice() else {
            return Err(self.error(node, "Only one argument for explicit type conversion"));
        };

        let mut e = ExprContext::new();
        self.compile_assignment(*expr, &mut e)?;
        self.is_variable_initialized(&e.ty, *expr);
        if e.ty.data_type.is_reference && e.ty.data_type.is_primitive() {
            self.convert_to_variable(&mut e);
        }
        self.process_deferred_params(&mut e)?;

        let to = to.with_read_only(true);
        if e.ty.data_type.is_primitive() {
            self.implicit_conversion(&mut e, to, *expr, true, true, &[])?;
        }
        if !e.ty.data_type.equal_except_ref_and_const(&to) {
            let from = self.type_name(&e.ty.data_type.with_read_only(false));
            let to = self.type_name(&to.with_read_only(false));
            return Err(self.error(node, format!("No conversion from '{from}' to '{to}' available.")));
        }

        ctx.merge(&mut e);
        ctx.ty = e.ty;
        ctx.ty.data_type.is_read_only = true;
        Ok(())
    }
}
