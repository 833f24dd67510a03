//! Variable declarations and initializers.
//!
//! Locals and globals share the initializer logic; they differ only in how
//! the address of the storage is pushed (see [`InitTarget`]).

use vxscript_core::{DataType, Operator};
use vxscript_parser::{NodeId, NodeKind};

use super::super::{CResult, Compiler, ExprContext, InitTarget, TypeInfo};
use crate::bytecode::{ByteCode, OpCode};

impl Compiler<'_, '_> {
    /// `DataType (Identifier (InitList | Assignment | ArgList)?)+`
    pub(crate) fn compile_declaration(&mut self, node: NodeId, bc: &mut ByteCode) -> CResult {
        let children: Vec<NodeId> = self.cst.children(node).collect();
        let Some((&type_node, rest)) = children.split_first() else {
            return Err(self.error(node, "Expected data type"));
        };

        let cst = self.cst;
        let unit = self.unit;
        let dt = match self.symbols.resolve_type(cst, &unit.code, type_node) {
            Ok(dt) => dt,
            Err(text) => return Err(self.error(type_node, text)),
        };
        if dt.size_on_stack_dwords() == 0 {
            let name = self.type_name(&dt);
            return Err(self.error(type_node, format!("Data type can't be '{name}'")));
        }

        let mut rest = rest.iter().copied().peekable();
        while let Some(name_node) = rest.next() {
            let init = rest.next_if(|&n| {
                matches!(
                    self.kind(n),
                    NodeKind::InitList | NodeKind::Assignment | NodeKind::ArgList
                )
            });
            self.declare_local(dt, name_node, init, bc)?;
        }
        Ok(())
    }

    fn declare_local(&mut self, dt: DataType, name_node: NodeId, init: Option<NodeId>, bc: &mut ByteCode) -> CResult {
        let name = self.text(name_node);
        if self.symbols.is_type_name(name) {
            return Err(self.error(name_node, format!("Illegal variable name '{name}'")));
        }

        let offset = self.allocate(dt, false);
        if self.scopes.declare(name, dt, offset).is_err() {
            self.deallocate(offset);
            return Err(self.error(name_node, format!("'{name}' is already declared")));
        }

        let mut ctx = ExprContext::new();
        let mut constant = None;
        let result = self.compile_initializer(InitTarget::Local(offset), dt, init, name_node, &mut ctx, &mut constant);

        // Mark the variable even on error so later uses don't warn.
        if let Some(var) = self.scopes.lookup_mut(name) {
            var.is_initialized |= init.is_some() || dt.is_object();
            var.constant = constant;
        }
        result?;
        bc.add_code(ctx.bc);
        Ok(())
    }

    /// Initialize the storage of `target` from `init`, or with the default
    /// constructor when there is no initializer.
    ///
    /// `constant` receives the value of a read-only primitive initialized
    /// by a constant expression. A local with such a value needs no code;
    /// uses of it are folded.
    pub(crate) fn compile_initializer(
        &mut self,
        target: InitTarget,
        dt: DataType,
        init: Option<NodeId>,
        name_node: NodeId,
        ctx: &mut ExprContext,
        constant: &mut Option<u64>,
    ) -> CResult {
        let Some(init) = init else {
            self.construct_target(target, dt, &mut ctx.bc);
            return Ok(());
        };
        match self.kind(init) {
            NodeKind::ArgList => self.compile_constructor_call(target, dt, init, ctx),
            NodeKind::InitList => self.compile_init_list(target, dt, init, &mut ctx.bc),
            _ => self.compile_init_expression(target, dt, init, name_node, ctx, constant),
        }
    }

    fn construct_target(&mut self, target: InitTarget, dt: DataType, bc: &mut ByteCode) {
        if dt.is_object() && !dt.is_object_handle() {
            target.push_address(bc);
            self.default_constructor(bc, dt);
        }
    }

    /// The storage of `target` as the left side of an assignment.
    fn target_lvalue(&self, target: InitTarget, dt: DataType) -> ExprContext {
        let dt = dt.with_read_only(false);
        let mut lctx = ExprContext::new();
        match target {
            InitTarget::Local(offset) if dt.is_primitive() => lctx.ty.set_variable(dt, offset, false),
            InitTarget::Local(offset) => {
                lctx.bc.instr_w(OpCode::PSF, offset);
                lctx.ty.set_variable(dt.with_reference(true), offset, false);
            }
            InitTarget::Global(index) => {
                let op = if dt.is_primitive() { OpCode::LDG } else { OpCode::PGA };
                lctx.bc.instr_dword(op, index);
                lctx.ty.set(dt.with_reference(true));
            }
        }
        lctx.ty.is_explicit_handle = dt.is_object_handle();
        lctx
    }

    /// `T name = expr;`
    fn compile_init_expression(
        &mut self,
        target: InitTarget,
        dt: DataType,
        init: NodeId,
        name_node: NodeId,
        ctx: &mut ExprContext,
        constant: &mut Option<u64>,
    ) -> CResult {
        let mut rctx = ExprContext::new();
        self.compile_assignment(init, &mut rctx)?;

        if dt.is_primitive() && dt.is_read_only && rctx.ty.is_constant {
            self.implicit_conversion(&mut rctx, dt, init, false, true, &[])?;
            if rctx.ty.is_constant && dt.equal_except_ref_and_const(&rctx.ty.data_type) {
                *constant = Some(rctx.ty.value);
                if matches!(target, InitTarget::Local(_)) {
                    return Ok(());
                }
            }
        }

        self.construct_target(target, dt, &mut ctx.bc);
        let mut lctx = self.target_lvalue(target, dt);
        let mut out = ExprContext::new();
        self.do_assignment(&mut out, &mut lctx, &mut rctx, name_node, init, Operator::Assign, name_node)?;
        self.discard_value(&mut out)?;
        ctx.merge(&mut out);
        Ok(())
    }

    /// `T name(args);`
    fn compile_constructor_call(&mut self, target: InitTarget, dt: DataType, arg_list: NodeId, ctx: &mut ExprContext) -> CResult {
        if !dt.is_object() || dt.is_object_handle() {
            return Err(self.error(arg_list, "Only objects have constructors"));
        }
        let mut args = self.compile_argument_list(arg_list)?;
        if args.is_empty() {
            self.construct_target(target, dt, &mut ctx.bc);
            return Ok(());
        }

        let owner = dt.object_hash();
        let type_name = self.type_name(&dt.with_read_only(false));
        let funcs = self.behaviours(&dt).constructors;
        let func = self.match_functions(funcs, &args, arg_list, &type_name, owner, false)?;
        let desc = self.describe(arg_list, func, owner)?;

        // The address goes under the arguments.
        let mut call = ExprContext::new();
        target.push_address(&mut call.bc);
        self.prepare_function_call(&desc, &mut call, &mut args, arg_list)?;
        self.move_args_to_stack(&desc, &mut call.bc, &mut args, false);
        if let Some(hash) = owner.filter(|_| self.needs_type_argument(&dt)) {
            call.bc.instr_type(OpCode::OBJTYPE, hash);
        }
        self.perform_function_call(&desc, &mut call, true, Some(&mut args), owner)?;
        self.process_deferred_params(&mut call)?;
        ctx.merge(&mut call);
        Ok(())
    }

    /// `T[] name = {a, b, {c, d}, , e};`
    ///
    /// The array is constructed with the number of entries, then each entry
    /// is assigned through the index operator. Empty entries keep the
    /// element's default value; nested lists initialize a temporary first.
    fn compile_init_list(&mut self, target: InitTarget, dt: DataType, list: NodeId, bc: &mut ByteCode) -> CResult {
        let element = self.sub_type(&dt).filter(|_| !dt.is_object_handle());
        let (Some(element), Some(hash)) = (element, dt.object_hash()) else {
            let name = self.type_name(&dt);
            return Err(self.error(list, format!("Initialization lists cannot be used with '{name}'")));
        };
        let owner = Some(hash);
        let items: Vec<NodeId> = self.cst.children(list).collect();

        let behaviours = self.behaviours(&dt);
        let with_length = behaviours.constructors.iter().copied().find(|&id| {
            self.symbols
                .describe(id, owner)
                .is_some_and(|d| matches!(d.params.as_slice(), [p] if p.is_unsigned_type()))
        });
        let index_op = behaviours.operators_for(Operator::Index).find(|&id| {
            self.symbols
                .describe(id, owner)
                .is_some_and(|d| !d.is_read_only && d.return_type.is_reference)
        });
        let Some(with_length) = with_length else {
            let name = self.type_name(&dt);
            return Err(self.error(list, format!("Initialization lists cannot be used with '{name}'")));
        };
        let Some(index_op) = index_op else {
            return Err(self.error(list, "There is no appropriate index operator for this type"));
        };

        let ctor = self.describe(list, with_length, owner)?;
        let mut call = ExprContext::new();
        target.push_address(&mut call.bc);
        call.bc.instr_dword(OpCode::PshC4, items.len() as u32);
        if self.needs_type_argument(&dt) {
            call.bc.instr_type(OpCode::OBJTYPE, hash);
        }
        self.perform_function_call(&ctor, &mut call, true, None, owner)?;
        bc.add_code(call.take_code());

        let index = self.describe(list, index_op, owner)?;
        for (n, &item) in items.iter().enumerate() {
            let mut rctx = ExprContext::new();
            match self.kind(item) {
                NodeKind::Undefined => continue,
                NodeKind::InitList => {
                    let temp = self.allocate(element, true);
                    self.compile_init_list(InitTarget::Local(temp), element, item, &mut rctx.bc)?;
                    rctx.bc.instr_w(OpCode::PSF, temp);
                    rctx.ty = TypeInfo::variable(element.with_reference(true), temp, true);
                }
                _ => self.compile_assignment(item, &mut rctx)?,
            }

            // array[n]
            let mut lctx = ExprContext::new();
            lctx.bc.instr_dword(OpCode::PshC4, n as u32);
            target.push_address(&mut lctx.bc);
            lctx.bc.instr(OpCode::RDS4);
            self.perform_function_call(&index, &mut lctx, false, None, owner)?;
            lctx.ty.is_explicit_handle = element.is_object_handle();

            let mut out = ExprContext::new();
            self.do_assignment(&mut out, &mut lctx, &mut rctx, item, item, Operator::Assign, item)?;
            self.discard_value(&mut out)?;
            bc.add_code(out.take_code());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_host, build_ok, build_with_host};

    #[test]
    fn const_local_folds() {
        let module = build_ok("int f() { const int k = 4; return k * 2; }");
        let f = module.function("f").unwrap();
        assert_eq!(f.count_op(OpCode::MULi), 0);
        let set = f.instructions.iter().find(|i| i.op == OpCode::SetV4).unwrap();
        assert_eq!(set.arg, 8);
    }

    #[test]
    fn uninitialized_local_warns_on_read() {
        let (_, diags) = build("int f() { int a; return a; }");
        assert!(diags.warnings().any(|d| d.message.contains("'a'")));
    }

    #[test]
    fn redeclaration_is_rejected() {
        let (_, diags) = build("void f() { int a = 1; float a = 2; }");
        assert!(diags.errors().any(|d| d.message == "'a' is already declared"));
    }

    #[test]
    fn type_names_are_not_variable_names() {
        let (_, diags) = build("struct P { int x; } void f() { int P = 1; }");
        assert!(diags.errors().any(|d| d.message == "Illegal variable name 'P'"));
    }

    #[test]
    fn several_declarators() {
        let module = build_ok("int f() { int a = 1, b, c = 3; b = a + c; return b; }");
        assert!(module.function("f").unwrap().variable_space >= 3);
    }

    #[test]
    fn primitives_have_no_constructors() {
        let (_, diags) = build("void f() { int a(3); }");
        assert!(diags.errors().any(|d| d.message == "Only objects have constructors"));
    }

    #[test]
    fn constructor_with_arguments() {
        let module = build_with_host("int f() { Counter c(5); return c.value(); }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::PSF, OpCode::ALLOC, OpCode::CALLSYS]);
    }

    #[test]
    fn no_matching_constructor() {
        let (_, diags) = build_host("void f() { Counter c(1.5, 2); }");
        assert!(diags.errors().any(|d| d.message.starts_with("No matching signatures to 'Counter(")));
    }

    #[test]
    fn handle_declaration_copies_the_reference() {
        let module = build_with_host("void f(Node@ n) { Node@ m = n; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::REFCPY]);
    }

    #[test]
    fn init_list_fills_an_array() {
        let module = build_ok("void f() { int[] a = {1, 2, 3}; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[
            OpCode::PshC4,
            OpCode::OBJTYPE,
            OpCode::ALLOC,
            OpCode::PshC4,
            OpCode::PSF,
            OpCode::RDS4,
            OpCode::CALLSYS,
            OpCode::WRTV4,
        ]);
        assert_eq!(f.count_op(OpCode::WRTV4), 3);
    }

    #[test]
    fn init_list_skips_empty_entries() {
        let module = build_ok("void f() { int[] a = {1, , 3}; }");
        assert_eq!(module.function("f").unwrap().count_op(OpCode::WRTV4), 2);
    }

    #[test]
    fn nested_init_lists() {
        build_ok("void f() { int[][] a = {{1, 2}, {3}}; }");
    }

    #[test]
    fn init_list_needs_an_array() {
        let (_, diags) = build("void f() { int a = {1}; }");
        assert!(diags.errors().any(|d| d.message == "Initialization lists cannot be used with 'int'"));
    }
}
