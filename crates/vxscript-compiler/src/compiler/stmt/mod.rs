//! Statement compilation.
//!
//! Every statement compiles into its own [`ByteCode`] buffer which the
//! enclosing block appends after a line marker. A statement that fails is
//! abandoned: the compiler state is rolled back with
//! [`Compiler::recover`] and compilation resumes with the next statement.
//!
//! Control flow uses numbered labels that are resolved when the function is
//! finalized. Label 0 is the function exit.

mod block;
mod do_while_stmt;
mod for_stmt;
mod if_stmt;
mod return_stmt;
mod switch_stmt;
mod var_decl;
mod while_stmt;

use vxscript_core::DataType;
use vxscript_parser::{NodeId, NodeKind};

use super::scope::VariableScope;
use super::{CResult, Compiler, ExprContext};
use crate::bytecode::{ByteCode, OpCode};

impl Compiler<'_, '_> {
    /// Compile one statement into `bc`. Returns whether every path through
    /// the statement ends in a `return`.
    pub(crate) fn compile_statement(&mut self, node: NodeId, bc: &mut ByteCode) -> bool {
        let depth = self.scopes.depth();
        let breaks = self.break_labels.len();
        let continues = self.continue_labels.len();

        let kind = self.kind(node);
        let result = match kind {
            NodeKind::StatementBlock => Ok(self.compile_statement_block(node, true, bc)),
            NodeKind::Declaration => self.compile_declaration(node, bc).map(|()| false),
            NodeKind::ExpressionStatement => self.compile_expression_statement(node, bc).map(|()| false),
            NodeKind::If => self.compile_if(node, bc),
            NodeKind::For => self.compile_for(node, bc).map(|()| false),
            NodeKind::While => self.compile_while(node, bc).map(|()| false),
            NodeKind::DoWhile => self.compile_do_while(node, bc).map(|()| false),
            NodeKind::Switch => self.compile_switch(node, bc).map(|()| false),
            NodeKind::Return => self.compile_return(node, bc).map(|()| true),
            NodeKind::Break => self.compile_break(node, bc).map(|()| false),
            NodeKind::Continue => self.compile_continue(node, bc).map(|()| false),
            _ => Err(self.error(node, "Expected statement")),
        };

        match result {
            Ok(has_return) => has_return,
            Err(_) => {
                self.recover(depth, breaks, continues);
                // A broken return still ends its path.
                kind == NodeKind::Return
            }
        }
    }

    /// `Assignment?`
    fn compile_expression_statement(&mut self, node: NodeId, bc: &mut ByteCode) -> CResult {
        let Some(expr) = self.cst.first_child(node) else {
            return Ok(());
        };
        let mut ctx = ExprContext::new();
        self.compile_assignment(expr, &mut ctx)?;
        self.discard_value(&mut ctx)?;
        bc.add_code(ctx.bc);
        Ok(())
    }

    /// Drop the value of an expression that is evaluated for its side
    /// effects.
    pub(crate) fn discard_value(&mut self, ctx: &mut ExprContext) -> CResult {
        let dt = ctx.ty.data_type;
        if !ctx.ty.is_constant && !dt.is_primitive() {
            let size = dt.size_on_stack_dwords();
            if size > 0 {
                ctx.bc.pop(size);
            }
        }
        self.release_temporary(&mut ctx.ty, &mut ctx.bc);
        self.process_deferred_params(ctx)
    }

    /// Compile a loop or `if` condition. The result is a `bool` in a frame
    /// slot, or a constant.
    fn compile_bool_condition(&mut self, node: NodeId) -> CResult<ExprContext> {
        let mut expr = ExprContext::new();
        self.compile_assignment(node, &mut expr)?;
        self.is_variable_initialized(&expr.ty, node);
        if !expr.ty.data_type.equal_except_ref_and_const(&DataType::bool()) {
            return Err(self.error(node, "Expression must be of boolean type"));
        }
        if expr.ty.data_type.is_reference {
            self.convert_to_variable(&mut expr);
        }
        self.process_deferred_params(&mut expr)?;
        if !expr.ty.is_constant {
            self.convert_to_variable(&mut expr);
        }
        Ok(expr)
    }

    /// Append `cond` and jump to `label` when it is false (`JZ`) or true
    /// (`JNZ`). A constant condition jumps unconditionally or not at all.
    fn branch_on_condition(&mut self, mut cond: ExprContext, jump: OpCode, label: u32, bc: &mut ByteCode) {
        if cond.ty.is_constant {
            let taken = match jump {
                OpCode::JZ => cond.ty.dword_value() == 0,
                _ => cond.ty.dword_value() != 0,
            };
            if taken {
                bc.jump(OpCode::JMP, label);
            }
            return;
        }
        let offset = cond.ty.stack_offset;
        bc.add_code(cond.take_code());
        bc.instr_w(OpCode::CpyVtoR4, offset);
        bc.jump(jump, label);
        self.release_temporary(&mut cond.ty, bc);
    }

    /// Give the host a chance to suspend a long running loop.
    fn suspend(&self, bc: &mut ByteCode) {
        if self.config.emit_suspend {
            bc.instr(OpCode::SUSPEND);
        }
    }

    // ==========================================================================
    // Scope exits
    // ==========================================================================

    /// Destroy the locals of the scopes inside the first one `stop` accepts,
    /// innermost first. Parameters are never destroyed here.
    fn destroy_locals_until(&mut self, bc: &mut ByteCode, stop: impl Fn(&VariableScope) -> bool) {
        let locals: Vec<(DataType, i16)> = self
            .scopes
            .iter_inner_to_outer()
            .take_while(|scope| !stop(scope))
            .flat_map(|scope| scope.variables.iter().rev())
            .filter(|v| v.offset > 0)
            .map(|v| (v.data_type, v.offset))
            .collect();
        for (dt, offset) in locals {
            self.compile_destructor(dt, offset, bc);
        }
    }

    /// Pop the innermost scope. With `destroy` its objects are freed in
    /// reverse order of declaration.
    fn close_scope(&mut self, bc: &mut ByteCode, destroy: bool) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        for v in scope.variables.iter().rev().filter(|v| v.offset > 0) {
            if destroy {
                self.compile_destructor(v.data_type, v.offset, bc);
            }
            self.deallocate(v.offset);
        }
    }

    fn compile_break(&mut self, node: NodeId, bc: &mut ByteCode) -> CResult {
        let Some(&label) = self.break_labels.last() else {
            return Err(self.error(node, "Invalid 'break'"));
        };
        self.destroy_locals_until(bc, |scope| scope.is_break_scope);
        bc.jump(OpCode::JMP, label);
        Ok(())
    }

    fn compile_continue(&mut self, node: NodeId, bc: &mut ByteCode) -> CResult {
        let Some(&label) = self.continue_labels.last() else {
            return Err(self.error(node, "Invalid 'continue'"));
        };
        self.destroy_locals_until(bc, |scope| scope.is_continue_scope);
        bc.jump(OpCode::JMP, label);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::module::CompiledFunction;
    use crate::test_utils::{build, build_ok, build_with_host};

    const STRUCT: &str = "struct P { int x; } ";

    /// Slots of the objects allocated by `f`, in allocation order.
    fn allocated(f: &CompiledFunction) -> Vec<i16> {
        let code = &f.instructions;
        (0..code.len())
            .filter(|&i| code[i].op == OpCode::PSF)
            .filter(|&i| code[i + 1..].iter().take(2).any(|n| n.op == OpCode::ALLOC))
            .map(|i| code[i].w[0])
            .collect()
    }

    /// Slots freed by `f`, in code order.
    fn freed(f: &CompiledFunction) -> Vec<i16> {
        f.instructions
            .windows(2)
            .filter(|pair| pair[0].op == OpCode::PSF && pair[1].op == OpCode::FREE)
            .map(|pair| pair[0].w[0])
            .collect()
    }

    #[track_caller]
    fn compile(body: &str) -> CompiledFunction {
        let module = build_ok(&format!("{STRUCT}{body}"));
        module.function("f").unwrap().clone()
    }

    #[test]
    fn fallthrough_frees_in_reverse_declaration_order() {
        let f = compile("void f() { P p; P q; }");
        let [p, q] = allocated(&f)[..] else { panic!("{}", f.listing()) };
        assert_eq!(freed(&f), [q, p]);

        let f = compile("void f() { { P p; P q; } int a = 1; }");
        let [p, q] = allocated(&f)[..] else { panic!("{}", f.listing()) };
        assert_eq!(freed(&f), [q, p]);
    }

    #[test]
    fn break_frees_each_local_once() {
        let f = compile("void f() { while (true) { P p; P q; break; } }");
        let [p, q] = allocated(&f)[..] else { panic!("{}", f.listing()) };
        assert_eq!(freed(&f), [q, p]);
        f.assert_contains_opcodes(&[OpCode::FREE, OpCode::FREE, OpCode::JMP]);
    }

    #[test]
    fn continue_frees_each_local_once() {
        let f = compile("void f(int n) { while (n > 0) { P p; P q; n--; continue; } }");
        let [p, q] = allocated(&f)[..] else { panic!("{}", f.listing()) };
        assert_eq!(freed(&f), [q, p]);
    }

    #[test]
    fn return_frees_enclosing_scopes_and_nothing_after() {
        let f = compile("void f() { P p; { P q; return; } }");
        let [p, q] = allocated(&f)[..] else { panic!("{}", f.listing()) };
        assert_eq!(freed(&f), [q, p]);
    }

    #[test]
    fn every_exit_frees_its_own_locals() {
        let f = compile("void f(bool b) { P p; if (b) { P q; return; } }");
        let [p, q] = allocated(&f)[..] else { panic!("{}", f.listing()) };
        // The return path frees both, the fallthrough only `p`.
        assert_eq!(freed(&f), [q, p, p]);
    }

    #[test]
    fn expression_statement_discards_object_results() {
        let module = build_with_host("void f(Counter c) { c; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::PSF, OpCode::POP]);
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let (_, diags) = build("void f() { break; }");
        assert!(diags.errors().any(|d| d.message == "Invalid 'break'"));
    }

    #[test]
    fn continue_outside_loop_is_rejected() {
        let (_, diags) = build("void f() { switch (1) { case 1: continue; } }");
        assert!(diags.errors().any(|d| d.message == "Invalid 'continue'"));
    }

    #[test]
    fn break_frees_objects_of_inner_scopes() {
        let module = build_ok("struct P { int x; } void f() { while (true) { P p; break; } }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::ALLOC, OpCode::PSF, OpCode::FREE, OpCode::JMP]);
    }

    #[test]
    fn errors_do_not_stop_later_statements() {
        let (_, diags) = build("void f() { int a = x; int b = y; }");
        assert_eq!(diags.errors().count(), 2);
    }

    #[test]
    fn non_bool_condition_is_rejected() {
        let (_, diags) = build("void f(int a) { if (a) {} }");
        assert!(diags.errors().any(|d| d.message == "Expression must be of boolean type"));
    }
}
