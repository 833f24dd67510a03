//! For loops.

use vxscript_parser::{NodeId, NodeKind};

use super::super::{CResult, Compiler, ExprContext};
use crate::bytecode::{ByteCode, OpCode};

impl Compiler<'_, '_> {
    /// Compile `for (init; cond; next) body`.
    ///
    /// Variables declared by `init` live in the loop's own scope and are
    /// destroyed after the loop.
    ///
    /// ```text
    /// [init]
    /// before:
    /// SUSPEND
    /// [condition]          ; omitted for an empty condition
    /// CpyVtoR4 cond
    /// JZ after
    /// [body]
    /// continue:
    /// [next]
    /// JMP before
    /// after:
    /// ```
    pub(crate) fn compile_for(&mut self, node: NodeId, bc: &mut ByteCode) -> CResult {
        let children: Vec<NodeId> = self.cst.children(node).collect();
        let [init, cond, middle @ .., body] = children.as_slice() else {
            return Err(self.error(node, "Expected for statement"));
        };
        let next = middle.first().copied();

        let before = self.next_label();
        let after = self.next_label();
        let cont = self.next_label();
        self.break_labels.push(after);
        self.continue_labels.push(cont);
        self.add_variable_scope(true, true);

        let mut init_bc = ByteCode::new();
        if self.kind(*init) == NodeKind::Declaration {
            self.compile_declaration(*init, &mut init_bc)?;
        } else {
            self.compile_expression_statement(*init, &mut init_bc)?;
        }

        let mut cond_bc = ByteCode::new();
        if let Some(expr) = self.cst.first_child(*cond) {
            let expr = self.compile_bool_condition(expr)?;
            self.branch_on_condition(expr, OpCode::JZ, after, &mut cond_bc);
        }

        let mut next_bc = ByteCode::new();
        if let Some(next) = next {
            let mut ctx = ExprContext::new();
            self.compile_assignment(next, &mut ctx)?;
            self.discard_value(&mut ctx)?;
            next_bc = ctx.take_code();
        }

        let mut body_bc = ByteCode::new();
        self.compile_statement(*body, &mut body_bc);

        self.line_instr(bc, *init);
        bc.add_code(init_bc);
        bc.label(before);
        self.suspend(bc);
        bc.add_code(cond_bc);
        self.line_instr(bc, *body);
        bc.add_code(body_bc);
        bc.label(cont);
        bc.add_code(next_bc);
        bc.jump(OpCode::JMP, before);
        bc.label(after);

        self.close_scope(bc, true);
        self.continue_labels.pop();
        self.break_labels.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok};

    #[test]
    fn counting_loop() {
        let module = build_ok("int f() { int s = 0; for (int i = 0; i < 10; i++) s += i; return s; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::SUSPEND, OpCode::CMPi, OpCode::JZ, OpCode::ADDi, OpCode::INCi, OpCode::JMP]);
    }

    #[test]
    fn loop_variable_is_scoped_to_the_loop() {
        let (_, diags) = build("void f() { for (int i = 0; i < 3; i++) {} i = 1; }");
        assert!(diags.errors().any(|d| d.message == "'i' is not declared"));
    }

    #[test]
    fn empty_clauses() {
        let module = build_ok("void f() { for (;;) { break; } }");
        let f = module.function("f").unwrap();
        assert_eq!(f.count_op(OpCode::JZ), 0);
    }

    #[test]
    fn continue_runs_the_increment() {
        build_ok("int f() { int s = 0; for (int i = 0; i < 10; i++) { if (i == 5) continue; s += i; } return s; }");
    }
}
