//! Do-while loops.

use vxscript_parser::NodeId;

use super::super::{CResult, Compiler};
use crate::bytecode::{ByteCode, OpCode};

impl Compiler<'_, '_> {
    /// Compile `do body while (cond);`. The body runs at least once.
    ///
    /// ```text
    /// before:
    /// [body]
    /// before_test:         ; continue target
    /// SUSPEND
    /// [condition]
    /// CpyVtoR4 cond
    /// JNZ before
    /// after:               ; break target
    /// ```
    pub(crate) fn compile_do_while(&mut self, node: NodeId, bc: &mut ByteCode) -> CResult {
        let (Some(body), Some(cond)) = (self.cst.first_child(node), self.cst.last_child(node)) else {
            return Err(self.error(node, "Expected do-while statement"));
        };

        let before = self.next_label();
        let before_test = self.next_label();
        let after = self.next_label();
        self.continue_labels.push(before_test);
        self.break_labels.push(after);
        self.add_variable_scope(true, true);

        bc.label(before);
        let mut body_bc = ByteCode::new();
        self.compile_statement(body, &mut body_bc);
        self.line_instr(bc, body);
        bc.add_code(body_bc);

        bc.label(before_test);
        self.suspend(bc);
        self.line_instr(bc, cond);
        let expr = self.compile_bool_condition(cond)?;
        self.branch_on_condition(expr, OpCode::JNZ, before, bc);
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
    use crate::test_utils::build_ok;

    #[test]
    fn condition_jumps_back_when_true() {
        let module = build_ok("int f(int n) { do { n--; } while (n > 10); return n; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::SUSPEND, OpCode::CMPi, OpCode::CpyVtoR4, OpCode::JNZ]);
    }

    #[test]
    fn constant_true_loops_forever_until_break() {
        let module = build_ok("void f(int n) { do { if (n == 0) break; n--; } while (true); }");
        let f = module.function("f").unwrap();
        assert_eq!(f.count_op(OpCode::JNZ), 0);
    }
}
