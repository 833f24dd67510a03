//! While loops.

use vxscript_parser::NodeId;

use super::super::{CResult, Compiler};
use crate::bytecode::{ByteCode, OpCode};

impl Compiler<'_, '_> {
    /// Compile `while (cond) body`.
    ///
    /// ```text
    /// before:              ; continue target
    /// [condition]
    /// CpyVtoR4 cond
    /// JZ after
    /// SUSPEND
    /// [body]
    /// JMP before
    /// after:               ; break target
    /// ```
    pub(crate) fn compile_while(&mut self, node: NodeId, bc: &mut ByteCode) -> CResult {
        let (Some(cond), Some(body)) = (self.cst.first_child(node), self.cst.last_child(node)) else {
            return Err(self.error(node, "Expected while statement"));
        };

        let before = self.next_label();
        let after = self.next_label();
        self.continue_labels.push(before);
        self.break_labels.push(after);
        self.add_variable_scope(true, true);

        bc.label(before);
        let expr = self.compile_bool_condition(cond)?;
        self.branch_on_condition(expr, OpCode::JZ, after, bc);
        self.suspend(bc);

        let mut body_bc = ByteCode::new();
        self.compile_statement(body, &mut body_bc);
        self.line_instr(bc, body);
        bc.add_code(body_bc);

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
    use crate::test_utils::build_ok;

    #[test]
    fn loop_layout() {
        let module = build_ok("void f(int n) { while (n > 0) n--; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[
            OpCode::CMPi,
            OpCode::TP,
            OpCode::CpyRtoV4,
            OpCode::CpyVtoR4,
            OpCode::JZ,
            OpCode::SUSPEND,
            OpCode::JMP,
        ]);
    }

    #[test]
    fn break_and_continue_inside() {
        let module = build_ok("void f(int n) { while (true) { if (n > 3) break; n++; continue; } }");
        let f = module.function("f").unwrap();
        assert!(f.count_op(OpCode::JMP) >= 2);
    }
}
