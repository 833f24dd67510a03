//! If/else statements.

use vxscript_parser::NodeId;

use super::super::{CResult, Compiler};
use crate::bytecode::{ByteCode, OpCode};

impl Compiler<'_, '_> {
    /// Compile `if (cond) then [else otherwise]`.
    ///
    /// ```text
    /// [condition]
    /// CpyVtoR4 cond
    /// JZ after
    /// [then]
    /// JMP after_else     ; only with an else branch that can be reached
    /// after:
    /// [else]
    /// after_else:
    /// ```
    ///
    /// A constant condition drops the test; a false one jumps straight over
    /// the then branch.
    pub(crate) fn compile_if(&mut self, node: NodeId, bc: &mut ByteCode) -> CResult<bool> {
        let children: Vec<NodeId> = self.cst.children(node).collect();
        let [cond, then, rest @ ..] = children.as_slice() else {
            return Err(self.error(node, "Expected if statement"));
        };

        let after = self.next_label();
        let expr = self.compile_bool_condition(*cond)?;
        self.branch_on_condition(expr, OpCode::JZ, after, bc);

        let mut then_bc = ByteCode::new();
        let then_returns = self.compile_statement(*then, &mut then_bc);
        self.line_instr(bc, *then);
        bc.add_code(then_bc);

        let Some(&otherwise) = rest.first() else {
            bc.label(after);
            return Ok(false);
        };

        let after_else = self.next_label();
        if !then_returns {
            bc.jump(OpCode::JMP, after_else);
        }
        bc.label(after);

        let mut else_bc = ByteCode::new();
        let else_returns = self.compile_statement(otherwise, &mut else_bc);
        self.line_instr(bc, otherwise);
        bc.add_code(else_bc);

        if !then_returns {
            bc.label(after_else);
        }
        Ok(then_returns && else_returns)
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok};

    #[test]
    fn condition_tests_the_register() {
        let module = build_ok("int f(bool b) { if (b) return 1; return 0; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::CpyVtoR4, OpCode::JZ, OpCode::SetV4, OpCode::CpyVtoR4, OpCode::JMP]);
    }

    #[test]
    fn both_branches_returning_is_a_return() {
        build_ok("int f(bool b) { if (b) return 1; else return 2; }");
    }

    #[test]
    fn one_branch_returning_is_not() {
        let (_, diags) = build("int f(bool b) { if (b) return 1; }");
        assert!(diags.errors().any(|d| d.message == "Not all paths return a value"));
    }

    #[test]
    fn constant_false_skips_the_test() {
        let module = build_ok("void f() { int a = 0; if (false) a = 1; }");
        let f = module.function("f").unwrap();
        assert_eq!(f.count_op(OpCode::JZ), 0);
        assert_eq!(f.count_op(OpCode::CpyVtoR4), 0);
    }

    #[test]
    fn else_if_chain() {
        build_ok("int f(int a) { if (a < 0) return -1; else if (a > 0) return 1; else return 0; }");
    }
}
