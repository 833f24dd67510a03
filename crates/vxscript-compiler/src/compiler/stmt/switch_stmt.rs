//! Switch statements.
//!
//! Case values are sorted and split into ranges of values lying close
//! together. Dense ranges dispatch through a jump table, sparse ones through
//! a chain of comparisons.

use vxscript_core::DataType;
use vxscript_parser::{NodeId, NodeKind, TokenKind};

use super::super::{CResult, Compiler, ExprContext};
use crate::bytecode::{ByteCode, OpCode};

/// One `case` label.
#[derive(Debug, Clone, Copy)]
struct CaseValue {
    value: i64,
    label: u32,
    node: NodeId,
}

impl Compiler<'_, '_> {
    /// Compile `switch (expr) { case ...: ... default: ... }`.
    ///
    /// ```text
    /// [selector]
    /// SetV4 tmp, max ; CMPi sel, tmp ; JP default
    /// ; per range, jump table:
    /// SetV4 tmp, min ; CMPi sel, tmp ; JS default
    /// SetV4 tmp, hi  ; CMPi sel, tmp ; JP next_range
    /// SetV4 tmp, min ; SUBi tmp, sel, tmp
    /// JMPP tmp
    /// JMP case_n ...      ; holes jump to default
    /// next_range:
    /// ; per range, comparisons:
    /// SetV4 tmp, v ; CMPi sel, tmp ; JZ case_v
    /// JMP default
    /// case_n: [statements] ...
    /// default: [statements]
    /// break:
    /// ```
    ///
    /// Unsigned selectors compare with `CMPu`.
    pub(crate) fn compile_switch(&mut self, node: NodeId, bc: &mut ByteCode) -> CResult {
        let children: Vec<NodeId> = self.cst.children(node).collect();
        let Some((&selector, cases)) = children.split_first() else {
            return Err(self.error(node, "Expected switch statement"));
        };

        let break_label = self.next_label();
        self.break_labels.push(break_label);
        self.add_variable_scope(true, false);

        let mut expr = ExprContext::new();
        self.compile_assignment(selector, &mut expr)?;
        self.is_variable_initialized(&expr.ty, selector);
        let selector_type = expr.ty.data_type;
        if !selector_type.is_integral_type() {
            return Err(self.error(selector, "Switch expression must be an integral type"));
        }
        let is_signed = selector_type.is_integer_type();
        let wide = if is_signed { DataType::int() } else { DataType::uint() };
        if expr.ty.data_type.is_reference {
            self.convert_to_variable(&mut expr);
        }
        self.implicit_conversion(&mut expr, wide, selector, false, true, &[])?;
        self.process_deferred_params(&mut expr)?;
        self.convert_to_variable(&mut expr);

        // One label per case, in source order.
        let mut values = Vec::new();
        let mut case_labels = Vec::with_capacity(cases.len());
        let mut default_label = None;
        for (n, &case) in cases.iter().enumerate() {
            let label = self.next_label();
            case_labels.push(label);
            if self.token(case) == Some(TokenKind::Default) {
                if n + 1 < cases.len() {
                    return Err(self.error(case, "The default case must be the last one"));
                }
                default_label = Some(label);
                continue;
            }
            let value = self.compile_case_value(case, wide)?;
            values.push(CaseValue { value, label, node: case });
        }
        let default_label = default_label.unwrap_or(break_label);

        values.sort_by_key(|c| c.value);
        if let Some(dup) = values.windows(2).find(|w| w[0].value == w[1].value) {
            return Err(self.error(dup[1].node, "Duplicate switch case"));
        }

        let sel = expr.ty.stack_offset;
        let cmp = if is_signed { OpCode::CMPi } else { OpCode::CMPu };
        self.emit_case_dispatch(&values, sel, cmp, default_label, &mut expr.bc);
        expr.bc.jump(OpCode::JMP, default_label);
        self.release_temporary(&mut expr.ty, &mut expr.bc);
        bc.add_code(expr.bc);

        for (&case, &label) in cases.iter().zip(&case_labels) {
            bc.label(label);
            self.compile_case_body(case, bc);
        }

        bc.label(break_label);
        self.close_scope(bc, true);
        self.break_labels.pop();
        Ok(())
    }

    /// The constant value of a `case` label, converted to the selector type.
    fn compile_case_value(&mut self, case: NodeId, to: DataType) -> CResult<i64> {
        let Some(value_node) = self.cst.first_child(case).filter(|&n| self.kind(n) == NodeKind::Expression) else {
            return Err(self.error(case, "Expected case value"));
        };
        let mut c = ExprContext::new();
        self.compile_expression(value_node, &mut c)?;
        if !c.ty.is_constant {
            return Err(self.error(value_node, "Case expressions must be constants"));
        }
        if !c.ty.data_type.is_integral_type() {
            return Err(self.error(value_node, "Switch expression must be an integral type"));
        }
        self.implicit_conversion(&mut c, to, value_node, false, true, &[])?;
        Ok(if to.is_integer_type() {
            i64::from(c.ty.int_value())
        } else {
            i64::from(c.ty.dword_value())
        })
    }

    /// Jump to the label of the case matching the selector in slot `sel`.
    fn emit_case_dispatch(&mut self, values: &[CaseValue], sel: i16, cmp: OpCode, default: u32, bc: &mut ByteCode) {
        let Some(last) = values.last() else {
            return;
        };

        // Anything above the largest value goes to default.
        self.compare_with(sel, last.value, cmp, OpCode::JP, default, bc);

        let gap = i64::from(self.config.switch_range_gap);
        let mut ranges: Vec<&[CaseValue]> = Vec::new();
        let mut start = 0;
        for n in 1..values.len() {
            if values[n].value > values[n - 1].value + gap {
                ranges.push(&values[start..n]);
                start = n;
            }
        }
        ranges.push(&values[start..]);

        let table_min = self.config.switch_table_min_cases;
        let range_count = ranges.len();
        for (r, range) in ranges.into_iter().enumerate() {
            let (Some(first), Some(hi)) = (range.first(), range.last()) else {
                continue;
            };
            if range.len() < table_min {
                for case in range {
                    self.compare_with(sel, case.value, cmp, OpCode::JZ, case.label, bc);
                }
                continue;
            }

            let min = first.value;
            self.compare_with(sel, min, cmp, OpCode::JS, default, bc);
            let next_range = self.next_label();
            if r + 1 < range_count {
                self.compare_with(sel, hi.value, cmp, OpCode::JP, next_range, bc);
            }

            let tmp = self.allocate(DataType::int(), true);
            bc.instr_w_dword(OpCode::SetV4, tmp, min as u32);
            bc.instr_w_w_w(OpCode::SUBi, tmp, sel, tmp);
            self.release_temporary_offset(tmp, bc);
            bc.jmpp(tmp, (hi.value - min) as u32);

            let mut cases = range.iter().peekable();
            for v in min..=hi.value {
                match cases.next_if(|c| c.value == v) {
                    Some(case) => bc.jump(OpCode::JMP, case.label),
                    None => bc.jump(OpCode::JMP, default),
                }
            }
            bc.label(next_range);
        }
    }

    /// `SetV4 tmp, value ; CMP sel, tmp ; jump label`
    fn compare_with(&mut self, sel: i16, value: i64, cmp: OpCode, jump: OpCode, label: u32, bc: &mut ByteCode) {
        let tmp = self.allocate(DataType::int(), true);
        bc.instr_w_dword(OpCode::SetV4, tmp, value as u32);
        bc.instr_w_w(cmp, sel, tmp);
        bc.jump(jump, label);
        self.release_temporary_offset(tmp, bc);
    }

    /// Statements of one case. Control falls through into the next case.
    fn compile_case_body(&mut self, case: NodeId, bc: &mut ByteCode) {
        let statements: Vec<NodeId> = self
            .cst
            .children(case)
            .filter(|&n| self.kind(n) != NodeKind::Expression)
            .collect();

        let mut is_finished = false;
        for node in statements {
            if is_finished {
                self.warning(node, "Unreachable code");
                break;
            }
            let mut statement = ByteCode::new();
            if self.compile_statement(node, &mut statement)
                || matches!(self.kind(node), NodeKind::Break | NodeKind::Continue)
            {
                is_finished = true;
            }
            self.line_instr(bc, node);
            bc.add_code(statement);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok};

    #[test]
    fn dense_cases_use_a_jump_table() {
        let module = build_ok(
            "int f(int a) { switch (a) { case 1: return 10; case 2: return 20; case 3: return 30; case 5: return 50; } return 0; }",
        );
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::CMPi, OpCode::JP, OpCode::CMPi, OpCode::JS, OpCode::SUBi, OpCode::JMPP]);
        let table = f.instructions.iter().find(|i| i.op == OpCode::JMPP).unwrap();
        assert_eq!(table.arg, 4);
    }

    #[test]
    fn few_cases_use_comparisons() {
        let module = build_ok("int f(int a) { switch (a) { case 1: return 10; case 100: return 20; } return 0; }");
        let f = module.function("f").unwrap();
        assert_eq!(f.count_op(OpCode::JMPP), 0);
        assert_eq!(f.count_op(OpCode::JZ), 2);
    }

    #[test]
    fn default_must_be_last() {
        let (_, diags) = build("void f(int a) { switch (a) { default: break; case 1: break; } }");
        assert!(diags.errors().any(|d| d.message == "The default case must be the last one"));
    }

    #[test]
    fn case_values_must_be_constant() {
        let (_, diags) = build("void f(int a, int b) { switch (a) { case b: break; } }");
        assert!(diags.errors().any(|d| d.message == "Case expressions must be constants"));
    }

    #[test]
    fn duplicate_values_are_rejected() {
        let (_, diags) = build("void f(int a) { switch (a) { case 1: break; case 1: break; } }");
        assert!(diags.errors().any(|d| d.message == "Duplicate switch case"));
    }

    #[test]
    fn selector_must_be_integral() {
        let (_, diags) = build("void f(float a) { switch (a) { case 1: break; } }");
        assert!(diags.errors().any(|d| d.message == "Switch expression must be an integral type"));
    }

    #[test]
    fn unsigned_selector_compares_unsigned() {
        let module = build_ok("uint f(uint a) { switch (a) { case 1: return 2; } return 0; }");
        let f = module.function("f").unwrap();
        assert!(f.count_op(OpCode::CMPu) > 0);
        assert_eq!(f.count_op(OpCode::CMPi), 0);
    }

    #[test]
    fn statements_after_break_warn() {
        let (_, diags) = build("void f(int a) { switch (a) { case 1: break; a = 2; } }");
        assert!(diags.warnings().any(|d| d.message == "Unreachable code"));
    }

    #[test]
    fn empty_switch_only_evaluates_the_selector() {
        build_ok("void f(int a) { switch (a) { } }");
    }

    #[test]
    fn negative_case_values() {
        build_ok("int f(int a) { switch (a) { case -1: return 1; case 0: return 2; case 1: return 3; } return 0; }");
    }
}
