//! Expressions.
//!
//! The parser keeps binary expressions flat (`term op term op term ...`);
//! [`Compiler::compile_expression`] rebuilds the operator tree by
//! precedence before compiling it left to right.

mod function_call;
mod operators;
mod unary;
mod value;

use vxscript_core::{DataType, Operator};
use vxscript_parser::{NodeId, NodeKind, TokenKind};

use super::{CResult, Compiler, ExprContext, TypeInfo};
use crate::bytecode::OpCode;

/// Binary expression rebuilt from the flat operand/operator sequence.
#[derive(Debug)]
enum ExprTree {
    Term(NodeId),
    Binary {
        op: NodeId,
        lhs: Box<ExprTree>,
        rhs: Box<ExprTree>,
    },
}

impl Compiler<'_, '_> {
    pub(crate) fn token(&self, node: NodeId) -> Option<TokenKind> {
        self.cst.get(node).token
    }

    /// `Condition (ExprOperator Assignment)?`
    pub(crate) fn compile_assignment(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let Some(lexpr) = self.cst.first_child(node) else {
            return Err(self.error(node, "Expected expression"));
        };
        let Some(op_node) = self.cst.next_sibling(lexpr) else {
            return self.compile_condition(lexpr, ctx);
        };

        if self.is_global_expression {
            return Err(self.error(node, "Assignment in global expression"));
        }
        let op = self.token(op_node).and_then(TokenKind::assign_operator);
        let (Some(op), Some(rexpr)) = (op, self.cst.next_sibling(op_node)) else {
            return Err(self.error(op_node, "Expected assignment operator"));
        };

        // The right hand side is evaluated first.
        let mut rctx = ExprContext::new();
        self.compile_assignment(rexpr, &mut rctx)?;
        let mut lctx = ExprContext::new();
        self.compile_condition(lexpr, &mut lctx)?;

        self.do_assignment(ctx, &mut lctx, &mut rctx, lexpr, rexpr, op, op_node)
    }

    /// `Expression (Assignment Assignment)?`, the ternary operator.
    pub(crate) fn compile_condition(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let Some(cexpr) = self.cst.first_child(node) else {
            return Err(self.error(node, "Expected expression"));
        };
        let Some(true_node) = self.cst.next_sibling(cexpr) else {
            return self.compile_expression(cexpr, ctx);
        };
        let Some(false_node) = self.cst.next_sibling(true_node) else {
            return Err(self.error(true_node, "Expected ':'"));
        };

        let mut e = ExprContext::new();
        self.compile_expression(cexpr, &mut e)?;
        if !e.ty.data_type.equal_except_ref_and_const(&DataType::bool()) {
            return Err(self.error(cexpr, "Expression must be of boolean type"));
        }
        if e.ty.data_type.is_reference {
            self.convert_to_variable(&mut e);
        }
        self.process_deferred_params(&mut e)?;

        let mut le = ExprContext::new();
        self.compile_assignment(true_node, &mut le)?;
        let mut re = ExprContext::new();
        self.compile_assignment(false_node, &mut re)?;

        let is_explicit_handle = le.ty.is_explicit_handle || re.ty.is_explicit_handle;

        // A literal 0 takes the type of the other branch.
        if is_zero_constant(&le.ty) && re.ty.data_type.is_primitive() {
            let to = re.ty.data_type.with_reference(false).with_read_only(true);
            self.implicit_conversion_constant(&mut le, to, true_node, false);
        } else if is_zero_constant(&re.ty) && le.ty.data_type.is_primitive() {
            let to = le.ty.data_type.with_reference(false).with_read_only(true);
            self.implicit_conversion_constant(&mut re, to, false_node, false);
        }

        // Null takes the type of the other branch.
        if le.ty.is_null_constant() && re.ty.data_type.is_object_handle() {
            le.ty.data_type = re.ty.data_type.with_reference(false);
        } else if re.ty.is_null_constant() && le.ty.data_type.is_object_handle() {
            re.ty.data_type = le.ty.data_type.with_reference(false);
        }

        if !le.ty.data_type.equal_except_ref_and_const(&re.ty.data_type) {
            return Err(self.error(true_node, "Both expressions must have the same type"));
        }

        let dt = le.ty.data_type.with_reference(false).with_read_only(false);
        let used = e.bc.vars_used();
        let offset = self.allocate_not_in(dt, true, &used);
        let mut temp = TypeInfo::variable(dt, offset, true);
        temp.is_explicit_handle = is_explicit_handle;

        self.compile_constructor(dt, offset, &mut ctx.bc);

        let else_label = self.next_label();
        let after_label = self.next_label();

        ctx.merge(&mut e);
        ctx.ty = e.ty;
        self.convert_to_variable(ctx);
        ctx.bc.instr_w(OpCode::CpyVtoR4, ctx.ty.stack_offset);
        ctx.bc.jump(OpCode::JZ, else_label);
        self.release_temporary(&mut ctx.ty, &mut ctx.bc);

        self.compile_branch_into(ctx, &mut le, temp, true_node)?;
        ctx.bc.jump(OpCode::JMP, after_label);
        ctx.bc.label(else_label);
        self.compile_branch_into(ctx, &mut re, temp, false_node)?;
        ctx.bc.label(after_label);

        ctx.ty = temp;
        if !dt.is_primitive() {
            ctx.bc.instr_w(OpCode::PSF, offset);
            ctx.ty.data_type.is_reference = true;
        }
        Ok(())
    }

    /// Assign one branch of `?:` to the shared temporary.
    fn compile_branch_into(
        &mut self,
        ctx: &mut ExprContext,
        branch: &mut ExprContext,
        temp: TypeInfo,
        node: NodeId,
    ) -> CResult {
        self.prepare_for_assignment(temp.data_type, branch, node, &[])?;
        ctx.merge(branch);

        let mut lvalue = temp;
        let is_object = !temp.data_type.is_primitive();
        if is_object {
            ctx.bc.instr_w(OpCode::PSF, temp.stack_offset);
            lvalue.data_type.is_reference = true;
            lvalue.is_explicit_handle |= temp.data_type.is_object_handle();
        }
        self.perform_assignment(&mut lvalue, &branch.ty, &mut ctx.bc, node)?;
        if is_object {
            ctx.bc.pop(1);
        }
        self.release_temporary(&mut branch.ty, &mut ctx.bc);
        Ok(())
    }

    /// `ExprTerm (ExprOperator ExprTerm)*`
    pub(crate) fn compile_expression(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let tree = self.expression_tree(node)?;
        self.compile_expression_tree(&tree, ctx)
    }

    /// Shunting-yard over the flat children of an `Expression` node. Terms
    /// bind tightest and operators of equal precedence associate left.
    fn expression_tree(&mut self, node: NodeId) -> CResult<ExprTree> {
        let mut output: Vec<ExprTree> = Vec::new();
        let mut operators: Vec<(NodeId, i32)> = Vec::new();

        let reduce = |output: &mut Vec<ExprTree>, op: NodeId| -> bool {
            let (Some(rhs), Some(lhs)) = (output.pop(), output.pop()) else {
                return false;
            };
            output.push(ExprTree::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
            true
        };

        let children: Vec<NodeId> = self.cst.children(node).collect();
        for child in children {
            if self.kind(child) != NodeKind::ExprOperator {
                output.push(ExprTree::Term(child));
                continue;
            }
            let Some(prec) = self.binary_operator(child).and_then(Operator::precedence) else {
                return Err(self.error(child, "Expected binary operator"));
            };
            while let Some(&(top, top_prec)) = operators.last() {
                if prec > top_prec {
                    break;
                }
                operators.pop();
                if !reduce(&mut output, top) {
                    return Err(self.error(top, "Expected expression"));
                }
            }
            operators.push((child, prec));
        }
        while let Some((top, _)) = operators.pop() {
            if !reduce(&mut output, top) {
                return Err(self.error(top, "Expected expression"));
            }
        }

        match (output.pop(), output.is_empty()) {
            (Some(tree), true) => Ok(tree),
            _ => Err(self.error(node, "Expected expression")),
        }
    }

    fn compile_expression_tree(&mut self, tree: &ExprTree, ctx: &mut ExprContext) -> CResult {
        match tree {
            ExprTree::Term(node) => self.compile_expression_term(*node, ctx),
            ExprTree::Binary { op, lhs, rhs } => {
                let mut lctx = ExprContext::new();
                self.compile_expression_tree(lhs, &mut lctx)?;
                let mut rctx = ExprContext::new();
                self.compile_expression_tree(rhs, &mut rctx)?;
                let Some(operator) = self.binary_operator(*op) else {
                    return Err(self.error(*op, "Expected binary operator"));
                };
                self.compile_operator(*op, operator, &mut lctx, &mut rctx, ctx)
            }
        }
    }

    fn binary_operator(&self, node: NodeId) -> Option<Operator> {
        self.token(node).and_then(TokenKind::binary_operator)
    }

    /// `ExprPreOp* ExprValue ExprPostOp*`. Postfix operators bind tighter
    /// than prefix ones.
    pub(crate) fn compile_expression_term(&mut self, node: NodeId, ctx: &mut ExprContext) -> CResult {
        let children: Vec<NodeId> = self.cst.children(node).collect();
        let Some(value_pos) = children.iter().position(|&c| self.kind(c) == NodeKind::ExprValue) else {
            return Err(self.error(node, "Expected expression value"));
        };

        let mut v = ExprContext::new();
        self.compile_expression_value(children[value_pos], &mut v)?;

        for &post in &children[value_pos + 1..] {
            self.compile_expression_post_op(post, &mut v)?;
        }
        for &pre in children[..value_pos].iter().rev() {
            self.compile_expression_pre_op(pre, &mut v)?;
        }

        ctx.merge(&mut v);
        ctx.ty = v.ty;
        ctx.node = Some(node);
        Ok(())
    }
}

fn is_zero_constant(ty: &TypeInfo) -> bool {
    ty.is_constant && ty.data_type.is_unsigned_type() && ty.value == 0
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok};

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let module = build_ok("int f(int a, int b, int c) { return a + b * c; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::MULi, OpCode::ADDi]);
    }

    #[test]
    fn equal_precedence_associates_left() {
        let module = build_ok("int f(int a, int b, int c) { return a - b + c; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::SUBi, OpCode::ADDi]);
    }

    #[test]
    fn constant_expression_folds_completely() {
        let module = build_ok("int f() { return 2 + 3 * 4; }");
        let f = module.function("f").unwrap();
        assert_eq!(f.count_op(OpCode::ADDi), 0);
        assert_eq!(f.count_op(OpCode::MULi), 0);
        let set = f.instructions.iter().find(|i| i.op == OpCode::SetV4).unwrap();
        assert_eq!(set.arg, 14);
    }

    #[test]
    fn ternary_jumps_over_branches() {
        let module = build_ok("int f(bool c) { return c ? 1 : 2; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::CpyVtoR4, OpCode::JZ, OpCode::JMP]);
        assert_eq!(f.count_op(OpCode::SetV4), 2);
    }

    #[test]
    fn ternary_condition_must_be_bool() {
        let (_, diags) = build("int f(int c) { return c ? 1 : 2; }");
        assert!(diags.errors().any(|d| d.message == "Expression must be of boolean type"));
    }

    #[test]
    fn ternary_branches_must_agree() {
        let (_, diags) = build("void f(bool c) { float x = c ? 1.0f : true; }");
        assert!(diags.errors().any(|d| d.message == "Both expressions must have the same type"));
    }

    #[test]
    fn ternary_zero_takes_other_type() {
        build_ok("float f(bool c) { return c ? 0 : 1.5f; }");
    }

    #[test]
    fn assignment_is_rejected_in_global_initializer() {
        let (_, diags) = build("int a; int b = (a = 3);");
        assert!(diags.errors().any(|d| d.message == "Assignment in global expression"));
    }

    #[test]
    fn chained_assignment_compiles() {
        let module = build_ok("void f() { int a; int b; a = b = 3; }");
        let f = module.function("f").unwrap();
        assert!(f.count_op(OpCode::CpyVtoV4) >= 1);
    }
}
