//! Return statements.

use vxscript_core::RefModifier;
use vxscript_parser::NodeId;

use super::super::{CResult, Compiler, ExprContext};
use crate::bytecode::{ByteCode, OpCode};

impl Compiler<'_, '_> {
    /// Compile `return [expr];`.
    ///
    /// Primitive results are returned in the value register, objects in the
    /// object register. All locals are destroyed before jumping to the
    /// function exit.
    pub(crate) fn compile_return(&mut self, node: NodeId, bc: &mut ByteCode) -> CResult {
        let return_type = self.return_type;
        let expr = self.cst.first_child(node);

        if return_type.size_on_stack_dwords() == 0 {
            if expr.is_some() {
                return Err(self.error(node, "Can't return a value when return type is 'void'"));
            }
        } else {
            let Some(expr) = expr else {
                return Err(self.error(node, "Must return a value"));
            };
            let mut ctx = ExprContext::new();
            self.compile_assignment(expr, &mut ctx)?;
            self.is_variable_initialized(&ctx.ty, expr);

            if return_type.is_primitive() {
                self.return_primitive(node, expr, &mut ctx)?;
            } else {
                self.prepare_argument(return_type, RefModifier::None, &mut ctx, expr, false, &[])?;
                ctx.bc.pop(1);
                ctx.bc.instr_w(OpCode::LOADOBJ, ctx.ty.stack_offset);
                // The slot no longer holds the object.
                self.deallocate(ctx.ty.stack_offset);
                ctx.ty.is_temporary = false;
            }
            self.release_temporary(&mut ctx.ty, &mut ctx.bc);
            bc.add_code(ctx.bc);
        }

        self.destroy_locals_until(bc, |_| false);
        bc.jump(OpCode::JMP, 0);
        Ok(())
    }

    fn return_primitive(&mut self, node: NodeId, expr: NodeId, ctx: &mut ExprContext) -> CResult {
        let return_type = self.return_type;
        if ctx.ty.data_type.is_reference {
            self.convert_to_variable(ctx);
        }
        self.implicit_conversion(ctx, return_type, expr, false, true, &[])?;
        if !ctx.ty.data_type.equal_except_ref_and_const(&return_type) {
            let from = self.type_name(&ctx.ty.data_type);
            let to = self.type_name(&return_type);
            return Err(self.error(node, format!("No conversion from '{from}' to '{to}' available.")));
        }

        self.convert_to_variable(ctx);
        // Output parameters are written back before the register is loaded.
        self.process_deferred_params(ctx)?;
        let op = if return_type.size_on_stack_dwords() == 1 {
            OpCode::CpyVtoR4
        } else {
            OpCode::CpyVtoR8
        };
        ctx.bc.instr_w(op, ctx.ty.stack_offset);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok};

    #[test]
    fn double_return_uses_the_wide_register() {
        let module = build_ok("double f(double a) { return a; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::CpyVtoR8, OpCode::RET]);
    }

    #[test]
    fn int_is_converted_to_the_return_type() {
        let module = build_ok("float f(int a) { return a; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::ItoF, OpCode::CpyVtoR4]);
    }

    #[test]
    fn missing_value_is_reported() {
        let (_, diags) = build("int f() { return; }");
        assert!(diags.errors().any(|d| d.message == "Must return a value"));
        assert!(!diags.errors().any(|d| d.message == "Not all paths return a value"));
    }

    #[test]
    fn void_function_cannot_return_a_value() {
        let (_, diags) = build("void f() { return 1; }");
        assert!(diags.errors().any(|d| d.message == "Can't return a value when return type is 'void'"));
    }

    #[test]
    fn bool_does_not_convert_to_int() {
        let (_, diags) = build("int f(bool b) { return b; }");
        assert!(diags.errors().any(|d| d.message == "No conversion from 'bool' to 'int' available."));
    }

    #[test]
    fn struct_is_returned_in_the_object_register() {
        let module = build_ok("struct P { int x; } P f() { P p; return p; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::CALLSYS, OpCode::LOADOBJ, OpCode::JMP]);
    }

    #[test]
    fn early_return_frees_locals() {
        let module = build_ok("struct P { int x; } void f(bool b) { P p; if (b) return; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::JZ, OpCode::PSF, OpCode::FREE, OpCode::JMP]);
    }
}
