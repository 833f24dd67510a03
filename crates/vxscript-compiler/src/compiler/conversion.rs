//! Implicit conversions and value placement.
//!
//! Conversions either only relabel the value's type (`generate_code` off,
//! used while ranking overloads) or also emit the instructions that change
//! the representation. Constants are folded at compile time.

use vxscript_core::{DataType, PrimitiveKind};
use vxscript_parser::NodeId;

use super::{CResult, Compiler, ExprContext, TypeInfo};
use crate::bytecode::{ByteCode, OpCode};

impl Compiler<'_, '_> {
    /// Convert `ctx` towards `to` where an implicit conversion exists. The
    /// caller checks the resulting type; no error is raised for a missing
    /// conversion.
    pub(crate) fn implicit_conversion(
        &mut self,
        ctx: &mut ExprContext,
        to: DataType,
        node: NodeId,
        is_explicit: bool,
        generate_code: bool,
        reserved: &[i16],
    ) -> CResult {
        if to.is_primitive() {
            self.implicit_to_primitive(ctx, to, node, is_explicit, generate_code, reserved)
        } else {
            self.implicit_to_object(ctx, to, node, is_explicit, generate_code, reserved)
        }
    }

    fn implicit_to_primitive(
        &mut self,
        ctx: &mut ExprContext,
        to: DataType,
        node: NodeId,
        is_explicit: bool,
        generate_code: bool,
        reserved: &[i16],
    ) -> CResult {
        if !ctx.ty.data_type.is_primitive() {
            return Ok(());
        }
        if ctx.ty.data_type.is_reference {
            if generate_code {
                self.convert_to_variable_not_in(ctx, reserved);
            } else {
                ctx.ty.data_type.is_reference = false;
            }
        }

        if ctx.ty.is_constant {
            self.implicit_conversion_constant(ctx, to, node, is_explicit);
        }

        // Same family, different width.
        let size = to.size_in_memory_bytes();
        if size != ctx.ty.data_type.size_in_memory_bytes()
            && let Some(kind) = ctx.ty.data_type.primitive_kind().and_then(|k| k.with_size(size))
        {
            ctx.ty.data_type = ctx.ty.data_type.with_kind(kind);
        }

        let Some(to_kind) = to.primitive_kind() else {
            return Ok(());
        };
        let from = ctx.ty.data_type;

        if !generate_code {
            let relabel = to.is_integer_type()
                || to.is_unsigned_type()
                || (to.is_bit_vector_type() && (from.is_integer_type() || from.is_unsigned_type()))
                || ((to.is_float_type() || to.is_double_type()) && !from.is_bit_vector_type() && !from.is_bool_type());
            if relabel && !from.is_bool_type() {
                ctx.ty.data_type = from.with_kind(to_kind);
            }
            ctx.ty.data_type.is_read_only = to.is_read_only;
            return Ok(());
        }

        if to.is_integer_type() {
            if from.is_unsigned_type() || from.is_bit_vector_type() {
                ctx.ty.data_type = from.with_kind(to_kind);
            } else if from.is_float_type() {
                self.convert_to_temp_variable(ctx, node)?;
                ctx.bc.instr_w(OpCode::FtoI, ctx.ty.stack_offset);
                ctx.ty.data_type = ctx.ty.data_type.with_kind(to_kind);
            } else if from.is_double_type() {
                self.convert_into_new_variable(ctx, to, OpCode::DtoI, node, reserved)?;
            }
        } else if to.is_unsigned_type() {
            if from.is_integer_type() || from.is_bit_vector_type() {
                ctx.ty.data_type = from.with_kind(to_kind);
            } else if from.is_float_type() {
                self.convert_to_temp_variable(ctx, node)?;
                ctx.bc.instr_w(OpCode::FtoU, ctx.ty.stack_offset);
                ctx.ty.data_type = ctx.ty.data_type.with_kind(to_kind);
            } else if from.is_double_type() {
                self.convert_into_new_variable(ctx, to, OpCode::DtoU, node, reserved)?;
            }
        } else if to.is_bit_vector_type() {
            if from.is_integer_type() || from.is_unsigned_type() {
                ctx.ty.data_type = from.with_kind(to_kind);
            }
        } else if to.is_float_type() {
            if from.is_integer_type() {
                self.convert_to_temp_variable(ctx, node)?;
                ctx.bc.instr_w(OpCode::ItoF, ctx.ty.stack_offset);
                ctx.ty.data_type = ctx.ty.data_type.with_kind(PrimitiveKind::Float);
            } else if from.is_unsigned_type() {
                self.convert_to_temp_variable(ctx, node)?;
                ctx.bc.instr_w(OpCode::UtoF, ctx.ty.stack_offset);
                ctx.ty.data_type = ctx.ty.data_type.with_kind(PrimitiveKind::Float);
            } else if from.is_double_type() {
                self.convert_into_new_variable(ctx, to, OpCode::DtoF, node, reserved)?;
            }
        } else if to.is_double_type() {
            if from.is_integer_type() {
                self.convert_into_new_variable(ctx, to, OpCode::ItoD, node, reserved)?;
            } else if from.is_unsigned_type() {
                self.convert_into_new_variable(ctx, to, OpCode::UtoD, node, reserved)?;
            } else if from.is_float_type() {
                self.convert_into_new_variable(ctx, to, OpCode::FtoD, node, reserved)?;
            }
        }

        ctx.ty.data_type.is_read_only = to.is_read_only;
        Ok(())
    }

    /// Conversions that change the slot size write into a fresh temporary.
    fn convert_into_new_variable(
        &mut self,
        ctx: &mut ExprContext,
        to: DataType,
        op: OpCode,
        node: NodeId,
        reserved: &[i16],
    ) -> CResult {
        self.convert_to_temp_variable(ctx, node)?;
        let source = ctx.ty.stack_offset;
        self.release_temporary(&mut ctx.ty, &mut ctx.bc);
        let to = to.with_reference(false).with_read_only(false);
        let offset = self.allocate_not_in(to, true, reserved);
        ctx.bc.instr_w_w(op, offset, source);
        ctx.ty.set_variable(to, offset, true);
        Ok(())
    }

    fn implicit_to_object(
        &mut self,
        ctx: &mut ExprContext,
        to: DataType,
        node: NodeId,
        is_explicit: bool,
        generate_code: bool,
        reserved: &[i16],
    ) -> CResult {
        if ctx.ty.is_null_constant() {
            if to.is_object_handle() {
                ctx.ty.data_type = to;
            }
            return Ok(());
        }
        if !ctx.ty.data_type.is_object() || ctx.ty.data_type.object_hash() != to.object_hash() {
            return Ok(());
        }

        if to.is_object_handle() {
            if !ctx.ty.data_type.is_object_handle() && self.behaviours(&ctx.ty.data_type).supports_handles() {
                ctx.ty.data_type.is_handle = true;
            }
            if ctx.ty.data_type.is_object_handle() {
                ctx.ty.data_type.is_read_only = to.is_read_only;
            }
        }

        if !to.is_reference {
            if ctx.ty.data_type.is_reference {
                self.dereference(ctx, generate_code);
            }
            if to.is_object_handle() {
                if ctx.ty.data_type.is_read_only && !to.is_read_only && is_explicit {
                    let from = self.type_name(&ctx.ty.data_type);
                    let to = self.type_name(&to);
                    return Err(self.error(node, format!("Can't implicitly convert from '{from}' to '{to}'.")));
                }
            } else if ctx.ty.data_type.is_object_handle() && !ctx.ty.is_explicit_handle {
                if ctx.ty.data_type.is_reference {
                    if generate_code {
                        ctx.bc.instr(OpCode::RDS4);
                    }
                    ctx.ty.data_type.is_reference = false;
                }
                if generate_code {
                    ctx.bc.instr(OpCode::CHKREF);
                }
                ctx.ty.data_type.is_handle = false;
            }
            return Ok(());
        }

        if ctx.ty.data_type.is_reference {
            // A reference to a handle reads as a reference to the object.
            if !to.is_object_handle() && ctx.ty.data_type.is_object_handle() && !ctx.ty.is_explicit_handle {
                ctx.ty.data_type.is_handle = false;
                if generate_code {
                    ctx.bc.instr(OpCode::ChkRefS);
                }
            }
            if to.is_read_only {
                ctx.ty.data_type.is_read_only = true;
            } else if ctx.ty.data_type.is_read_only {
                // A const object passed as mutable goes through a copy.
                ctx.ty.data_type.is_read_only = false;
                if generate_code {
                    let dt = ctx.ty.data_type.with_reference(false);
                    let offset = self.allocate_not_in(dt, true, reserved);
                    let mut rctx = ExprContext::with_type(ctx.ty);
                    rctx.bc = ctx.take_code();
                    rctx.deferred = std::mem::take(&mut ctx.deferred);
                    self.compile_constructor(dt, offset, &mut ctx.bc);

                    let mut lctx = ExprContext::with_type(TypeInfo::variable(dt.with_reference(true), offset, true));
                    lctx.bc.instr_w(OpCode::PSF, offset);
                    self.do_assignment(ctx, &mut lctx, &mut rctx, node, node, vxscript_core::Operator::Assign, node)?;
                }
            }
            return Ok(());
        }

        if generate_code {
            let dt = ctx.ty.data_type.with_reference(false);
            let offset = self.allocate_not_in(dt, true, reserved);
            let mut temp = TypeInfo::variable(dt, offset, true);
            temp.is_explicit_handle = dt.is_object_handle();

            // The constructor runs before the value is evaluated.
            let mut ctor = ByteCode::new();
            self.compile_constructor(dt, offset, &mut ctor);
            ctx.bc.prepend(ctor);

            temp.data_type.is_reference = true;
            self.prepare_for_assignment(temp.data_type, ctx, node, reserved)?;
            ctx.bc.instr_w(OpCode::PSF, offset);
            let mut lvalue = temp;
            self.perform_assignment(&mut lvalue, &ctx.ty, &mut ctx.bc, node)?;
            ctx.bc.pop(ctx.ty.data_type.size_on_stack_dwords());
            self.release_temporary(&mut ctx.ty, &mut ctx.bc);
            ctx.bc.instr_w(OpCode::PSF, offset);
            ctx.ty = temp;
        }
        ctx.ty.data_type.is_reference = true;
        ctx.ty.data_type.is_read_only = to.is_read_only;
        Ok(())
    }

    /// Fold the conversion of a constant to another primitive type.
    pub(crate) fn implicit_conversion_constant(
        &mut self,
        ctx: &mut ExprContext,
        to: DataType,
        node: NodeId,
        is_explicit: bool,
    ) {
        let from = ctx.ty.data_type;
        if !ctx.ty.is_constant || to.equal_except_ref_and_const(&from) || from.is_reference || !to.is_primitive() {
            return;
        }
        let Some(to_kind) = to.primitive_kind() else {
            return;
        };
        let warn = !is_explicit;

        if to.is_integer_type() {
            if from.is_float_type() || from.is_double_type() {
                let (ic, exact) = if from.is_float_type() {
                    let fc = ctx.ty.float_value();
                    let ic = fc as i32;
                    (ic, ic as f32 == fc)
                } else {
                    let dc = ctx.ty.double_value();
                    let ic = dc as i32;
                    (ic, ic as f64 == dc)
                };
                if !exact && warn {
                    let text = self.not_exact(&ctx.ty, ic.to_string());
                    self.warning(node, text);
                }
                self.replace_constant(ctx, PrimitiveKind::Int32, ic as u32);
                self.implicit_conversion_constant(ctx, to, node, is_explicit);
            } else if from.is_unsigned_type() {
                let value = ctx.ty.dword_value();
                if (value as i32) < 0 && warn {
                    self.warning(node, "Implicit conversion changed sign of value");
                }
                self.replace_constant(ctx, PrimitiveKind::Int32, value);
                self.implicit_conversion_constant(ctx, to, node, is_explicit);
            } else if from.is_bit_vector_type() {
                let value = ctx.ty.dword_value();
                self.replace_constant(ctx, PrimitiveKind::Int32, value);
                self.implicit_conversion_constant(ctx, to, node, is_explicit);
            } else if from.is_integer_type() {
                let value = ctx.ty.int_value();
                let narrowed = match to_kind {
                    PrimitiveKind::Int8 => value as i8 as i32,
                    PrimitiveKind::Int16 => value as i16 as i32,
                    _ => value,
                };
                if narrowed != value && warn {
                    self.warning(node, "Value is too large for data type");
                }
                self.replace_constant(ctx, to_kind, narrowed as u32);
            }
        } else if to.is_unsigned_type() {
            if from.is_float_type() || from.is_double_type() {
                let (uc, exact) = if from.is_float_type() {
                    let fc = ctx.ty.float_value();
                    let uc = fc as u32;
                    (uc, uc as f32 == fc)
                } else {
                    let dc = ctx.ty.double_value();
                    let uc = dc as u32;
                    (uc, uc as f64 == dc)
                };
                if !exact && warn {
                    let text = self.not_exact(&ctx.ty, uc.to_string());
                    self.warning(node, text);
                }
                self.replace_constant(ctx, PrimitiveKind::UInt32, uc);
                self.implicit_conversion_constant(ctx, to, node, is_explicit);
            } else if from.is_integer_type() {
                let value = ctx.ty.int_value();
                if value < 0 && warn {
                    self.warning(node, "Implicit conversion changed sign of value");
                }
                self.replace_constant(ctx, PrimitiveKind::UInt32, value as u32);
                self.implicit_conversion_constant(ctx, to, node, is_explicit);
            } else if from.is_bit_vector_type() {
                let value = ctx.ty.dword_value();
                self.replace_constant(ctx, PrimitiveKind::UInt32, value);
                self.implicit_conversion_constant(ctx, to, node, is_explicit);
            } else if from.is_unsigned_type() {
                let value = ctx.ty.dword_value();
                let narrowed = truncate_unsigned(value, to_kind);
                if narrowed != value && warn {
                    self.warning(node, "Value is too large for data type");
                }
                self.replace_constant(ctx, to_kind, narrowed);
            }
        } else if to.is_float_type() {
            if from.is_double_type() {
                let dc = ctx.ty.double_value();
                let fc = dc as f32;
                if fc as f64 != dc && warn {
                    self.warning(node, "Possible loss of precision");
                }
                self.replace_constant(ctx, PrimitiveKind::Float, fc.to_bits());
            } else if from.is_integer_type() {
                let ic = ctx.ty.int_value();
                let fc = ic as f32;
                if fc as i32 != ic && warn {
                    let text = self.not_exact(&ctx.ty, fc.to_string());
                    self.warning(node, text);
                }
                self.replace_constant(ctx, PrimitiveKind::Float, fc.to_bits());
            } else if from.is_unsigned_type() {
                let uc = ctx.ty.dword_value();
                let fc = uc as f32;
                if fc as u32 != uc && warn {
                    let text = self.not_exact(&ctx.ty, fc.to_string());
                    self.warning(node, text);
                }
                self.replace_constant(ctx, PrimitiveKind::Float, fc.to_bits());
            }
        } else if to.is_double_type() {
            let dc = if from.is_float_type() {
                Some(ctx.ty.float_value() as f64)
            } else if from.is_integer_type() {
                Some(ctx.ty.int_value() as f64)
            } else if from.is_unsigned_type() {
                Some(ctx.ty.dword_value() as f64)
            } else {
                None
            };
            if let Some(dc) = dc {
                ctx.ty.set_constant(DataType::primitive(PrimitiveKind::Double), dc.to_bits());
            }
        } else if to.is_bit_vector_type() {
            if from.is_integer_type() {
                let value = ctx.ty.int_value() as u32;
                self.replace_constant(ctx, PrimitiveKind::Bits32, value);
                self.implicit_conversion_constant(ctx, to, node, is_explicit);
            } else if from.is_unsigned_type() {
                let value = ctx.ty.dword_value();
                self.replace_constant(ctx, PrimitiveKind::Bits32, value);
                self.implicit_conversion_constant(ctx, to, node, is_explicit);
            } else if from.is_bit_vector_type() {
                let value = ctx.ty.dword_value();
                let narrowed = truncate_unsigned(value, to_kind);
                if narrowed != value && warn {
                    self.warning(node, "Value is too large for data type");
                }
                self.replace_constant(ctx, to_kind, narrowed);
            }
        }
    }

    fn replace_constant(&self, ctx: &mut ExprContext, kind: PrimitiveKind, value: u32) {
        let is_read_only = ctx.ty.data_type.is_read_only;
        ctx.ty
            .set_constant(DataType::primitive(kind).with_read_only(is_read_only), value as u64);
    }

    fn not_exact(&self, from: &TypeInfo, to: String) -> String {
        let from = if from.data_type.is_float_type() {
            from.float_value().to_string()
        } else if from.data_type.is_double_type() {
            from.double_value().to_string()
        } else if from.data_type.is_unsigned_type() {
            from.dword_value().to_string()
        } else {
            from.int_value().to_string()
        };
        format!("Implicit conversion of value {from} to {to} is not exact")
    }

    // ==========================================================================
    // Placement
    // ==========================================================================

    pub(crate) fn convert_to_variable(&mut self, ctx: &mut ExprContext) {
        self.convert_to_variable_not_in(ctx, &[]);
    }

    /// Move a handle, constant or primitive reference into a temporary
    /// whose offset is not in `exclude`.
    pub(crate) fn convert_to_variable_not_in(&mut self, ctx: &mut ExprContext, exclude: &[i16]) {
        if ctx.ty.is_variable {
            return;
        }
        let dt = ctx.ty.data_type;

        if dt.is_object_handle() {
            let is_reference = dt.is_reference;
            let dt = dt.with_reference(false);
            let offset = self.allocate_not_in(dt, true, exclude);
            if ctx.ty.is_null_constant() {
                ctx.bc.instr_w_dword(OpCode::SetV4, offset, 0);
            } else {
                if is_reference {
                    ctx.bc.instr(OpCode::RDS4);
                }
                ctx.bc.instr_w(OpCode::PSF, offset);
                if let Some(hash) = dt.object_hash() {
                    ctx.bc.instr_type(OpCode::REFCPY, hash);
                }
                ctx.bc.pop(1);
            }
            self.release_temporary(&mut ctx.ty, &mut ctx.bc);
            let explicit = ctx.ty.is_explicit_handle;
            ctx.ty.set_variable(dt, offset, true);
            ctx.ty.is_explicit_handle = explicit;
        } else if dt.is_primitive() {
            if ctx.ty.is_constant {
                let offset = self.allocate_not_in(dt, true, exclude);
                if dt.size_in_memory_dwords() == 1 {
                    ctx.bc.instr_w_dword(OpCode::SetV4, offset, ctx.ty.value as u32);
                } else {
                    ctx.bc.instr_w_qword(OpCode::SetV8, offset, ctx.ty.value);
                }
                ctx.ty.set_variable(dt, offset, true);
                return;
            }
            if !dt.is_reference {
                return;
            }
            let dt = dt.with_reference(false);
            let offset = self.allocate_not_in(dt, true, exclude);
            match dt.size_in_memory_bytes() {
                1 => {
                    ctx.bc.instr_w(OpCode::RDR1, offset);
                    let widen = if dt.is_integer_type() { OpCode::SbToI } else { OpCode::UbToI };
                    ctx.bc.instr_w(widen, offset);
                }
                2 => {
                    ctx.bc.instr_w(OpCode::RDR2, offset);
                    let widen = if dt.is_integer_type() { OpCode::SwToI } else { OpCode::UwToI };
                    ctx.bc.instr_w(widen, offset);
                }
                4 => ctx.bc.instr_w(OpCode::RDR4, offset),
                _ => ctx.bc.instr_w(OpCode::RDR8, offset),
            }
            self.release_temporary(&mut ctx.ty, &mut ctx.bc);
            ctx.ty.set_variable(dt, offset, true);
        }
    }

    /// Make sure the value is in a temporary the caller may overwrite.
    pub(crate) fn convert_to_temp_variable(&mut self, ctx: &mut ExprContext, node: NodeId) -> CResult {
        self.convert_to_variable(ctx);
        if ctx.ty.is_temporary {
            return Ok(());
        }

        let dt = ctx.ty.data_type.with_reference(false);
        if dt.is_primitive() {
            let offset = self.allocate(dt, true);
            let op = if dt.size_in_memory_dwords() == 1 {
                OpCode::CpyVtoV4
            } else {
                OpCode::CpyVtoV8
            };
            ctx.bc.instr_w_w(op, offset, ctx.ty.stack_offset);
            ctx.ty.set_variable(dt, offset, true);
        } else if !dt.is_object_handle() {
            let used = ctx.bc.vars_used();
            let offset = self.allocate_not_in(dt, true, &used);

            let mut ctor = ByteCode::new();
            self.compile_constructor(dt, offset, &mut ctor);
            ctx.bc.prepend(ctor);

            self.prepare_for_assignment(dt, ctx, node, &[])?;
            let mut lvalue = TypeInfo::variable(dt.with_reference(true), offset, true);
            ctx.bc.instr_w(OpCode::PSF, offset);
            self.perform_assignment(&mut lvalue, &ctx.ty, &mut ctx.bc, node)?;
            self.release_temporary(&mut ctx.ty, &mut ctx.bc);
            ctx.ty = lvalue;
        }
        Ok(())
    }

    /// Turn a variable into a reference to it, loaded in the register.
    pub(crate) fn convert_to_reference(&mut self, ctx: &mut ExprContext) {
        if ctx.ty.is_variable {
            ctx.bc.instr_w(OpCode::LDV, ctx.ty.stack_offset);
            let dt = ctx.ty.data_type.with_reference(true);
            ctx.ty.set(dt);
        }
    }

    /// Replace the address of an object on the stack by the object pointer.
    pub(crate) fn dereference(&mut self, ctx: &mut ExprContext, generate_code: bool) {
        if ctx.ty.data_type.is_reference && ctx.ty.data_type.is_object() {
            ctx.ty.data_type.is_reference = false;
            if generate_code {
                ctx.bc.instr(OpCode::RDS4);
            }
        }
    }

    pub(crate) fn push_variable_on_stack(&mut self, ctx: &mut ExprContext, as_reference: bool) {
        ctx.bc.instr_w(OpCode::PSF, ctx.ty.stack_offset);
        if as_reference {
            ctx.ty.data_type.is_reference = true;
        } else if ctx.ty.data_type.size_in_memory_dwords() == 1 {
            ctx.bc.instr(OpCode::RDS4);
        } else {
            ctx.bc.instr(OpCode::RDS8);
        }
    }

    /// Warn once for a primitive local read before it was assigned.
    pub(crate) fn is_variable_initialized(&mut self, ty: &TypeInfo, node: NodeId) -> bool {
        if ty.is_temporary || !ty.is_variable {
            return true;
        }
        let Some(var) = self.scopes.by_offset_mut(ty.stack_offset) else {
            return true;
        };
        if var.is_initialized || var.data_type.is_object() {
            return true;
        }
        var.is_initialized = true;
        let text = format!("'{}' is not initialized.", var.name);
        self.warning(node, text);
        false
    }

    /// Make an operand a plain value ready for an operator.
    pub(crate) fn prepare_operand(&mut self, ctx: &mut ExprContext, node: NodeId) -> CResult {
        self.is_variable_initialized(&ctx.ty, node);
        let to = ctx.ty.data_type.with_reference(false);
        self.implicit_conversion(ctx, to, node, false, true, &[])?;
        self.process_deferred_params(ctx)
    }
}

fn truncate_unsigned(value: u32, kind: PrimitiveKind) -> u32 {
    match kind.size_in_bytes() {
        1 => value as u8 as u32,
        2 => value as u16 as u32,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok};

    #[test]
    fn int_to_float_converts_in_place() {
        let module = build_ok("float f(int a) { return a; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::CpyVtoV4, OpCode::ItoF, OpCode::CpyVtoR4]);
    }

    #[test]
    fn float_to_int_leaves_the_source_variable_intact() {
        let module = build_ok("float f(float x) { int i = x; return x; }");
        let f = module.function("f").unwrap();
        let copy = f.instructions.iter().find(|i| i.op == OpCode::CpyVtoV4).unwrap();
        let convert = f.instructions.iter().find(|i| i.op == OpCode::FtoI).unwrap();
        assert_eq!(convert.w[0], copy.w[0]);
        assert_ne!(convert.w[0], copy.w[1]);
    }

    #[test]
    fn widening_to_double_uses_a_new_slot() {
        let module = build_ok("double f(float a) { return a; }");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::FtoD, OpCode::CpyVtoR8]);
    }

    #[test]
    fn constants_fold_without_code() {
        let module = build_ok("double f() { return 1; }");
        let f = module.function("f").unwrap();
        assert_eq!(f.count_op(OpCode::ItoD), 0);
        f.assert_contains_opcodes(&[OpCode::SetV8, OpCode::CpyVtoR8]);
    }

    #[test]
    fn inexact_constant_conversion_warns() {
        let (_, diags) = build("int f() { return 1.5f; }");
        assert!(
            diags
                .warnings()
                .any(|d| d.message == "Implicit conversion of value 1.5 to 1 is not exact")
        );
    }

    #[test]
    fn narrowing_constant_warns() {
        let (_, diags) = build("void f() { int8 a = 300; }");
        assert!(diags.warnings().any(|d| d.message == "Value is too large for data type"));
    }

    #[test]
    fn negative_to_unsigned_warns() {
        let (_, diags) = build("void f() { uint a = -1; }");
        assert!(diags.warnings().any(|d| d.message == "Implicit conversion changed sign of value"));
    }

    #[test]
    fn double_constant_to_float_loses_precision() {
        let (_, diags) = build("void f() { float a = 0.1; }");
        assert!(diags.warnings().any(|d| d.message == "Possible loss of precision"));
    }

    #[test]
    fn uninitialized_read_warns_once() {
        let (_, diags) = build("int f() { int a; int b = a + a; return b; }");
        assert_eq!(diags.warnings().filter(|d| d.message == "'a' is not initialized.").count(), 1);
    }
}
