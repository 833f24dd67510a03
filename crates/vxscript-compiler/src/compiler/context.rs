//! Expression context: the code and result of a compiled subexpression.

use std::mem;

use vxscript_core::{DataType, RefModifier};
use vxscript_parser::NodeId;

use super::type_info::TypeInfo;
use crate::bytecode::ByteCode;

/// An argument whose cleanup waits until the call's result is consumed.
#[derive(Debug, Clone)]
pub struct DeferredParam {
    /// The temporary passed to the function.
    pub arg_type: TypeInfo,
    pub mode: RefModifier,
    /// For `&out`, the argument expression that receives the value.
    pub orig: Option<Box<ExprContext>>,
    pub node: Option<NodeId>,
}

/// Bytecode plus type information of one expression.
#[derive(Debug, Clone)]
pub struct ExprContext {
    pub bc: ByteCode,
    pub ty: TypeInfo,
    pub deferred: Vec<DeferredParam>,
    /// Source node, used to attribute diagnostics of deferred work.
    pub node: Option<NodeId>,
    /// Unevaluated argument expression kept for an `&out` parameter.
    pub orig: Option<Box<ExprContext>>,
}

impl Default for ExprContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprContext {
    pub fn new() -> Self {
        Self {
            bc: ByteCode::new(),
            ty: TypeInfo::new(DataType::void()),
            deferred: Vec::new(),
            node: None,
            orig: None,
        }
    }

    pub fn with_type(ty: TypeInfo) -> Self {
        Self { ty, ..Self::new() }
    }

    /// Append the code of `after` and take over its deferred parameters.
    /// The type of `after` is left untouched.
    pub fn merge(&mut self, after: &mut ExprContext) {
        self.bc.add_code(mem::take(&mut after.bc));
        self.deferred.append(&mut after.deferred);
    }

    /// Take the code out of the context, leaving it empty.
    pub fn take_code(&mut self) -> ByteCode {
        mem::take(&mut self.bc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::OpCode;

    #[test]
    fn merge_moves_code_and_deferred() {
        let mut before = ExprContext::new();
        before.bc.instr(OpCode::SUSPEND);

        let mut after = ExprContext::with_type(TypeInfo::constant(DataType::int(), 1));
        after.bc.instr_dword(OpCode::PshC4, 1);
        after.deferred.push(DeferredParam {
            arg_type: TypeInfo::variable(DataType::int(), 1, true),
            mode: RefModifier::In,
            orig: None,
            node: None,
        });

        before.merge(&mut after);
        before.bc.assert_opcodes(&[OpCode::SUSPEND, OpCode::PshC4]);
        assert_eq!(before.deferred.len(), 1);
        assert!(after.bc.is_empty());
        assert!(after.deferred.is_empty());
        assert!(after.ty.is_constant);
    }
}
