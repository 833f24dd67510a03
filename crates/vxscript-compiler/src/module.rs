//! Compiled module artifacts.
//!
//! A [`CompiledModule`] is what the builder hands to the VM: finalized
//! functions, the synthesized init function, the global variable table,
//! imports, interned string constants and the script-declared object types.
//!
//! Global variable operands of `PGA`/`LDG` address the module table with a
//! plain index, and the host property table when [`HOST_GLOBAL_FLAG`] is set.

use std::fmt::Write as _;

use vxscript_core::{DataType, FunctionDescriptor, FunctionId, GroupId, ObjectType, TypeHash};

use crate::bytecode::{Instruction, OpCode, assert_opcode_sequence, assert_opcode_subsequence};

/// Set on a `PGA`/`LDG` operand that addresses a host property.
pub const HOST_GLOBAL_FLAG: u32 = 0x8000_0000;

/// `ALLOC` function operand for types without a default constructor: the
/// VM only allocates the memory.
pub const NO_CONSTRUCTOR: u32 = u32::MAX;

/// A frame slot that holds an object the VM must clean up when unwinding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectVariable {
    pub type_hash: TypeHash,
    pub offset: i16,
}

/// One finalized function.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub name: String,
    pub id: FunctionId,
    /// Readable signature, e.g. `int add(int, int)`.
    pub declaration: String,
    /// Reachable instructions with resolved jumps.
    pub instructions: Vec<Instruction>,
    /// Encoded word stream.
    pub code: Vec<u32>,
    /// Largest value stack depth in dwords.
    pub stack_size: u32,
    /// Dwords reserved for local variables and temporaries.
    pub variable_space: u32,
    pub object_variables: Vec<ObjectVariable>,
    /// `(word position, line | col << 20)`.
    pub line_table: Vec<(u32, u32)>,
}

impl CompiledFunction {
    /// Opcodes of the finalized code, pseudo instructions skipped.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instructions.iter().map(|i| i.op).filter(|op| !op.is_pseudo()).collect()
    }

    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        assert_opcode_sequence(&self.opcodes(), expected);
    }

    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        assert_opcode_subsequence(&self.opcodes(), expected);
    }

    pub fn count_op(&self, op: OpCode) -> usize {
        self.instructions.iter().filter(|i| i.op == op).count()
    }

    /// Human readable disassembly.
    pub fn listing(&self) -> String {
        let mut out = format!("{}\n", self.declaration);
        for instr in &self.instructions {
            let _ = writeln!(out, "{instr}");
        }
        out
    }
}

/// A script global variable.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVariableInfo {
    pub name: String,
    pub data_type: DataType,
    /// Slot in the module's global table.
    pub index: u32,
    /// Folded value of a pure constant.
    pub constant: Option<u64>,
}

/// A function the module expects another module to provide.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedFunction {
    pub descriptor: FunctionDescriptor,
    /// Name of the module the function is bound from.
    pub module: String,
}

/// Everything produced by building one module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledModule {
    pub name: String,
    /// Script functions; `FunctionId::Script(i)` is `functions[i]`.
    pub functions: Vec<CompiledFunction>,
    /// Global initializers, in compile order. `None` when no global needs
    /// runtime initialization.
    pub init_function: Option<CompiledFunction>,
    pub globals: Vec<GlobalVariableInfo>,
    /// `FunctionId::Imported(i)` is `imports[i]`.
    pub imports: Vec<ImportedFunction>,
    /// String constants referenced by `STR`.
    pub strings: Vec<String>,
    /// Script structs and array instances declared by the module.
    pub object_types: Vec<ObjectType>,
    /// Host config groups the module depends on.
    pub used_groups: Vec<GroupId>,
}

impl CompiledModule {
    pub fn function(&self, name: &str) -> Option<&CompiledFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&GlobalVariableInfo> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        self.object_types.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::ByteCode;

    fn sample() -> CompiledFunction {
        let mut bc = ByteCode::new();
        bc.push(1);
        bc.instr_w_dword(OpCode::SetV4, 1, 7);
        bc.instr_w(OpCode::CpyVtoR4, 1);
        bc.pop(1);
        bc.ret(0);
        let out = bc.finalize().unwrap();
        CompiledFunction {
            name: "seven".into(),
            id: FunctionId::Script(0),
            declaration: "int seven()".into(),
            instructions: out.instructions,
            code: out.code,
            stack_size: out.stack_size,
            variable_space: 1,
            object_variables: Vec::new(),
            line_table: out.line_table,
        }
    }

    #[test]
    fn function_helpers() {
        let f = sample();
        f.assert_opcodes(&[OpCode::PUSH, OpCode::SetV4, OpCode::CpyVtoR4, OpCode::POP, OpCode::RET]);
        f.assert_contains_opcodes(&[OpCode::SetV4, OpCode::RET]);
        assert_eq!(f.count_op(OpCode::SetV4), 1);
        let listing = f.listing();
        assert!(listing.starts_with("int seven()\n"));
        assert!(listing.contains("SetV4"));
    }

    #[test]
    fn module_lookups() {
        let module = CompiledModule {
            name: "main".into(),
            functions: vec![sample()],
            globals: vec![GlobalVariableInfo {
                name: "g".into(),
                data_type: DataType::int(),
                index: 0,
                constant: Some(3),
            }],
            ..CompiledModule::default()
        };
        assert!(module.function("seven").is_some());
        assert!(module.function("eight").is_none());
        assert_eq!(module.global("g").and_then(|g| g.constant), Some(3));
    }
}
