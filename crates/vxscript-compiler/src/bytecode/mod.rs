//! Bytecode types for the vxscript compiler.
//!
//! - [`OpCode`] and [`ArgLayout`]: the instruction set contract with the VM
//! - [`Instruction`]: one instruction with its arguments
//! - [`ByteCode`]: the assembly buffer the compiler emits into
//! - [`FinalCode`]: the linearized result of [`ByteCode::finalize`]

mod buffer;
mod instruction;
mod opcode;

pub use buffer::{ByteCode, ByteCodeError, FinalCode};
pub(crate) use buffer::{assert_opcode_sequence, assert_opcode_subsequence};
pub use instruction::Instruction;
pub use opcode::{ArgLayout, OpCode};
