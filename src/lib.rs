//! vxscript: a compiler for a small statically typed scripting language.
//!
//! Scripts declare structs, global variables, functions and imports. The
//! host application describes the types and functions scripts may use in a
//! [`Registry`]; a [`Unit`] builds a set of source files against it into a
//! [`CompiledModule`] of bytecode functions for a VM.
//!
//! The work is split across the workspace crates, re-exported here:
//!
//! - `vxscript-core`: types, diagnostics and configuration
//! - `vxscript-parser`: tokenizer and syntax tree
//! - `vxscript-registry`: host declarations
//! - `vxscript-compiler`: module builder and bytecode generation

mod unit;

pub use unit::{BuildError, DEFAULT_MODULE_NAME, Unit, UnitError};

pub use vxscript_compiler::{
    BuildOutput, BuildStats, Builder, CompiledFunction, CompiledModule, GlobalVariableInfo, ImportedFunction,
    Instruction, OpCode, bytecode,
};
pub use vxscript_core::{
    BuildConfig, DataType, Diagnostic, DiagnosticKind, Diagnostics, FunctionId, Operator, PrimitiveKind, RefModifier,
    TypeFlags, TypeHash,
};
pub use vxscript_parser::SourceUnit;
pub use vxscript_registry::{HostRegistry, Registry};

pub mod prelude {
    pub use crate::unit::{BuildError, Unit, UnitError};
    pub use vxscript_compiler::{CompiledFunction, CompiledModule};
    pub use vxscript_core::{BuildConfig, DataType, Diagnostics, TypeFlags};
    pub use vxscript_registry::{HostRegistry, Registry};
}
