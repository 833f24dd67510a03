//! vxscript compiler crate.
//!
//! Turns parsed script units into a [`CompiledModule`] of finalized
//! bytecode functions.
//!
//! ## Modules
//!
//! - [`builder`]: drives a module build: registration, struct layout,
//!   global initializers and function compilation
//! - [`bytecode`]: the instruction set, assembly buffer and finalization
//! - [`module`]: the compiled artifacts handed to the VM
//!
//! The expression and statement compiler itself is internal; its entry
//! point is [`Compiler`], driven by [`Builder`].
//!
//! # Example
//!
//! ```
//! use vxscript_compiler::Builder;
//! use vxscript_parser::SourceUnit;
//! use vxscript_registry::Registry;
//!
//! let registry = Registry::new();
//! let mut builder = Builder::new(&registry, "main");
//! builder.add_source(SourceUnit::new("main.vxs", "int twice(int v) { return v * 2; }"));
//!
//! let output = builder.build();
//! let module = output.module.unwrap();
//! assert_eq!(module.functions[0].declaration, "int twice(int)");
//! ```

pub mod builder;
pub mod bytecode;
mod compiler;
pub mod module;

pub use builder::symbols::{GlobalVariable, ModuleSymbols, ScriptFunction};
pub use builder::{BuildOutput, BuildStats, Builder, INIT_FUNCTION_NAME};
pub use bytecode::{ByteCode, ByteCodeError, FinalCode, Instruction, OpCode};
pub use compiler::{Compiler, FunctionOutcome, GlobalOutcome, Message};
pub use module::{
    CompiledFunction, CompiledModule, GlobalVariableInfo, HOST_GLOBAL_FLAG, ImportedFunction, NO_CONSTRUCTOR,
    ObjectVariable,
};

#[cfg(test)]
pub(crate) mod test_utils;
