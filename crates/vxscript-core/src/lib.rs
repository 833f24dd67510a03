//! Core types shared by the vxscript parser, registry and compiler.
//!
//! This crate has no knowledge of source syntax or bytecode. It defines the
//! vocabulary the other crates speak:
//!
//! - [`Span`]: source locations for diagnostics
//! - [`TypeHash`]: deterministic identity for object types
//! - [`DataType`] / [`PrimitiveKind`]: the type descriptor used everywhere
//! - [`ObjectType`], [`FunctionDescriptor`]: what hosts and scripts declare
//! - [`Diagnostics`]: the error/warning/info stream of a build
//! - [`BuildConfig`]: tunables of the compiler

mod config;
mod data_type;
mod diagnostics;
mod error;
mod function;
mod object_type;
mod operator;
mod span;
mod type_hash;

pub use config::BuildConfig;
pub use data_type::{BaseType, DataType, PrimitiveKind, RefModifier};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{LexError, ParseError, ParseErrorKind, ParseErrors, RegistrationError};
pub use function::{FunctionDescriptor, FunctionId};
pub use object_type::{Behaviours, GroupId, ObjectType, PropertyDescriptor, TypeFlags};
pub use operator::Operator;
pub use span::Span;
pub use type_hash::{TypeHash, hash_constants};

/// Value stored in a boolean variable or constant for `true`.
pub const VALUE_OF_BOOLEAN_TRUE: u32 = 1;
