//! vxscript registry crate.
//!
//! Hosts describe what scripts may use through a [`Registry`]: object types,
//! behaviours, functions, properties, operator overloads, the string factory
//! and config groups. The compiler only ever sees the read-only
//! [`HostRegistry`] trait.

mod groups;
mod host;
mod registry;

pub use groups::ConfigGroup;
pub use host::{
    ArrayTemplate, GlobalProperty, HostRegistry, SELF_TYPE, SUB_TYPE, ScriptStructSupport,
    array_template_hash, instantiate_signature,
};
pub use registry::{Params, Registry};
