//! Helpers for compiler tests.

use vxscript_core::{DataType, Diagnostics, Operator, RefModifier, TypeFlags};
use vxscript_parser::SourceUnit;
use vxscript_registry::{HostRegistry, Registry};

use crate::builder::Builder;
use crate::module::CompiledModule;

fn build_in(registry: &dyn HostRegistry, source: &str) -> (Option<CompiledModule>, Diagnostics) {
    let mut builder = Builder::new(registry, "test");
    builder.add_source(SourceUnit::new("test", source));
    let output = builder.build();
    (output.module, output.diagnostics)
}

#[track_caller]
fn expect_module(source: &str, (module, diagnostics): (Option<CompiledModule>, Diagnostics)) -> CompiledModule {
    match module {
        Some(module) => module,
        None => {
            let mut listing = Vec::new();
            let _ = diagnostics.emit(&mut listing);
            panic!("build failed for `{source}`:\n{}", String::from_utf8_lossy(&listing));
        }
    }
}

/// Build against an empty registry.
pub fn build(source: &str) -> (Option<CompiledModule>, Diagnostics) {
    build_in(&Registry::new(), source)
}

#[track_caller]
pub fn build_ok(source: &str) -> CompiledModule {
    expect_module(source, build(source))
}

/// A registry with a few host types:
///
/// - `string`: value type produced by the string factory
/// - `Counter`: value type with constructors, methods, a property and `+`
/// - `Node`: reference type with handle support
pub fn host_registry() -> Registry {
    let mut r = Registry::new();
    let int = DataType::int();

    r.register_object_type("string", TypeFlags::VALUE, 16).unwrap();
    r.register_constructor("string", &[]).unwrap();
    r.register_destructor("string").unwrap();
    r.register_copy("string").unwrap();
    r.register_string_factory("string").unwrap();

    let counter = r.register_object_type("Counter", TypeFlags::VALUE | TypeFlags::POD, 4).unwrap();
    let counter = DataType::object(counter);
    r.register_constructor("Counter", &[]).unwrap();
    r.register_constructor("Counter", &[(int, RefModifier::None)]).unwrap();
    r.register_copy("Counter").unwrap();
    r.register_method("Counter", "add", int, &[(int, RefModifier::None)], false).unwrap();
    r.register_method("Counter", "value", int, &[], true).unwrap();
    r.register_object_property("Counter", "count", int, 0).unwrap();
    let operand = (counter.with_read_only(true), RefModifier::In);
    r.register_global_operator(Operator::Add, counter, &[operand, operand]).unwrap();

    r.register_object_type("Node", TypeFlags::REF, 8).unwrap();
    r.register_addref("Node").unwrap();
    r.register_release("Node").unwrap();

    r
}

/// Build against [`host_registry`].
pub fn build_host(source: &str) -> (Option<CompiledModule>, Diagnostics) {
    build_in(&host_registry(), source)
}

#[track_caller]
pub fn build_with_host(source: &str) -> CompiledModule {
    expect_module(source, build_host(source))
}
