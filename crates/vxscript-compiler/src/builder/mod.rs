//! Module builder.
//!
//! The builder drives a module build through its phases:
//!
//! 1. **Parse** every source unit. Syntax errors end the build.
//! 2. **Register** declarations: structs first so that signatures may name
//!    them, then functions, global variables and imports in source order.
//! 3. **Structs**: lay out members, reject illegal containment and flag
//!    garbage-collected types.
//! 4. **Globals**: compile initializers to a fixed point (see
//!    [`globals`](self::globals)) and assemble the module init function.
//! 5. **Functions**: compile every script function.
//!
//! Every message goes through one sink that tags it with the unit name and
//! row, and turns warnings into errors when configured to.

mod globals;
mod structs;
pub mod symbols;

use vxscript_core::{
    BuildConfig, DataType, Diagnostic, DiagnosticKind, Diagnostics, FunctionDescriptor, FunctionId, ObjectType,
    RefModifier, Span, TypeFlags,
};
use vxscript_parser::{Cst, NodeId, NodeKind, SourceUnit, parse};
use vxscript_registry::HostRegistry;

use crate::compiler::{Compiler, Message};
use crate::module::{CompiledFunction, CompiledModule, GlobalVariableInfo, ImportedFunction};

pub use globals::INIT_FUNCTION_NAME;

use structs::{StructDecl, ValidState};
use symbols::{GlobalVariable, ModuleSymbols, ScriptFunction};

/// Builds one module from a set of source units.
pub struct Builder<'r> {
    registry: &'r dyn HostRegistry,
    config: BuildConfig,
    module_name: String,
    units: Vec<SourceUnit>,
}

/// Counters collected while building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub functions: usize,
    pub globals: usize,
    /// Passes of the global initializer fixed point.
    pub global_passes: usize,
    pub temporaries_allocated: usize,
    pub temporaries_released: usize,
}

/// Result of [`Builder::build`].
#[derive(Debug)]
pub struct BuildOutput {
    /// `None` when any error was reported.
    pub module: Option<CompiledModule>,
    pub diagnostics: Diagnostics,
    pub stats: BuildStats,
}

impl BuildOutput {
    pub fn is_ok(&self) -> bool {
        self.module.is_some()
    }
}

impl<'r> Builder<'r> {
    pub fn new(registry: &'r dyn HostRegistry, module_name: impl Into<String>) -> Self {
        Self {
            registry,
            config: BuildConfig::default(),
            module_name: module_name.into(),
            units: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_source(&mut self, unit: SourceUnit) {
        self.units.push(unit);
    }

    pub fn source_count(&self) -> usize {
        self.units.len()
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Build the module. The builder can be reused; every call starts over
    /// from the source units.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(&self) -> BuildOutput {
        let mut build = ModuleBuild::new(self.registry, &self.module_name, &self.config, &self.units);

        build.parse_scripts();
        if build.diagnostics.has_errors() {
            return build.finish(None, Vec::new());
        }

        build.register_declarations();
        build.compile_structs();
        let init_function = build.compile_global_variables();
        let functions = build.compile_functions();
        build.finish(init_function, functions)
    }
}

/// Which kind of symbol a new name is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameUse {
    Type,
    Function,
    Variable,
}

/// A function signature read from the syntax tree.
struct Signature {
    descriptor: FunctionDescriptor,
    param_names: Vec<Option<String>>,
    name_node: NodeId,
}

/// State of one build in progress.
pub(crate) struct ModuleBuild<'b, 'r> {
    config: &'b BuildConfig,
    units: &'b [SourceUnit],
    trees: Vec<Cst>,
    symbols: ModuleSymbols<'r>,
    structs: Vec<StructDecl>,
    diagnostics: Diagnostics,
    stats: BuildStats,
}

impl<'b, 'r> ModuleBuild<'b, 'r> {
    fn new(registry: &'r dyn HostRegistry, module_name: &str, config: &'b BuildConfig, units: &'b [SourceUnit]) -> Self {
        Self {
            config,
            units,
            trees: Vec::with_capacity(units.len()),
            symbols: ModuleSymbols::new(registry, module_name),
            structs: Vec::new(),
            diagnostics: Diagnostics::new(),
            stats: BuildStats::default(),
        }
    }

    // ==========================================================================
    // Parsing
    // ==========================================================================

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn parse_scripts(&mut self) {
        let units = self.units;
        for (index, unit) in units.iter().enumerate() {
            let output = parse(&unit.code);
            for error in output.errors.iter() {
                self.report(index, error.span, DiagnosticKind::Error, error.message.clone());
            }
            self.trees.push(output.cst);
        }
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn register_declarations(&mut self) {
        for unit in 0..self.units.len() {
            for node in self.top_level(unit) {
                if self.trees[unit].kind(node) == NodeKind::Struct {
                    self.trees[unit].disconnect(node);
                    self.register_struct(unit, node);
                }
            }
        }

        for unit in 0..self.units.len() {
            for node in self.top_level(unit) {
                let kind = self.trees[unit].kind(node);
                self.trees[unit].disconnect(node);
                match kind {
                    NodeKind::Function => self.register_function(unit, node),
                    NodeKind::GlobalVar => self.register_global_var(unit, node),
                    NodeKind::Import => self.register_import(unit, node),
                    _ => {}
                }
            }
        }
    }

    fn top_level(&self, unit: usize) -> Vec<NodeId> {
        let cst = &self.trees[unit];
        match cst.root() {
            Some(root) => cst.children(root).collect(),
            None => Vec::new(),
        }
    }

    fn register_struct(&mut self, unit: usize, node: NodeId) {
        let Some(name_node) = self.trees[unit].first_child(node) else {
            return;
        };
        let name = self.text(unit, name_node);
        if !self.check_name_conflict(unit, name_node, &name, NameUse::Type) {
            return;
        }

        let support = self.symbols.registry().script_struct_support();
        let mut ty = ObjectType::new(name, TypeFlags::SCRIPT_STRUCT | TypeFlags::REF, 0);
        ty.behaviours.default_construct = Some(support.construct);
        ty.behaviours.addref = Some(support.addref);
        ty.behaviours.release = Some(support.release);
        ty.behaviours.copy = Some(support.copy);
        let hash = self.symbols.add_type(ty);

        self.structs.push(StructDecl {
            unit,
            node,
            hash,
            state: ValidState::Unvalidated,
        });
    }

    fn register_function(&mut self, unit: usize, node: NodeId) {
        let id = FunctionId::Script(self.symbols.functions.len() as u32);
        let Some(signature) = self.read_signature(unit, node, id) else {
            self.error(unit, node, "Expected function declaration");
            return;
        };
        let name = signature.descriptor.name.clone();
        self.check_name_conflict(unit, signature.name_node, &name, NameUse::Function);
        if self.is_duplicate_function(&signature.descriptor) {
            self.error(unit, node, "A function with the same name and parameters already exists");
        }

        self.symbols.functions.push(ScriptFunction {
            descriptor: signature.descriptor,
            unit,
            node,
            param_names: signature.param_names,
        });
    }

    fn register_global_var(&mut self, unit: usize, node: NodeId) {
        let children: Vec<NodeId> = self.trees[unit].children(node).collect();
        let Some((&type_node, rest)) = children.split_first() else {
            return;
        };

        let data_type = self.resolve_type(unit, type_node);
        if data_type.size_on_stack_dwords() == 0 {
            let name = self.symbols.type_name(&data_type);
            self.error(unit, type_node, format!("Data type can't be '{name}'"));
        }

        let mut rest = rest.iter().copied().peekable();
        while let Some(name_node) = rest.next() {
            if self.trees[unit].kind(name_node) != NodeKind::Identifier {
                continue;
            }
            let init = rest.next_if(|&n| {
                matches!(
                    self.trees[unit].kind(n),
                    NodeKind::Assignment | NodeKind::InitList | NodeKind::ArgList
                )
            });

            let name = self.text(unit, name_node);
            self.check_name_conflict(unit, name_node, &name, NameUse::Variable);
            let index = self.symbols.globals.len() as u32;
            self.symbols.globals.push(GlobalVariable {
                name,
                data_type,
                index,
                unit,
                name_node,
                init,
                is_compiled: false,
                constant: None,
            });
        }
    }

    fn register_import(&mut self, unit: usize, node: NodeId) {
        let cst = &self.trees[unit];
        let signature_node = cst.children(node).find(|&n| cst.kind(n) == NodeKind::Function);
        let module_node = cst.last_child(node).filter(|&n| cst.kind(n) == NodeKind::Constant);
        let (Some(signature_node), Some(module_node)) = (signature_node, module_node) else {
            self.error(unit, node, "Expected import declaration");
            return;
        };

        let id = FunctionId::Imported(self.symbols.imports.len() as u32);
        let Some(signature) = self.read_signature(unit, signature_node, id) else {
            self.error(unit, node, "Expected import declaration");
            return;
        };
        for dt in &signature.descriptor.params {
            if dt.size_on_stack_dwords() == 0 {
                let name = self.symbols.type_name(dt);
                self.error(unit, signature_node, format!("Parameter type can't be '{name}'"));
            }
        }

        let name = signature.descriptor.name.clone();
        self.check_name_conflict(unit, signature.name_node, &name, NameUse::Function);
        if self.is_duplicate_function(&signature.descriptor) {
            self.error(unit, node, "A function with the same name and parameters already exists");
        }

        let module = self
            .text(unit, module_node)
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();
        self.symbols.imports.push(ImportedFunction {
            descriptor: signature.descriptor,
            module,
        });

        // Imports have no body to compile.
        self.trees[unit].destroy(node);
    }

    /// Read `DataType TypeMod Identifier ParameterList` of a function node.
    fn read_signature(&mut self, unit: usize, node: NodeId, id: FunctionId) -> Option<Signature> {
        let children: Vec<NodeId> = self.trees[unit].children(node).collect();
        let &[ret_node, mod_node, name_node, params_node, ..] = children.as_slice() else {
            return None;
        };

        let return_type = self.resolve_type(unit, ret_node);
        if ModuleSymbols::resolve_type_mod(&self.trees[unit], mod_node) != RefModifier::None {
            self.error(unit, mod_node, "Script functions can't return references");
        }

        let mut descriptor = FunctionDescriptor::new(id, self.text(unit, name_node), return_type);
        let mut param_names = Vec::new();
        let params: Vec<NodeId> = self.trees[unit].children(params_node).collect();
        let mut params = params.into_iter().peekable();
        while let Some(type_node) = params.next() {
            if self.trees[unit].kind(type_node) != NodeKind::DataType {
                continue;
            }
            let mode = params
                .next_if(|&n| self.trees[unit].kind(n) == NodeKind::TypeMod)
                .map_or(RefModifier::None, |n| ModuleSymbols::resolve_type_mod(&self.trees[unit], n));
            let name = params
                .next_if(|&n| self.trees[unit].kind(n) == NodeKind::Identifier)
                .map(|n| self.text(unit, n));

            let data_type = self.resolve_type(unit, type_node);
            descriptor = descriptor.with_param(data_type, mode);
            param_names.push(name);
        }

        Some(Signature {
            descriptor,
            param_names,
            name_node,
        })
    }

    fn is_duplicate_function(&self, descriptor: &FunctionDescriptor) -> bool {
        self.symbols
            .global_functions(&descriptor.name)
            .into_iter()
            .filter(|&id| id != descriptor.id)
            .filter_map(|id| self.symbols.describe(id, None))
            .any(|other| other.same_parameters(descriptor))
    }

    /// Report a clash of `name` with an existing symbol. Returns `true` when
    /// the name is free.
    fn check_name_conflict(&mut self, unit: usize, node: NodeId, name: &str, usage: NameUse) -> bool {
        let registry = self.symbols.registry();
        let clash = if registry.object_type_by_name(name).is_some() {
            Some("an extended data type")
        } else if registry.global_property(name).is_some() {
            Some("a global property")
        } else if self.symbols.script_struct_by_name(name).is_some() {
            Some("a struct")
        } else if usage != NameUse::Function && self.symbols.has_global_function(name) {
            Some("a function")
        } else if self.symbols.globals.iter().any(|g| g.name == name) {
            Some("a global variable")
        } else {
            None
        };

        match clash {
            Some(what) => {
                self.error(unit, node, format!("Name conflict. '{name}' is {what}."));
                false
            }
            None => true,
        }
    }

    /// Resolve a `DataType` node, reporting failures and falling back to
    /// `int` so registration can go on.
    fn resolve_type(&mut self, unit: usize, node: NodeId) -> DataType {
        match self.symbols.resolve_type(&self.trees[unit], &self.units[unit].code, node) {
            Ok(dt) => dt,
            Err(message) => {
                self.error(unit, node, message);
                DataType::int()
            }
        }
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn compile_functions(&mut self) -> Vec<Option<CompiledFunction>> {
        let mut compiled = Vec::with_capacity(self.symbols.functions.len());
        for index in 0..self.symbols.functions.len() {
            let function = &self.symbols.functions[index];
            let (unit, node) = (function.unit, function.node);
            let declaration = function.descriptor.declaration(|dt| self.symbols.type_name(dt));

            let outcome =
                Compiler::new(&mut self.symbols, self.config, &self.units[unit], &self.trees[unit]).compile_function(index);
            self.stats.temporaries_allocated += outcome.temporaries.0;
            self.stats.temporaries_released += outcome.temporaries.1;
            if outcome.function.is_some() {
                self.stats.functions += 1;
            }

            let heading = (self.trees[unit].span(node), format!("Compiling {declaration}"));
            self.report_messages(unit, heading, outcome.messages);
            compiled.push(outcome.function);
        }
        compiled
    }

    // ==========================================================================
    // Messages
    // ==========================================================================

    fn text(&self, unit: usize, node: NodeId) -> String {
        self.trees[unit].text(node, &self.units[unit].code).to_string()
    }

    fn error(&mut self, unit: usize, node: NodeId, message: impl Into<String>) {
        let span = self.trees[unit].span(node);
        self.report(unit, span, DiagnosticKind::Error, message);
    }

    fn report(&mut self, unit: usize, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        let kind = match kind {
            DiagnosticKind::Warning if self.config.warnings_as_errors => DiagnosticKind::Error,
            kind => kind,
        };
        let source = &self.units[unit];
        self.diagnostics.add_diagnostic(Diagnostic {
            kind,
            message: message.into(),
            section: Some(source.name.clone()),
            row: source.row(span.line),
            col: span.col,
        });
    }

    /// Report compiler messages, preceded by an info line naming what was
    /// being compiled.
    fn report_messages(&mut self, unit: usize, heading: (Span, String), messages: Vec<Message>) {
        if messages.is_empty() {
            return;
        }
        self.report(unit, heading.0, DiagnosticKind::Info, heading.1);
        for message in messages {
            self.report(unit, message.span, message.kind, message.text);
        }
    }

    // ==========================================================================
    // Result
    // ==========================================================================

    fn finish(self, init_function: Option<CompiledFunction>, functions: Vec<Option<CompiledFunction>>) -> BuildOutput {
        let ModuleBuild {
            symbols,
            diagnostics,
            stats,
            ..
        } = self;

        if diagnostics.has_errors() {
            return BuildOutput {
                module: None,
                diagnostics,
                stats,
            };
        }

        let name = symbols.module_name().to_string();
        let globals = symbols
            .globals
            .iter()
            .map(|g| GlobalVariableInfo {
                name: g.name.clone(),
                data_type: g.data_type,
                index: g.index,
                constant: g.constant,
            })
            .collect();
        let functions: Option<Vec<CompiledFunction>> = functions.into_iter().collect();
        let parts = symbols.into_parts();

        let module = functions.map(|functions| CompiledModule {
            name,
            functions,
            init_function,
            globals,
            imports: parts.imports,
            strings: parts.strings,
            object_types: parts.types,
            used_groups: parts.used_groups,
        });

        BuildOutput {
            module,
            diagnostics,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok, build_with_host, host_registry};
    use vxscript_registry::Registry;

    #[test]
    fn functions_are_compiled_in_declaration_order() {
        let module = build_ok("int one() { return 1; } int two() { return one() + 1; }");
        assert_eq!(module.functions.len(), 2);
        assert_eq!(module.functions[0].name, "one");
        assert_eq!(module.functions[1].id, FunctionId::Script(1));
        assert_eq!(module.functions[1].declaration, "int two()");
    }

    #[test]
    fn syntax_errors_stop_the_build() {
        let (module, diags) = build("int f( { }");
        assert!(module.is_none());
        assert!(diags.has_errors());
        assert!(!diags.iter().any(|d| d.message.starts_with("Compiling")));
    }

    #[test]
    fn messages_carry_section_and_row() {
        let registry = Registry::new();
        let mut builder = Builder::new(&registry, "main");
        builder.add_source(SourceUnit::new("first.vxs", "void ok() {}"));
        builder.add_source(SourceUnit::new("second.vxs", "void f()\n{\n  x = 1;\n}").with_line_offset(10));
        let output = builder.build();

        assert!(output.module.is_none());
        let error = output.diagnostics.errors().next().unwrap();
        assert_eq!(error.message, "'x' is not declared");
        assert_eq!(error.section.as_deref(), Some("second.vxs"));
        assert_eq!(error.row, 13);
        assert_eq!(error.col, 3);
    }

    #[test]
    fn compile_errors_are_preceded_by_an_info_line() {
        let (_, diags) = build("void f(int a) { a = b; }");
        let messages: Vec<_> = diags.iter().map(|d| (d.kind, d.message.as_str())).collect();
        assert_eq!(messages[0], (DiagnosticKind::Info, "Compiling void f(int)"));
        assert_eq!(messages[1], (DiagnosticKind::Error, "'b' is not declared"));
    }

    #[test]
    fn warnings_can_be_promoted() {
        let source = "void f() { return; int a = 1; }";
        let (module, diags) = build(source);
        assert!(module.is_some());
        assert!(diags.warnings().any(|d| d.message == "Unreachable code"));

        let registry = Registry::new();
        let mut builder = Builder::new(&registry, "main").with_config(BuildConfig::default().with_warnings_as_errors(true));
        builder.add_source(SourceUnit::new("main", source));
        let output = builder.build();
        assert!(output.module.is_none());
        assert!(output.diagnostics.errors().any(|d| d.message == "Unreachable code"));
    }

    #[test]
    fn duplicate_functions_are_rejected() {
        let (_, diags) = build("void f(int a) {} void f(int b) {}");
        assert!(
            diags
                .errors()
                .any(|d| d.message == "A function with the same name and parameters already exists")
        );
        build_ok("void f(int a) {} void f(float b) {}");
    }

    #[test]
    fn reference_returns_are_rejected() {
        let (_, diags) = build("int &f() { return 1; }");
        assert!(diags.errors().any(|d| d.message == "Script functions can't return references"));
    }

    #[test]
    fn name_conflicts() {
        let (_, diags) = build("int g; float g;");
        assert!(diags.errors().any(|d| d.message == "Name conflict. 'g' is a global variable."));

        let (_, diags) = build("void f() {} int f;");
        assert!(diags.errors().any(|d| d.message == "Name conflict. 'f' is a function."));

        let (_, diags) = build("struct S { int a; } int S;");
        assert!(diags.errors().any(|d| d.message == "Name conflict. 'S' is a struct."));

        let registry = host_registry();
        let mut builder = Builder::new(&registry, "main");
        builder.add_source(SourceUnit::new("main", "struct Counter { int a; }"));
        let output = builder.build();
        assert!(
            output
                .diagnostics
                .errors()
                .any(|d| d.message == "Name conflict. 'Counter' is an extended data type.")
        );
    }

    #[test]
    fn host_global_property_conflicts() {
        let mut registry = Registry::new();
        registry.register_global_property("score", DataType::int()).unwrap();
        let mut builder = Builder::new(&registry, "main");
        builder.add_source(SourceUnit::new("main", "float score = 1;"));
        let output = builder.build();
        assert!(
            output
                .diagnostics
                .errors()
                .any(|d| d.message == "Name conflict. 'score' is a global property.")
        );
    }

    #[test]
    fn imports_are_bound_by_module() {
        let module = build_ok("import int helper(int) from \"tools\"; int f() { return helper(2); }");
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.imports[0].module, "tools");
        assert_eq!(module.imports[0].descriptor.name, "helper");
        let f = module.function("f").unwrap();
        f.assert_contains_opcodes(&[OpCode::CALLBND]);
    }

    #[test]
    fn declarations_span_units() {
        let registry = Registry::new();
        let mut builder = Builder::new(&registry, "main");
        builder.add_source(SourceUnit::new("a", "int twice(int v) { return helper(v) * 2; }"));
        builder.add_source(SourceUnit::new("b", "struct Pair { int a; int b; } int helper(int v) { return v + 1; }"));
        let output = builder.build();
        assert!(output.is_ok(), "{:?}", output.diagnostics.errors().collect::<Vec<_>>());
        let module = output.module.unwrap();
        assert!(module.object_type("Pair").is_some());
        assert_eq!(module.functions.len(), 2);
    }

    #[test]
    fn temporaries_are_balanced() {
        let registry = host_registry();
        let mut builder = Builder::new(&registry, "main");
        builder.add_source(SourceUnit::new(
            "main",
            "int f(int a, float b) { int c = a * 2 + int(b) - (a > 3 ? 1 : 2); return c; } \
             Counter g(Counter x) { Counter y = x + x; return y; }",
        ));
        let output = builder.build();
        assert!(output.is_ok());
        assert_eq!(output.stats.functions, 2);
        assert!(output.stats.temporaries_allocated > 0);
        assert_eq!(output.stats.temporaries_allocated, output.stats.temporaries_released);
    }

    #[test]
    fn host_types_in_signatures() {
        let module = build_with_host("int read(const Counter &in c) { return c.value(); }");
        let f = module.function("read").unwrap();
        assert_eq!(f.declaration, "int read(const Counter &in)");
    }
}
