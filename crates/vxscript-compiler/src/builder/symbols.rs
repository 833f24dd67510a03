//! Symbol tables of the module being built.
//!
//! [`ModuleSymbols`] owns everything the script itself declares (structs,
//! array instances, functions, imports, globals, string constants) and
//! answers lookups by consulting those first and the host registry second.
//! Every host lookup goes through the config group visibility predicate, so a
//! symbol in a group the module may not access is simply not found.

use rustc_hash::FxHashMap;

use vxscript_core::{
    BaseType, DataType, FunctionDescriptor, FunctionId, GroupId, ObjectType, Operator, PrimitiveKind, RefModifier,
    TypeFlags, TypeHash,
};
use vxscript_parser::{Cst, NodeId, TokenKind};
use vxscript_registry::{GlobalProperty, HostRegistry, SELF_TYPE, array_template_hash, instantiate_signature};

use crate::module::ImportedFunction;

/// A function declared in script.
#[derive(Debug, Clone)]
pub struct ScriptFunction {
    pub descriptor: FunctionDescriptor,
    /// Index of the source unit that declares it.
    pub unit: usize,
    /// The `Function` node.
    pub node: NodeId,
    pub param_names: Vec<Option<String>>,
}

/// A global variable declared in script.
#[derive(Debug, Clone)]
pub struct GlobalVariable {
    pub name: String,
    pub data_type: DataType,
    /// Dense index in declaration order.
    pub index: u32,
    pub unit: usize,
    /// The `Identifier` node naming the variable.
    pub name_node: NodeId,
    /// `Assignment`, `InitList` or `ArgList` following the name.
    pub init: Option<NodeId>,
    pub is_compiled: bool,
    /// Folded value once a read-only primitive is initialized by a constant.
    pub constant: Option<u64>,
}

/// Result of a global variable lookup.
#[derive(Debug, Clone, Copy)]
pub enum GlobalRef<'r> {
    Script(usize),
    Host(&'r GlobalProperty),
}

pub struct ModuleSymbols<'r> {
    registry: &'r dyn HostRegistry,
    module_name: String,
    types: Vec<ObjectType>,
    type_index: FxHashMap<TypeHash, usize>,
    pub functions: Vec<ScriptFunction>,
    pub imports: Vec<ImportedFunction>,
    pub globals: Vec<GlobalVariable>,
    strings: Vec<String>,
    string_index: FxHashMap<String, u32>,
    used_groups: Vec<GroupId>,
}

impl<'r> ModuleSymbols<'r> {
    pub fn new(registry: &'r dyn HostRegistry, module_name: impl Into<String>) -> Self {
        Self {
            registry,
            module_name: module_name.into(),
            types: Vec::new(),
            type_index: FxHashMap::default(),
            functions: Vec::new(),
            imports: Vec::new(),
            globals: Vec::new(),
            strings: Vec::new(),
            string_index: FxHashMap::default(),
            used_groups: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'r dyn HostRegistry {
        self.registry
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    fn visible(&self, group: Option<GroupId>) -> bool {
        self.registry.is_visible(group, &self.module_name)
    }

    /// Record that the module depends on a host config group.
    pub fn use_group(&mut self, group: Option<GroupId>) {
        if let Some(group) = group
            && !self.used_groups.contains(&group)
        {
            self.used_groups.push(group);
        }
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    pub fn add_type(&mut self, ty: ObjectType) -> TypeHash {
        let hash = ty.hash;
        self.type_index.insert(hash, self.types.len());
        self.types.push(ty);
        hash
    }

    pub fn script_types(&self) -> &[ObjectType] {
        &self.types
    }

    pub fn script_type_mut(&mut self, hash: TypeHash) -> Option<&mut ObjectType> {
        let index = *self.type_index.get(&hash)?;
        self.types.get_mut(index)
    }

    pub fn object_type(&self, hash: TypeHash) -> Option<&ObjectType> {
        match self.type_index.get(&hash) {
            Some(&index) => self.types.get(index),
            None => self.registry.object_type(hash),
        }
    }

    /// Script structs shadow nothing: a struct may not reuse a host type name.
    pub fn script_struct_by_name(&self, name: &str) -> Option<&ObjectType> {
        self.types.iter().find(|t| t.is_script_struct() && t.name == name)
    }

    /// Host type visible to this module.
    pub fn host_type_by_name(&self, name: &str) -> Option<&'r ObjectType> {
        self.registry.object_type_by_name(name).filter(|t| self.visible(t.group))
    }

    pub fn type_by_name(&mut self, name: &str) -> Option<TypeHash> {
        if let Some(ty) = self.script_struct_by_name(name) {
            return Some(ty.hash);
        }
        let ty = self.host_type_by_name(name)?;
        self.use_group(ty.group);
        Some(ty.hash)
    }

    pub fn is_type_name(&self, name: &str) -> bool {
        PrimitiveKind::from_name(name).is_some()
            || self.script_struct_by_name(name).is_some()
            || self.host_type_by_name(name).is_some()
    }

    /// Readable name of a data type, e.g. `const Point@&`.
    pub fn type_name(&self, dt: &DataType) -> String {
        let base = match dt.base {
            BaseType::Primitive(kind) => kind.name().to_string(),
            BaseType::Object(hash) => match self.object_type(hash) {
                Some(ty) => ty.name.clone(),
                None => hash.to_string(),
            },
            BaseType::Null => return "<null handle>".to_string(),
        };
        let mut name = String::with_capacity(base.len() + 8);
        if dt.is_read_only {
            name.push_str("const ");
        }
        name.push_str(&base);
        if dt.is_handle {
            name.push('@');
        }
        if dt.is_reference {
            name.push('&');
        }
        name
    }

    /// Instance of the array template for `element`, created on first use.
    pub fn array_of(&mut self, element: DataType) -> TypeHash {
        let element = element.with_read_only(false).with_reference(false);
        let hash = TypeHash::from_template_instance(array_template_hash(), &[element.identity()]);
        if self.type_index.contains_key(&hash) {
            return hash;
        }

        let template = self.registry.array_template();
        let element_is_gc = element.object_hash().and_then(|h| self.object_type(h)).is_some_and(ObjectType::is_gc);
        let mut flags = TypeFlags::ARRAY | TypeFlags::REF;
        if element.is_object_handle() || element_is_gc {
            flags |= TypeFlags::GC;
        }

        let mut ty = ObjectType::new(format!("{}[]", self.type_name(&element)), flags, 16);
        ty.hash = hash;
        ty.sub_type = Some(element);
        ty.behaviours.default_construct = Some(template.default_construct);
        ty.behaviours.constructors = vec![template.construct_with_length];
        ty.behaviours.addref = Some(template.addref);
        ty.behaviours.release = Some(template.release);
        ty.behaviours.copy = Some(template.copy);
        ty.behaviours.operators = vec![(Operator::Index, template.index), (Operator::Index, template.index_const)];
        ty.methods = vec![template.length];
        self.add_type(ty)
    }

    /// Resolve a `DataType` node.
    pub fn resolve_type(&mut self, cst: &Cst, source: &str, node: NodeId) -> Result<DataType, String> {
        let mut is_const = false;
        let mut dt: Option<DataType> = None;

        for child in cst.children(node) {
            let token = cst.get(child).token;
            match (token, dt) {
                (Some(TokenKind::Const), None) => is_const = true,
                (Some(TokenKind::LeftBracket), Some(element)) => {
                    dt = Some(DataType::object(self.array_of(element)));
                }
                (Some(TokenKind::At), Some(inner)) => {
                    if inner.is_object_handle() || !self.supports_handles(&inner) {
                        return Err("Object handle is not supported for this type".to_string());
                    }
                    dt = Some(inner.with_handle(true));
                }
                (Some(kind), None) => {
                    let name = cst.text(child, source);
                    dt = Some(match kind.primitive_kind() {
                        Some(prim) => DataType::primitive(prim),
                        None => match self.type_by_name(name) {
                            Some(hash) => DataType::object(hash),
                            None => return Err(format!("Identifier '{name}' is not a data type")),
                        },
                    });
                }
                _ => {}
            }
        }

        dt.map(|dt| dt.with_read_only(is_const))
            .ok_or_else(|| format!("Identifier '{}' is not a data type", cst.text(node, source)))
    }

    /// Resolve a `TypeMod` node into a parameter mode. A bare `&` is `&inout`.
    pub fn resolve_type_mod(cst: &Cst, node: NodeId) -> RefModifier {
        let mut children = cst.children(node);
        match children.next() {
            None => RefModifier::None,
            Some(_) => match children.next().and_then(|m| cst.get(m).token) {
                Some(TokenKind::In) => RefModifier::In,
                Some(TokenKind::Out) => RefModifier::Out,
                _ => RefModifier::InOut,
            },
        }
    }

    pub fn supports_handles(&self, dt: &DataType) -> bool {
        dt.object_hash()
            .and_then(|hash| self.object_type(hash))
            .is_some_and(|ty| ty.behaviours.supports_handles())
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    /// Descriptor of any callable. Built-in behaviours are instantiated for
    /// `owner`, the type they are called on.
    pub fn describe(&self, id: FunctionId, owner: Option<TypeHash>) -> Option<FunctionDescriptor> {
        match id {
            FunctionId::Script(index) => self.functions.get(index as usize).map(|f| f.descriptor.clone()),
            FunctionId::Imported(index) => self.imports.get(index as usize).map(|f| f.descriptor.clone()),
            FunctionId::System(_) => {
                let desc = self.registry.function(id)?;
                match (desc.object_type, owner) {
                    (Some(SELF_TYPE), Some(owner)) => {
                        let sub_type = self.object_type(owner).and_then(|t| t.sub_type);
                        Some(instantiate_signature(desc, owner, sub_type))
                    }
                    _ => Some(desc.clone()),
                }
            }
        }
    }

    /// Every visible global function named `name`: script functions, then
    /// imports, then host functions.
    pub fn global_functions(&self, name: &str) -> Vec<FunctionId> {
        let script = self.functions.iter().filter(|f| f.descriptor.name == name).map(|f| f.descriptor.id);
        let imports = self.imports.iter().filter(|f| f.descriptor.name == name).map(|f| f.descriptor.id);
        let host = self
            .registry
            .global_functions(name)
            .into_iter()
            .filter(|&id| self.registry.function(id).is_some_and(|d| self.visible(d.group)));
        script.chain(imports).chain(host).collect()
    }

    pub fn has_global_function(&self, name: &str) -> bool {
        !self.global_functions(name).is_empty()
    }

    pub fn global_operators(&self, op: Operator) -> Vec<FunctionId> {
        self.registry
            .global_operators(op)
            .into_iter()
            .filter(|&id| self.registry.function(id).is_some_and(|d| self.visible(d.group)))
            .collect()
    }

    // ==========================================================================
    // Globals and strings
    // ==========================================================================

    pub fn lookup_global(&self, name: &str) -> Option<GlobalRef<'r>> {
        if let Some(index) = self.globals.iter().position(|g| g.name == name) {
            return Some(GlobalRef::Script(index));
        }
        self.registry
            .global_property(name)
            .filter(|p| self.visible(p.group))
            .map(GlobalRef::Host)
    }

    pub fn intern_string(&mut self, value: &str) -> u32 {
        if let Some(&id) = self.string_index.get(value) {
            return id;
        }
        let id = self.strings.len() as u32;
        self.strings.push(value.to_string());
        self.string_index.insert(value.to_string(), id);
        id
    }

    /// Hand the tables over to the compiled module.
    pub fn into_parts(self) -> SymbolParts {
        SymbolParts {
            types: self.types,
            imports: self.imports,
            strings: self.strings,
            used_groups: self.used_groups,
        }
    }
}

/// What [`ModuleSymbols::into_parts`] leaves for the compiled module.
pub struct SymbolParts {
    pub types: Vec<ObjectType>,
    pub imports: Vec<ImportedFunction>,
    pub strings: Vec<String>,
    pub used_groups: Vec<GroupId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use vxscript_parser::{NodeKind, parse};
    use vxscript_registry::Registry;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_object_type("Obj", TypeFlags::REF, 8).unwrap();
        registry.register_addref("Obj").unwrap();
        registry.register_release("Obj").unwrap();
        registry.register_object_type("Val", TypeFlags::VALUE, 8).unwrap();
        registry.begin_config_group("secret");
        registry.register_global_function("hidden", DataType::void(), &[]).unwrap();
        registry.end_config_group();
        registry.set_default_access("secret", false).unwrap();
        registry
    }

    fn global_type(symbols: &mut ModuleSymbols<'_>, source: &str) -> Result<DataType, String> {
        let output = parse(source);
        let root = output.root().unwrap();
        let decl = output.cst.first_child(root).unwrap();
        assert_eq!(output.cst.kind(decl), NodeKind::GlobalVar);
        let ty = output.cst.first_child(decl).unwrap();
        symbols.resolve_type(&output.cst, source, ty)
    }

    #[test]
    fn resolves_primitives_handles_and_arrays() {
        let registry = registry();
        let mut symbols = ModuleSymbols::new(&registry, "main");

        let dt = global_type(&mut symbols, "const int x;").unwrap();
        assert_eq!(dt, DataType::int().with_read_only(true));

        let dt = global_type(&mut symbols, "Obj@ h;").unwrap();
        assert!(dt.is_object_handle());
        assert_eq!(symbols.type_name(&dt), "Obj@");

        let dt = global_type(&mut symbols, "Obj@[] list;").unwrap();
        assert_eq!(symbols.type_name(&dt), "Obj@[]");
        let array = symbols.object_type(dt.object_hash().unwrap()).unwrap();
        assert!(array.is_array());
        assert!(array.is_gc());
    }

    #[test]
    fn rejects_handles_to_value_types() {
        let registry = registry();
        let mut symbols = ModuleSymbols::new(&registry, "main");
        let err = global_type(&mut symbols, "Val@ v;").unwrap_err();
        assert_eq!(err, "Object handle is not supported for this type");
        let err = global_type(&mut symbols, "Nope n;").unwrap_err();
        assert_eq!(err, "Identifier 'Nope' is not a data type");
    }

    #[test]
    fn array_instances_are_shared() {
        let registry = registry();
        let mut symbols = ModuleSymbols::new(&registry, "main");
        let a = symbols.array_of(DataType::int());
        let b = symbols.array_of(DataType::int().with_read_only(true));
        assert_eq!(a, b);
        assert_eq!(symbols.script_types().len(), 1);
        assert!(!symbols.object_type(a).unwrap().is_gc());
    }

    #[test]
    fn builtin_index_is_instantiated_for_the_array() {
        let registry = registry();
        let mut symbols = ModuleSymbols::new(&registry, "main");
        let floats = symbols.array_of(DataType::primitive(PrimitiveKind::Float));
        let index = registry.array_template().index;
        let desc = symbols.describe(index, Some(floats)).unwrap();
        assert_eq!(desc.return_type, DataType::primitive(PrimitiveKind::Float).with_reference(true));
        assert_eq!(desc.object_type, Some(floats));
    }

    #[test]
    fn hidden_groups_are_not_found() {
        let registry = registry();
        let symbols = ModuleSymbols::new(&registry, "main");
        assert!(symbols.global_functions("hidden").is_empty());
    }

    #[test]
    fn strings_are_interned() {
        let registry = registry();
        let mut symbols = ModuleSymbols::new(&registry, "main");
        assert_eq!(symbols.intern_string("a"), 0);
        assert_eq!(symbols.intern_string("b"), 1);
        assert_eq!(symbols.intern_string("a"), 0);
    }
}
