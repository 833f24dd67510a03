//! Registry - the concrete store of host registrations.
//!
//! Hosts populate a [`Registry`] before building any module: object types
//! with their properties and behaviours, global functions, global
//! properties and constants, operator overloads and the string factory.
//! Builds then read it through [`HostRegistry`].
//!
//! # Storage Model
//!
//! - **Types**: stored by [`TypeHash`], with a name index
//! - **Functions**: every host function, method and behaviour lives in one
//!   table; its [`FunctionId::System`] index is the position in that table
//! - **Groups**: registrations made between [`Registry::begin_config_group`]
//!   and [`Registry::end_config_group`] carry the group id
//!
//! # Example
//!
//! ```
//! use vxscript_core::{DataType, RefModifier, TypeFlags};
//! use vxscript_registry::{HostRegistry, Registry};
//!
//! let mut registry = Registry::new();
//! let vec3 = registry.register_object_type("Vec3", TypeFlags::VALUE | TypeFlags::POD, 12).unwrap();
//! registry
//!     .register_object_property("Vec3", "x", DataType::primitive(vxscript_core::PrimitiveKind::Float), 0)
//!     .unwrap();
//! registry
//!     .register_global_function("length", DataType::primitive(vxscript_core::PrimitiveKind::Float), &[(
//!         DataType::object(vec3).with_read_only(true),
//!         RefModifier::In,
//!     )])
//!     .unwrap();
//!
//! assert_eq!(registry.object_type_by_name("Vec3").map(|t| t.hash), Some(vec3));
//! assert_eq!(registry.global_functions("length").len(), 1);
//! ```

use std::fmt;

use rustc_hash::FxHashMap;

use vxscript_core::{
    DataType, FunctionDescriptor, FunctionId, GroupId, ObjectType, Operator, PrimitiveKind,
    PropertyDescriptor, RefModifier, RegistrationError, TypeFlags, TypeHash,
};

use crate::groups::ConfigGroup;
use crate::host::{
    ArrayTemplate, GlobalProperty, HostRegistry, SELF_TYPE, SUB_TYPE, ScriptStructSupport,
};

/// Parameter list of a registration: type and reference mode per parameter.
pub type Params<'a> = &'a [(DataType, RefModifier)];

/// Concrete host registry.
pub struct Registry {
    types: FxHashMap<TypeHash, ObjectType>,
    type_names: FxHashMap<String, TypeHash>,

    /// All host functions. `FunctionId::System(i)` is `functions[i]`.
    functions: Vec<FunctionDescriptor>,
    global_functions: FxHashMap<String, Vec<FunctionId>>,
    global_operators: Vec<(Operator, FunctionId)>,

    properties: Vec<GlobalProperty>,
    property_names: FxHashMap<String, usize>,

    string_factory: Option<FunctionId>,

    groups: Vec<ConfigGroup>,
    current_group: Option<GroupId>,

    struct_support: ScriptStructSupport,
    array_template: ArrayTemplate,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a registry holding only the built-in struct and array behaviours.
    pub fn new() -> Self {
        let placeholder = FunctionId::System(0);
        let mut registry = Self {
            types: FxHashMap::default(),
            type_names: FxHashMap::default(),
            functions: Vec::new(),
            global_functions: FxHashMap::default(),
            global_operators: Vec::new(),
            properties: Vec::new(),
            property_names: FxHashMap::default(),
            string_factory: None,
            groups: Vec::new(),
            current_group: None,
            struct_support: ScriptStructSupport {
                construct: placeholder,
                addref: placeholder,
                release: placeholder,
                copy: placeholder,
            },
            array_template: ArrayTemplate {
                default_construct: placeholder,
                construct_with_length: placeholder,
                addref: placeholder,
                release: placeholder,
                copy: placeholder,
                index: placeholder,
                index_const: placeholder,
                length: placeholder,
            },
        };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        let this = DataType::object(SELF_TYPE);
        let this_ref = this.with_reference(true);
        let this_in = this.with_read_only(true);
        let sub = DataType::object(SUB_TYPE);

        self.struct_support = ScriptStructSupport {
            construct: self.add_behaviour("$construct", DataType::void(), &[], false),
            addref: self.add_behaviour("$addref", DataType::void(), &[], false),
            release: self.add_behaviour("$release", DataType::void(), &[], false),
            copy: self.add_behaviour("$copy", this_ref, &[(this_in, RefModifier::In)], false),
        };

        self.array_template = ArrayTemplate {
            default_construct: self.add_behaviour("$construct", DataType::void(), &[], false),
            construct_with_length: self.add_behaviour(
                "$construct",
                DataType::void(),
                &[(DataType::uint(), RefModifier::None)],
                false,
            ),
            addref: self.add_behaviour("$addref", DataType::void(), &[], false),
            release: self.add_behaviour("$release", DataType::void(), &[], false),
            copy: self.add_behaviour("$copy", this_ref, &[(this_in, RefModifier::In)], false),
            index: self.add_behaviour(
                "$index",
                sub.with_reference(true),
                &[(DataType::uint(), RefModifier::None)],
                false,
            ),
            index_const: self.add_behaviour(
                "$index",
                sub.with_read_only(true).with_reference(true),
                &[(DataType::uint(), RefModifier::None)],
                true,
            ),
            length: self.add_behaviour("length", DataType::uint(), &[], true),
        };
    }

    fn add_behaviour(&mut self, name: &str, ret: DataType, params: Params<'_>, read_only: bool) -> FunctionId {
        let mut desc = describe(name, ret, params);
        desc.object_type = Some(SELF_TYPE);
        desc.is_read_only = read_only;
        self.add_function(desc)
    }

    fn add_function(&mut self, mut desc: FunctionDescriptor) -> FunctionId {
        let id = FunctionId::System(self.functions.len() as u32);
        desc.id = id;
        desc.group = self.current_group;
        self.functions.push(desc);
        id
    }

    fn type_mut(&mut self, type_name: &str) -> Result<&mut ObjectType, RegistrationError> {
        let hash = self
            .type_names
            .get(type_name)
            .copied()
            .ok_or_else(|| RegistrationError::TypeNotFound(type_name.to_string()))?;
        self.types
            .get_mut(&hash)
            .ok_or_else(|| RegistrationError::TypeNotFound(type_name.to_string()))
    }

    /// Object types used in a declaration must already be registered.
    fn check_types(&self, types: impl IntoIterator<Item = DataType>) -> Result<(), RegistrationError> {
        for dt in types {
            if dt.object_hash().is_some_and(|hash| !self.types.contains_key(&hash)) {
                return Err(RegistrationError::TypeNotFound(dt.to_string()));
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Object Types
    // ==========================================================================

    /// Register an object type. Exactly one of [`TypeFlags::VALUE`] and
    /// [`TypeFlags::REF`] must be set.
    pub fn register_object_type(
        &mut self,
        name: &str,
        flags: TypeFlags,
        size: u32,
    ) -> Result<TypeHash, RegistrationError> {
        if PrimitiveKind::from_name(name).is_some() || self.type_names.contains_key(name) {
            return Err(RegistrationError::DuplicateType(name.to_string()));
        }
        if flags.contains(TypeFlags::VALUE) == flags.contains(TypeFlags::REF) {
            return Err(RegistrationError::ForbiddenBehaviour {
                type_name: name.to_string(),
                behaviour: "type",
                reason: "exactly one of VALUE and REF must be given".to_string(),
            });
        }

        let mut ty = ObjectType::new(name, flags, size);
        ty.group = self.current_group;
        let hash = ty.hash;
        self.type_names.insert(name.to_string(), hash);
        self.types.insert(hash, ty);
        Ok(hash)
    }

    pub fn register_object_property(
        &mut self,
        type_name: &str,
        name: &str,
        data_type: DataType,
        byte_offset: u32,
    ) -> Result<(), RegistrationError> {
        self.check_types([data_type])?;
        let ty = self.type_mut(type_name)?;
        if ty.property(name).is_some() {
            return Err(RegistrationError::DuplicateProperty {
                owner: type_name.to_string(),
                property: name.to_string(),
            });
        }
        ty.properties.push(PropertyDescriptor {
            name: name.to_string(),
            data_type,
            byte_offset,
        });
        Ok(())
    }

    /// Register a constructor. An empty parameter list registers the
    /// default constructor.
    pub fn register_constructor(&mut self, type_name: &str, params: Params<'_>) -> Result<FunctionId, RegistrationError> {
        self.check_types(params.iter().map(|(dt, _)| *dt))?;
        let id = self.register_member(type_name, "$construct", DataType::void(), params, false)?;
        let ty = self.type_mut(type_name)?;
        if params.is_empty() {
            ty.behaviours.default_construct = Some(id);
        } else {
            ty.behaviours.constructors.push(id);
        }
        Ok(id)
    }

    pub fn register_destructor(&mut self, type_name: &str) -> Result<FunctionId, RegistrationError> {
        let id = self.register_member(type_name, "$destruct", DataType::void(), &[], false)?;
        self.type_mut(type_name)?.behaviours.destruct = Some(id);
        Ok(id)
    }

    /// Reference counting is only allowed on reference types.
    pub fn register_addref(&mut self, type_name: &str) -> Result<FunctionId, RegistrationError> {
        self.forbid_on_value_type(type_name, "addref")?;
        let id = self.register_member(type_name, "$addref", DataType::void(), &[], false)?;
        self.type_mut(type_name)?.behaviours.addref = Some(id);
        Ok(id)
    }

    pub fn register_release(&mut self, type_name: &str) -> Result<FunctionId, RegistrationError> {
        self.forbid_on_value_type(type_name, "release")?;
        let id = self.register_member(type_name, "$release", DataType::void(), &[], false)?;
        self.type_mut(type_name)?.behaviours.release = Some(id);
        Ok(id)
    }

    fn forbid_on_value_type(&mut self, type_name: &str, behaviour: &'static str) -> Result<(), RegistrationError> {
        if self.type_mut(type_name)?.flags.contains(TypeFlags::VALUE) {
            return Err(RegistrationError::ForbiddenBehaviour {
                type_name: type_name.to_string(),
                behaviour,
                reason: "value types are not reference counted".to_string(),
            });
        }
        Ok(())
    }

    /// Whole-object assignment `T &opAssign(const T &in)`.
    pub fn register_copy(&mut self, type_name: &str) -> Result<FunctionId, RegistrationError> {
        let hash = self.type_mut(type_name)?.hash;
        let this = DataType::object(hash);
        let id = self.register_member(
            type_name,
            "$copy",
            this.with_reference(true),
            &[(this.with_read_only(true), RefModifier::In)],
            false,
        )?;
        self.type_mut(type_name)?.behaviours.copy = Some(id);
        Ok(id)
    }

    /// Register an operator implemented as a method of the type: assignment
    /// forms (`=`, `+=`, ...), binary operators with the object on the left,
    /// unary operators and `[]`.
    pub fn register_operator(
        &mut self,
        type_name: &str,
        op: Operator,
        return_type: DataType,
        params: Params<'_>,
        read_only: bool,
    ) -> Result<FunctionId, RegistrationError> {
        let expected = match op {
            Operator::Negate | Operator::Plus | Operator::Not | Operator::BitNot => 0,
            Operator::Increment | Operator::Decrement | Operator::Handle => {
                return Err(RegistrationError::ForbiddenBehaviour {
                    type_name: type_name.to_string(),
                    behaviour: "operator",
                    reason: format!("'{op}' cannot be overloaded"),
                });
            }
            _ => 1,
        };
        if params.len() != expected {
            return Err(RegistrationError::ForbiddenBehaviour {
                type_name: type_name.to_string(),
                behaviour: "operator",
                reason: format!("'{op}' takes {expected} parameter(s)"),
            });
        }
        self.check_types(params.iter().map(|(dt, _)| *dt).chain([return_type]))?;
        let name = format!("operator{}", op.symbol());
        let id = self.register_member(type_name, &name, return_type, params, read_only)?;
        self.type_mut(type_name)?.behaviours.operators.push((op, id));
        Ok(id)
    }

    pub fn register_method(
        &mut self,
        type_name: &str,
        name: &str,
        return_type: DataType,
        params: Params<'_>,
        read_only: bool,
    ) -> Result<FunctionId, RegistrationError> {
        self.check_types(params.iter().map(|(dt, _)| *dt).chain([return_type]))?;
        let id = self.register_member(type_name, name, return_type, params, read_only)?;
        self.type_mut(type_name)?.methods.push(id);
        Ok(id)
    }

    fn register_member(
        &mut self,
        type_name: &str,
        name: &str,
        return_type: DataType,
        params: Params<'_>,
        read_only: bool,
    ) -> Result<FunctionId, RegistrationError> {
        let owner = self.type_mut(type_name)?.hash;
        let mut desc = describe(name, return_type, params);
        desc.object_type = Some(owner);
        desc.is_read_only = read_only;
        Ok(self.add_function(desc))
    }

    // ==========================================================================
    // Global Functions
    // ==========================================================================

    pub fn register_global_function(
        &mut self,
        name: &str,
        return_type: DataType,
        params: Params<'_>,
    ) -> Result<FunctionId, RegistrationError> {
        self.check_types(params.iter().map(|(dt, _)| *dt).chain([return_type]))?;
        let id = self.add_function(describe(name, return_type, params));
        self.global_functions.entry(name.to_string()).or_default().push(id);
        Ok(id)
    }

    /// Binary operator taking both operands as parameters.
    pub fn register_global_operator(
        &mut self,
        op: Operator,
        return_type: DataType,
        params: Params<'_>,
    ) -> Result<FunctionId, RegistrationError> {
        if op.precedence().is_none() || params.len() != 2 {
            return Err(RegistrationError::ForbiddenBehaviour {
                type_name: String::new(),
                behaviour: "operator",
                reason: format!("'{op}' is not a binary operator taking two operands"),
            });
        }
        self.check_types(params.iter().map(|(dt, _)| *dt).chain([return_type]))?;
        let name = format!("operator{}", op.symbol());
        let id = self.add_function(describe(&name, return_type, params));
        self.global_operators.push((op, id));
        Ok(id)
    }

    // ==========================================================================
    // Global Properties
    // ==========================================================================

    /// Register a host variable. Returns its slot index.
    pub fn register_global_property(&mut self, name: &str, data_type: DataType) -> Result<u32, RegistrationError> {
        self.add_property(name, data_type, None)
    }

    /// Register a read-only primitive whose value scripts may inline.
    /// `value` holds the raw bits of the value in the type's representation.
    pub fn register_global_constant(&mut self, name: &str, data_type: DataType, value: u64) -> Result<u32, RegistrationError> {
        if !data_type.is_primitive() {
            return Err(RegistrationError::ForbiddenBehaviour {
                type_name: data_type.to_string(),
                behaviour: "constant",
                reason: "only primitives can be registered as constants".to_string(),
            });
        }
        self.add_property(name, data_type.with_read_only(true), Some(value))
    }

    fn add_property(&mut self, name: &str, data_type: DataType, constant: Option<u64>) -> Result<u32, RegistrationError> {
        if self.property_names.contains_key(name) {
            return Err(RegistrationError::DuplicateGlobalProperty(name.to_string()));
        }
        self.check_types([data_type])?;
        let index = self.properties.len() as u32;
        self.properties.push(GlobalProperty {
            name: name.to_string(),
            data_type,
            index,
            constant,
            group: self.current_group,
        });
        self.property_names.insert(name.to_string(), index as usize);
        Ok(index)
    }

    // ==========================================================================
    // String Factory
    // ==========================================================================

    /// Declare `type_name` as the type of string constants. The factory
    /// receives the string buffer pushed by `STR` and returns the object.
    pub fn register_string_factory(&mut self, type_name: &str) -> Result<FunctionId, RegistrationError> {
        if self.string_factory.is_some() {
            return Err(RegistrationError::DuplicateStringFactory);
        }
        let hash = self.type_mut(type_name)?.hash;
        let id = self.add_function(describe("$string_factory", DataType::object(hash), &[]));
        self.string_factory = Some(id);
        Ok(id)
    }

    // ==========================================================================
    // Config Groups
    // ==========================================================================

    /// Start tagging registrations with `name`. Reopening an existing group
    /// continues it.
    pub fn begin_config_group(&mut self, name: &str) -> GroupId {
        let id = match self.groups.iter().find(|g| g.name == name) {
            Some(group) => group.id,
            None => {
                let id = GroupId(self.groups.len() as u32);
                self.groups.push(ConfigGroup::new(id, name));
                id
            }
        };
        self.current_group = Some(id);
        id
    }

    pub fn end_config_group(&mut self) {
        self.current_group = None;
    }

    pub fn set_module_access(&mut self, group: &str, module: &str, allowed: bool) -> Result<(), RegistrationError> {
        self.group_mut(group)?.set_module_access(module, allowed);
        Ok(())
    }

    /// Access for modules the group has no explicit entry for.
    pub fn set_default_access(&mut self, group: &str, allowed: bool) -> Result<(), RegistrationError> {
        self.group_mut(group)?.default_access = allowed;
        Ok(())
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut ConfigGroup, RegistrationError> {
        self.groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| RegistrationError::UnknownGroup(name.to_string()))
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    pub fn types(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.values()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn global_properties(&self) -> &[GlobalProperty] {
        &self.properties
    }
}

fn describe(name: &str, return_type: DataType, params: Params<'_>) -> FunctionDescriptor {
    params.iter().fold(
        FunctionDescriptor::new(FunctionId::System(0), name, return_type),
        |desc, (dt, mode)| desc.with_param(*dt, *mode),
    )
}

impl HostRegistry for Registry {
    fn object_type(&self, hash: TypeHash) -> Option<&ObjectType> {
        self.types.get(&hash)
    }

    fn object_type_by_name(&self, name: &str) -> Option<&ObjectType> {
        self.type_names.get(name).and_then(|hash| self.types.get(hash))
    }

    fn function(&self, id: FunctionId) -> Option<&FunctionDescriptor> {
        match id {
            FunctionId::System(index) => self.functions.get(index as usize),
            _ => None,
        }
    }

    fn global_functions(&self, name: &str) -> Vec<FunctionId> {
        self.global_functions.get(name).cloned().unwrap_or_default()
    }

    fn global_operators(&self, op: Operator) -> Vec<FunctionId> {
        self.global_operators
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, id)| *id)
            .collect()
    }

    fn global_property(&self, name: &str) -> Option<&GlobalProperty> {
        self.property_names.get(name).and_then(|&i| self.properties.get(i))
    }

    fn string_factory(&self) -> Option<FunctionId> {
        self.string_factory
    }

    fn script_struct_support(&self) -> ScriptStructSupport {
        self.struct_support
    }

    fn array_template(&self) -> ArrayTemplate {
        self.array_template
    }

    fn group_name(&self, group: GroupId) -> Option<&str> {
        self.groups.get(group.0 as usize).map(|g| g.name.as_str())
    }

    fn has_module_access(&self, group: GroupId, module: &str) -> bool {
        self.groups.get(group.0 as usize).is_none_or(|g| g.allows(module))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types.len())
            .field("functions", &self.functions.len())
            .field("properties", &self.properties.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float() -> DataType {
        DataType::primitive(PrimitiveKind::Float)
    }

    #[test]
    fn new_registry_has_only_builtins() {
        let registry = Registry::new();
        assert_eq!(registry.type_count(), 0);
        assert_eq!(registry.property_count(), 0);
        // four struct behaviours and eight array template functions
        assert_eq!(registry.function_count(), 12);
        assert!(registry.string_factory().is_none());
    }

    #[test]
    fn builtin_array_index_uses_placeholders() {
        let registry = Registry::new();
        let template = registry.array_template();
        let index = registry.function(template.index).unwrap();
        assert_eq!(index.return_type.object_hash(), Some(SUB_TYPE));
        assert!(index.return_type.is_reference);
        let index_const = registry.function(template.index_const).unwrap();
        assert!(index_const.is_read_only);
        assert!(index_const.return_type.is_read_only);
        let length = registry.function(template.length).unwrap();
        assert_eq!(length.name, "length");
        assert_eq!(length.return_type, DataType::uint());
    }

    #[test]
    fn duplicate_type_error() {
        let mut registry = Registry::new();
        registry.register_object_type("Vec3", TypeFlags::VALUE, 12).unwrap();
        let result = registry.register_object_type("Vec3", TypeFlags::VALUE, 12);
        assert!(matches!(result, Err(RegistrationError::DuplicateType(_))));
        let result = registry.register_object_type("int", TypeFlags::VALUE, 4);
        assert!(matches!(result, Err(RegistrationError::DuplicateType(_))));
    }

    #[test]
    fn type_needs_value_or_ref() {
        let mut registry = Registry::new();
        let result = registry.register_object_type("Both", TypeFlags::VALUE | TypeFlags::REF, 4);
        assert!(matches!(result, Err(RegistrationError::ForbiddenBehaviour { .. })));
    }

    #[test]
    fn properties_and_duplicates() {
        let mut registry = Registry::new();
        registry.register_object_type("Vec3", TypeFlags::VALUE | TypeFlags::POD, 12).unwrap();
        registry.register_object_property("Vec3", "x", float(), 0).unwrap();
        registry.register_object_property("Vec3", "y", float(), 4).unwrap();
        let dup = registry.register_object_property("Vec3", "x", float(), 8);
        assert!(matches!(dup, Err(RegistrationError::DuplicateProperty { .. })));

        let ty = registry.object_type_by_name("Vec3").unwrap();
        assert_eq!(ty.property("y").map(|p| p.byte_offset), Some(4));
    }

    #[test]
    fn unknown_type_in_declaration() {
        let mut registry = Registry::new();
        let missing = DataType::object(TypeHash::from_name("Missing"));
        let result = registry.register_global_function("f", DataType::void(), &[(missing, RefModifier::None)]);
        assert!(matches!(result, Err(RegistrationError::TypeNotFound(_))));
        let result = registry.register_object_property("Missing", "x", float(), 0);
        assert!(matches!(result, Err(RegistrationError::TypeNotFound(_))));
    }

    #[test]
    fn behaviours_are_recorded() {
        let mut registry = Registry::new();
        registry.register_object_type("Node", TypeFlags::REF, 8).unwrap();
        let ctor = registry.register_constructor("Node", &[]).unwrap();
        let ctor_int = registry.register_constructor("Node", &[(DataType::int(), RefModifier::None)]).unwrap();
        let addref = registry.register_addref("Node").unwrap();
        let release = registry.register_release("Node").unwrap();
        let copy = registry.register_copy("Node").unwrap();

        let ty = registry.object_type_by_name("Node").unwrap();
        assert_eq!(ty.behaviours.default_construct, Some(ctor));
        assert_eq!(ty.behaviours.constructors, vec![ctor_int]);
        assert_eq!(ty.behaviours.addref, Some(addref));
        assert_eq!(ty.behaviours.release, Some(release));
        assert_eq!(ty.behaviours.copy, Some(copy));
        assert!(ty.behaviours.supports_handles());

        let copy_desc = registry.function(copy).unwrap();
        assert_eq!(copy_desc.object_type, Some(ty.hash));
        assert_eq!(copy_desc.param_modes, vec![RefModifier::In]);
    }

    #[test]
    fn value_types_cannot_be_reference_counted() {
        let mut registry = Registry::new();
        registry.register_object_type("Vec3", TypeFlags::VALUE, 12).unwrap();
        let result = registry.register_addref("Vec3");
        assert!(matches!(
            result,
            Err(RegistrationError::ForbiddenBehaviour { behaviour: "addref", .. })
        ));
    }

    #[test]
    fn operator_arity_is_checked() {
        let mut registry = Registry::new();
        let hash = registry.register_object_type("Str", TypeFlags::VALUE, 16).unwrap();
        let this = DataType::object(hash);
        registry
            .register_operator("Str", Operator::AddAssign, this.with_reference(true), &[(this.with_read_only(true), RefModifier::In)], false)
            .unwrap();
        let bad = registry.register_operator("Str", Operator::Negate, this, &[(this, RefModifier::None)], true);
        assert!(bad.is_err());
        let bad = registry.register_operator("Str", Operator::Increment, this, &[], false);
        assert!(bad.is_err());

        let ty = registry.object_type_by_name("Str").unwrap();
        assert_eq!(ty.behaviours.operators_for(Operator::AddAssign).count(), 1);
    }

    #[test]
    fn global_functions_keep_overload_order() {
        let mut registry = Registry::new();
        let a = registry.register_global_function("print", DataType::void(), &[(DataType::int(), RefModifier::None)]).unwrap();
        let b = registry.register_global_function("print", DataType::void(), &[(float(), RefModifier::None)]).unwrap();
        assert_eq!(registry.global_functions("print"), vec![a, b]);
        assert!(registry.global_functions("missing").is_empty());
    }

    #[test]
    fn global_operators_need_two_operands() {
        let mut registry = Registry::new();
        let hash = registry.register_object_type("Str", TypeFlags::VALUE, 16).unwrap();
        let s = DataType::object(hash);
        let add = registry
            .register_global_operator(Operator::Add, s, &[(s, RefModifier::In), (DataType::int(), RefModifier::None)])
            .unwrap();
        assert_eq!(registry.global_operators(Operator::Add), vec![add]);
        assert!(registry.register_global_operator(Operator::Not, s, &[(s, RefModifier::In)]).is_err());
    }

    #[test]
    fn global_properties_and_constants() {
        let mut registry = Registry::new();
        let first = registry.register_global_property("score", DataType::int()).unwrap();
        let second = registry.register_global_constant("PI", float(), f32::to_bits(2.5) as u64).unwrap();
        assert_eq!((first, second), (0, 1));

        let pi = registry.global_property("PI").unwrap();
        assert!(pi.is_pure_constant());
        assert!(pi.data_type.is_read_only);
        assert!(matches!(
            registry.register_global_property("score", DataType::int()),
            Err(RegistrationError::DuplicateGlobalProperty(_))
        ));
    }

    #[test]
    fn string_factory_registers_once() {
        let mut registry = Registry::new();
        let hash = registry.register_object_type("string", TypeFlags::VALUE, 16).unwrap();
        let factory = registry.register_string_factory("string").unwrap();
        assert_eq!(registry.string_factory(), Some(factory));
        assert_eq!(registry.function(factory).unwrap().return_type, DataType::object(hash));
        assert!(matches!(
            registry.register_string_factory("string"),
            Err(RegistrationError::DuplicateStringFactory)
        ));
    }

    #[test]
    fn config_groups_gate_visibility() {
        let mut registry = Registry::new();
        let group = registry.begin_config_group("io");
        registry.register_global_function("write", DataType::void(), &[]).unwrap();
        registry.register_global_property("stdout_open", DataType::bool()).unwrap();
        registry.end_config_group();
        registry.register_global_function("len", DataType::int(), &[]).unwrap();

        registry.set_default_access("io", false).unwrap();
        registry.set_module_access("io", "tools", true).unwrap();

        let write = registry.global_functions("write")[0];
        let desc = registry.function(write).unwrap();
        assert_eq!(desc.group, Some(group));
        assert!(!registry.is_visible(desc.group, "main"));
        assert!(registry.is_visible(desc.group, "tools"));

        let len = registry.global_functions("len")[0];
        assert!(registry.is_visible(registry.function(len).unwrap().group, "main"));
        assert_eq!(registry.group_name(group), Some("io"));
        assert!(matches!(
            registry.set_module_access("missing", "main", true),
            Err(RegistrationError::UnknownGroup(_))
        ));
    }

    #[test]
    fn reopening_a_group_keeps_its_id() {
        let mut registry = Registry::new();
        let first = registry.begin_config_group("math");
        registry.end_config_group();
        let second = registry.begin_config_group("math");
        assert_eq!(first, second);
    }
}
