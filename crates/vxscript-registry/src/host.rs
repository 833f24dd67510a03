//! The read-only view the compiler has of host registrations.

use vxscript_core::{
    DataType, FunctionDescriptor, FunctionId, GroupId, ObjectType, Operator, TypeHash,
};

/// Placeholder for the instance type in template and script-struct
/// behaviour signatures.
pub const SELF_TYPE: TypeHash = TypeHash(0x5e1f_0000_0000_0001);

/// Placeholder for the element type in array template signatures.
pub const SUB_TYPE: TypeHash = TypeHash(0x5e1f_0000_0000_0002);

/// Template hash that array instances are derived from.
pub fn array_template_hash() -> TypeHash {
    TypeHash::from_name("array")
}

/// A variable owned by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalProperty {
    pub name: String,
    pub data_type: DataType,
    /// Slot in the host's property table, used by `PGA`/`LDG`.
    pub index: u32,
    /// Raw value bits when the property is a registered constant.
    pub constant: Option<u64>,
    pub group: Option<GroupId>,
}

impl GlobalProperty {
    #[inline]
    pub fn is_pure_constant(&self) -> bool {
        self.constant.is_some()
    }
}

/// Behaviours the host provides for every script-declared struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStructSupport {
    pub construct: FunctionId,
    pub addref: FunctionId,
    pub release: FunctionId,
    pub copy: FunctionId,
}

/// Behaviours and methods shared by every `T[]` instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayTemplate {
    pub default_construct: FunctionId,
    /// Constructor taking the initial length.
    pub construct_with_length: FunctionId,
    pub addref: FunctionId,
    pub release: FunctionId,
    pub copy: FunctionId,
    pub index: FunctionId,
    pub index_const: FunctionId,
    pub length: FunctionId,
}

/// Read interface over host registrations. The compiler never mutates it.
pub trait HostRegistry {
    fn object_type(&self, hash: TypeHash) -> Option<&ObjectType>;

    fn object_type_by_name(&self, name: &str) -> Option<&ObjectType>;

    /// Descriptor of a host function, method or behaviour.
    fn function(&self, id: FunctionId) -> Option<&FunctionDescriptor>;

    /// Global functions registered under `name`, in registration order.
    fn global_functions(&self, name: &str) -> Vec<FunctionId>;

    /// Global (non-member) overloads of a binary operator.
    fn global_operators(&self, op: Operator) -> Vec<FunctionId>;

    fn global_property(&self, name: &str) -> Option<&GlobalProperty>;

    /// Function turning a string constant into a string object.
    fn string_factory(&self) -> Option<FunctionId>;

    fn script_struct_support(&self) -> ScriptStructSupport;

    fn array_template(&self) -> ArrayTemplate;

    fn group_name(&self, group: GroupId) -> Option<&str>;

    /// Whether `module` may use symbols registered in `group`.
    fn has_module_access(&self, group: GroupId, module: &str) -> bool;

    /// Visibility predicate applied to every lookup.
    fn is_visible(&self, group: Option<GroupId>, module: &str) -> bool {
        group.is_none_or(|g| self.has_module_access(g, module))
    }
}

/// Substitute template placeholders in a behaviour or method signature.
pub fn instantiate_signature(
    desc: &FunctionDescriptor,
    self_type: TypeHash,
    sub_type: Option<DataType>,
) -> FunctionDescriptor {
    let mut out = desc.clone();
    out.return_type = substitute(out.return_type, self_type, sub_type);
    for param in &mut out.params {
        *param = substitute(*param, self_type, sub_type);
    }
    if out.object_type.is_some() {
        out.object_type = Some(self_type);
    }
    out
}

fn substitute(dt: DataType, self_type: TypeHash, sub_type: Option<DataType>) -> DataType {
    match dt.object_hash() {
        Some(hash) if hash == SELF_TYPE => DataType {
            base: vxscript_core::BaseType::Object(self_type),
            ..dt
        },
        Some(hash) if hash == SUB_TYPE => match sub_type {
            Some(sub) => DataType {
                base: sub.base,
                is_handle: sub.is_handle || dt.is_handle,
                is_read_only: dt.is_read_only || sub.is_read_only,
                is_reference: dt.is_reference,
            },
            None => dt,
        },
        _ => dt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vxscript_core::{PrimitiveKind, RefModifier};

    #[test]
    fn placeholders_are_replaced() {
        let instance = TypeHash::from_name("int[]");
        let desc = FunctionDescriptor::new(FunctionId::System(3), "$index", DataType::object(SUB_TYPE).with_reference(true))
            .with_param(DataType::uint(), RefModifier::None);
        let mut desc = desc;
        desc.object_type = Some(SELF_TYPE);

        let sub = DataType::primitive(PrimitiveKind::Float);
        let out = instantiate_signature(&desc, instance, Some(sub));
        assert_eq!(out.return_type, sub.with_reference(true));
        assert_eq!(out.object_type, Some(instance));
        assert_eq!(out.params[0], DataType::uint());
    }

    #[test]
    fn self_type_keeps_flags() {
        let instance = TypeHash::from_name("Point");
        let desc = FunctionDescriptor::new(FunctionId::System(1), "$copy", DataType::object(SELF_TYPE).with_reference(true))
            .with_param(DataType::object(SELF_TYPE).with_read_only(true), RefModifier::In);
        let out = instantiate_signature(&desc, instance, None);
        assert_eq!(out.params[0].object_hash(), Some(instance));
        assert!(out.params[0].is_read_only);
        assert!(out.params[0].is_reference);
    }
}
