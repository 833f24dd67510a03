//! Object type descriptors shared by host types, script structs and arrays.

use crate::{DataType, FunctionId, Operator, TypeHash};

/// Identifier of a host configuration group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

bitflags::bitflags! {
    /// Properties of an object type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        /// Value semantics: copied on assignment, no handles unless ref counted.
        const VALUE = 1 << 0;
        /// Reference semantics.
        const REF = 1 << 1;
        /// Declared by a script `struct`.
        const SCRIPT_STRUCT = 1 << 2;
        /// Instance of the built-in array template.
        const ARRAY = 1 << 3;
        /// May take part in a reference cycle; the VM's collector must track it.
        const GC = 1 << 4;
        /// Plain old data: a byte copy is a valid assignment.
        const POD = 1 << 5;
    }
}

/// A member variable of an object type.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub data_type: DataType,
    /// Byte offset inside the object.
    pub byte_offset: u32,
}

/// Special functions attached to an object type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Behaviours {
    /// Constructor taking no arguments.
    pub default_construct: Option<FunctionId>,
    /// Constructors taking arguments.
    pub constructors: Vec<FunctionId>,
    pub destruct: Option<FunctionId>,
    pub addref: Option<FunctionId>,
    pub release: Option<FunctionId>,
    /// Whole-object copy used by plain assignment.
    pub copy: Option<FunctionId>,
    /// Overloaded operators implemented as methods of the type.
    pub operators: Vec<(Operator, FunctionId)>,
}

impl Behaviours {
    /// Both halves of reference counting are registered.
    pub fn supports_handles(&self) -> bool {
        self.addref.is_some() && self.release.is_some()
    }

    pub fn operators_for(&self, op: Operator) -> impl Iterator<Item = FunctionId> + '_ {
        self.operators.iter().filter(move |(o, _)| *o == op).map(|(_, f)| *f)
    }
}

/// A registered or declared object type.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub hash: TypeHash,
    pub flags: TypeFlags,
    /// Size of an instance in bytes. Zero means the type cannot be byte copied.
    pub size: u32,
    pub properties: Vec<PropertyDescriptor>,
    pub behaviours: Behaviours,
    pub methods: Vec<FunctionId>,
    /// Element type of an array instance.
    pub sub_type: Option<DataType>,
    /// Config group the type was registered in, if any.
    pub group: Option<GroupId>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>, flags: TypeFlags, size: u32) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_name(&name),
            name,
            flags,
            size,
            properties: Vec::new(),
            behaviours: Behaviours::default(),
            methods: Vec::new(),
            sub_type: None,
            group: None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    #[inline]
    pub fn is_script_struct(&self) -> bool {
        self.flags.contains(TypeFlags::SCRIPT_STRUCT)
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.flags.contains(TypeFlags::ARRAY)
    }

    #[inline]
    pub fn is_gc(&self) -> bool {
        self.flags.contains(TypeFlags::GC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_type_hashes_its_name() {
        let ty = ObjectType::new("Vec3", TypeFlags::VALUE | TypeFlags::POD, 12);
        assert_eq!(ty.hash, TypeHash::from_name("Vec3"));
        assert!(!ty.is_script_struct());
        assert!(ty.property("x").is_none());
    }

    #[test]
    fn handle_support_needs_both_behaviours() {
        let mut beh = Behaviours {
            addref: Some(FunctionId::System(1)),
            ..Behaviours::default()
        };
        assert!(!beh.supports_handles());
        beh.release = Some(FunctionId::System(2));
        assert!(beh.supports_handles());
    }

    #[test]
    fn operator_lookup_filters_by_operator() {
        let beh = Behaviours {
            operators: vec![
                (Operator::Index, FunctionId::System(4)),
                (Operator::AddAssign, FunctionId::System(5)),
                (Operator::Index, FunctionId::System(6)),
            ],
            ..Behaviours::default()
        };
        let found: Vec<_> = beh.operators_for(Operator::Index).collect();
        assert_eq!(found, vec![FunctionId::System(4), FunctionId::System(6)]);
    }
}
