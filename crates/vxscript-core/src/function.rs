//! Function descriptors.

use std::fmt;

use crate::{DataType, GroupId, RefModifier, TypeHash};

/// Where a function lives and how the VM calls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionId {
    /// Host function, called with `CALLSYS`.
    System(u32),
    /// Function compiled from script source in this module, called with `CALL`.
    Script(u32),
    /// Function imported from another module, called with `CALLBND`.
    Imported(u32),
}

impl FunctionId {
    /// Index inside the owning table.
    pub const fn index(self) -> u32 {
        match self {
            FunctionId::System(i) | FunctionId::Script(i) | FunctionId::Imported(i) => i,
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionId::System(i) => write!(f, "sys#{i}"),
            FunctionId::Script(i) => write!(f, "script#{i}"),
            FunctionId::Imported(i) => write!(f, "import#{i}"),
        }
    }
}

/// Signature and identity of a function, method or behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    pub id: FunctionId,
    pub name: String,
    pub return_type: DataType,
    pub params: Vec<DataType>,
    /// One entry per parameter.
    pub param_modes: Vec<RefModifier>,
    /// Const method: callable on read-only objects.
    pub is_read_only: bool,
    /// Owning type for methods and behaviours.
    pub object_type: Option<TypeHash>,
    pub group: Option<GroupId>,
}

impl FunctionDescriptor {
    pub fn new(id: FunctionId, name: impl Into<String>, return_type: DataType) -> Self {
        Self {
            id,
            name: name.into(),
            return_type,
            params: Vec::new(),
            param_modes: Vec::new(),
            is_read_only: false,
            object_type: None,
            group: None,
        }
    }

    /// Builder-style parameter append.
    pub fn with_param(mut self, data_type: DataType, mode: RefModifier) -> Self {
        let data_type = if mode == RefModifier::None {
            data_type
        } else {
            data_type.with_reference(true)
        };
        self.params.push(data_type);
        self.param_modes.push(mode);
        self
    }

    /// Dwords the arguments occupy on the value stack, excluding the object pointer.
    pub fn space_needed_for_arguments(&self) -> u32 {
        self.params.iter().map(DataType::size_on_stack_dwords).sum()
    }

    #[inline]
    pub fn is_method(&self) -> bool {
        self.object_type.is_some()
    }

    /// Same parameter list, ignoring names and return type.
    pub fn same_parameters(&self, other: &FunctionDescriptor) -> bool {
        self.params == other.params && self.param_modes == other.param_modes && self.is_read_only == other.is_read_only
    }

    /// Human readable declaration, with type names resolved by `type_name`.
    pub fn declaration(&self, type_name: impl Fn(&DataType) -> String) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .zip(&self.param_modes)
            .map(|(p, mode)| {
                let base = type_name(&p.with_reference(false));
                match mode {
                    RefModifier::None => base,
                    m => format!("{base} {m}"),
                }
            })
            .collect();
        let mut decl = format!("{} {}({})", type_name(&self.return_type), self.name, params.join(", "));
        if self.is_read_only {
            decl.push_str(" const");
        }
        decl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PrimitiveKind;

    fn name_of(dt: &DataType) -> String {
        dt.to_string()
    }

    #[test]
    fn argument_space() {
        let f = FunctionDescriptor::new(FunctionId::Script(0), "f", DataType::void())
            .with_param(DataType::primitive(PrimitiveKind::Double), RefModifier::None)
            .with_param(DataType::int(), RefModifier::Out);
        // double by value takes two dwords, a reference one
        assert_eq!(f.space_needed_for_arguments(), 3);
        assert!(f.params[1].is_reference);
    }

    #[test]
    fn declaration_text() {
        let mut f = FunctionDescriptor::new(FunctionId::System(3), "get", DataType::int())
            .with_param(DataType::uint(), RefModifier::In);
        f.is_read_only = true;
        assert_eq!(f.declaration(name_of), "int get(uint &in) const");
    }

    #[test]
    fn identical_parameter_lists() {
        let a = FunctionDescriptor::new(FunctionId::Script(0), "a", DataType::void())
            .with_param(DataType::int(), RefModifier::None);
        let b = FunctionDescriptor::new(FunctionId::Script(1), "a", DataType::int())
            .with_param(DataType::int(), RefModifier::None);
        let c = FunctionDescriptor::new(FunctionId::Script(2), "a", DataType::void())
            .with_param(DataType::int(), RefModifier::In);
        assert!(a.same_parameters(&b));
        assert!(!a.same_parameters(&c));
    }

    #[test]
    fn id_index_and_display() {
        assert_eq!(FunctionId::Imported(7).index(), 7);
        assert_eq!(FunctionId::System(2).to_string(), "sys#2");
    }
}
