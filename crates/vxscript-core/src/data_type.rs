//! The data type descriptor.
//!
//! A [`DataType`] is a small `Copy` value: a base (primitive kind, object type
//! identity, or the type of `null`) plus three flags. The compiler compares
//! data types under three relaxed equalities besides `==`, and overload
//! resolution is built on those tiers:
//!
//! | comparison | ignores |
//! |---|---|
//! | `==` | nothing |
//! | [`DataType::equal_except_ref`] | reference flag |
//! | [`DataType::equal_except_ref_and_const`] | reference and read-only flags |
//! | [`DataType::equal_except_const`] | read-only flag |
//!
//! ```
//! use vxscript_core::{DataType, PrimitiveKind};
//!
//! let int = DataType::primitive(PrimitiveKind::Int32);
//! let const_int_ref = int.with_read_only(true).with_reference(true);
//! assert!(int.equal_except_ref_and_const(&const_int_ref));
//! assert!(!int.equal_except_ref(&const_int_ref));
//! ```

use std::fmt::{self, Display, Formatter};

use crate::TypeHash;

/// Built-in value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    UInt8,
    UInt16,
    UInt32,
    Bits8,
    Bits16,
    Bits32,
    Float,
    Double,
}

impl PrimitiveKind {
    /// Keyword spelling of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int8 => "int8",
            PrimitiveKind::Int16 => "int16",
            PrimitiveKind::Int32 => "int",
            PrimitiveKind::UInt8 => "uint8",
            PrimitiveKind::UInt16 => "uint16",
            PrimitiveKind::UInt32 => "uint",
            PrimitiveKind::Bits8 => "bits8",
            PrimitiveKind::Bits16 => "bits16",
            PrimitiveKind::Bits32 => "bits",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "void" => PrimitiveKind::Void,
            "bool" => PrimitiveKind::Bool,
            "int8" => PrimitiveKind::Int8,
            "int16" => PrimitiveKind::Int16,
            "int" => PrimitiveKind::Int32,
            "uint8" => PrimitiveKind::UInt8,
            "uint16" => PrimitiveKind::UInt16,
            "uint" => PrimitiveKind::UInt32,
            "bits8" => PrimitiveKind::Bits8,
            "bits16" => PrimitiveKind::Bits16,
            "bits" => PrimitiveKind::Bits32,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            _ => return None,
        })
    }

    /// Size of a value of this kind in memory.
    pub const fn size_in_bytes(self) -> u32 {
        match self {
            PrimitiveKind::Void => 0,
            PrimitiveKind::Bool | PrimitiveKind::Int8 | PrimitiveKind::UInt8 | PrimitiveKind::Bits8 => 1,
            PrimitiveKind::Int16 | PrimitiveKind::UInt16 | PrimitiveKind::Bits16 => 2,
            PrimitiveKind::Int32 | PrimitiveKind::UInt32 | PrimitiveKind::Bits32 | PrimitiveKind::Float => 4,
            PrimitiveKind::Double => 8,
        }
    }

    /// Signed integer kinds.
    pub const fn is_integer(self) -> bool {
        matches!(self, PrimitiveKind::Int8 | PrimitiveKind::Int16 | PrimitiveKind::Int32)
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(self, PrimitiveKind::UInt8 | PrimitiveKind::UInt16 | PrimitiveKind::UInt32)
    }

    pub const fn is_bits(self) -> bool {
        matches!(self, PrimitiveKind::Bits8 | PrimitiveKind::Bits16 | PrimitiveKind::Bits32)
    }

    /// Kind of the same family with the given byte size (1, 2 or 4).
    ///
    /// Only integer, unsigned and bits families have sized variants.
    pub const fn with_size(self, bytes: u32) -> Option<Self> {
        use PrimitiveKind::*;
        let family = if self.is_integer() {
            [Int8, Int16, Int32]
        } else if self.is_unsigned() {
            [UInt8, UInt16, UInt32]
        } else if self.is_bits() {
            [Bits8, Bits16, Bits32]
        } else {
            return None;
        };
        match bytes {
            1 => Some(family[0]),
            2 => Some(family[1]),
            4 => Some(family[2]),
            _ => None,
        }
    }

    /// Identity used when a primitive takes part in a template instance hash.
    pub fn identity(self) -> TypeHash {
        TypeHash::from_name(self.name())
    }
}

/// What a data type is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Primitive(PrimitiveKind),
    /// A host type, script struct or array instance.
    Object(TypeHash),
    /// The type of the `null` literal; converts to any handle.
    Null,
}

/// Parameter reference mode (`&in`, `&out`, `&inout`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefModifier {
    /// Passed by value.
    #[default]
    None,
    In,
    Out,
    InOut,
}

impl RefModifier {
    /// Whether the callee reads the argument's value.
    pub const fn reads_value(self) -> bool {
        matches!(self, RefModifier::In | RefModifier::InOut)
    }

    /// Whether the callee writes a value back through the reference.
    pub const fn writes_value(self) -> bool {
        matches!(self, RefModifier::Out | RefModifier::InOut)
    }
}

impl Display for RefModifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RefModifier::None => Ok(()),
            RefModifier::In => write!(f, "&in"),
            RefModifier::Out => write!(f, "&out"),
            RefModifier::InOut => write!(f, "&inout"),
        }
    }
}

/// A complete type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    pub base: BaseType,
    /// `const` for values, read-only target for references.
    pub is_read_only: bool,
    /// The value is an address rather than the value itself.
    pub is_reference: bool,
    /// A reference-counted handle (`@`).
    pub is_handle: bool,
}

impl DataType {
    #[inline]
    pub const fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            base: BaseType::Primitive(kind),
            is_read_only: false,
            is_reference: false,
            is_handle: false,
        }
    }

    #[inline]
    pub const fn object(hash: TypeHash) -> Self {
        Self {
            base: BaseType::Object(hash),
            is_read_only: false,
            is_reference: false,
            is_handle: false,
        }
    }

    #[inline]
    pub const fn handle(hash: TypeHash) -> Self {
        Self {
            base: BaseType::Object(hash),
            is_read_only: false,
            is_reference: false,
            is_handle: true,
        }
    }

    /// Type of the `null` literal.
    #[inline]
    pub const fn null_handle() -> Self {
        Self {
            base: BaseType::Null,
            is_read_only: true,
            is_reference: false,
            is_handle: true,
        }
    }

    #[inline]
    pub const fn void() -> Self {
        Self::primitive(PrimitiveKind::Void)
    }

    #[inline]
    pub const fn bool() -> Self {
        Self::primitive(PrimitiveKind::Bool)
    }

    #[inline]
    pub const fn int() -> Self {
        Self::primitive(PrimitiveKind::Int32)
    }

    #[inline]
    pub const fn uint() -> Self {
        Self::primitive(PrimitiveKind::UInt32)
    }

    #[inline]
    pub const fn with_read_only(self, is_read_only: bool) -> Self {
        Self { is_read_only, ..self }
    }

    #[inline]
    pub const fn with_reference(self, is_reference: bool) -> Self {
        Self { is_reference, ..self }
    }

    #[inline]
    pub const fn with_handle(self, is_handle: bool) -> Self {
        Self { is_handle, ..self }
    }

    /// Same flags, different primitive kind.
    #[inline]
    pub const fn with_kind(self, kind: PrimitiveKind) -> Self {
        Self {
            base: BaseType::Primitive(kind),
            ..self
        }
    }

    #[inline]
    pub const fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.base {
            BaseType::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    #[inline]
    pub const fn object_hash(&self) -> Option<TypeHash> {
        match self.base {
            BaseType::Object(hash) => Some(hash),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_primitive(&self) -> bool {
        matches!(self.base, BaseType::Primitive(_))
    }

    /// Object types by value, by reference or by handle, and `null`.
    #[inline]
    pub const fn is_object(&self) -> bool {
        !self.is_primitive()
    }

    #[inline]
    pub const fn is_object_handle(&self) -> bool {
        self.is_handle
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self.base, BaseType::Null)
    }

    #[inline]
    pub const fn is_void(&self) -> bool {
        matches!(self.base, BaseType::Primitive(PrimitiveKind::Void))
    }

    #[inline]
    pub const fn is_bool_type(&self) -> bool {
        matches!(self.base, BaseType::Primitive(PrimitiveKind::Bool))
    }

    /// Signed integer types.
    #[inline]
    pub const fn is_integer_type(&self) -> bool {
        match self.base {
            BaseType::Primitive(kind) => kind.is_integer(),
            _ => false,
        }
    }

    #[inline]
    pub const fn is_unsigned_type(&self) -> bool {
        match self.base {
            BaseType::Primitive(kind) => kind.is_unsigned(),
            _ => false,
        }
    }

    #[inline]
    pub const fn is_bit_vector_type(&self) -> bool {
        match self.base {
            BaseType::Primitive(kind) => kind.is_bits(),
            _ => false,
        }
    }

    #[inline]
    pub const fn is_float_type(&self) -> bool {
        matches!(self.base, BaseType::Primitive(PrimitiveKind::Float))
    }

    #[inline]
    pub const fn is_double_type(&self) -> bool {
        matches!(self.base, BaseType::Primitive(PrimitiveKind::Double))
    }

    /// Any integral type usable as a switch selector or case value.
    #[inline]
    pub const fn is_integral_type(&self) -> bool {
        self.is_integer_type() || self.is_unsigned_type()
    }

    /// Bytes a value occupies in memory. Objects and handles are addresses.
    pub const fn size_in_memory_bytes(&self) -> u32 {
        match self.base {
            BaseType::Primitive(kind) => kind.size_in_bytes(),
            _ => 4,
        }
    }

    /// Dwords a variable of this type occupies in the stack frame.
    pub const fn size_in_memory_dwords(&self) -> u32 {
        let bytes = self.size_in_memory_bytes();
        if bytes == 0 {
            0
        } else if bytes <= 4 {
            1
        } else {
            2
        }
    }

    /// Dwords an argument of this type occupies on the value stack.
    pub const fn size_on_stack_dwords(&self) -> u32 {
        if self.is_reference || self.is_object() {
            1
        } else {
            self.size_in_memory_dwords()
        }
    }

    pub fn equal_except_ref(&self, other: &DataType) -> bool {
        self.base == other.base && self.is_read_only == other.is_read_only && self.is_handle == other.is_handle
    }

    pub fn equal_except_ref_and_const(&self, other: &DataType) -> bool {
        self.base == other.base && self.is_handle == other.is_handle
    }

    pub fn equal_except_const(&self, other: &DataType) -> bool {
        self.base == other.base && self.is_reference == other.is_reference && self.is_handle == other.is_handle
    }

    /// Both types belong to the same primitive family, e.g. `int8` and `int`.
    pub fn same_primitive_base_type(&self, other: &DataType) -> bool {
        match (self.primitive_kind(), other.primitive_kind()) {
            (Some(a), Some(b)) => {
                (a.is_integer() && b.is_integer())
                    || (a.is_unsigned() && b.is_unsigned())
                    || (a.is_bits() && b.is_bits())
                    || (a == PrimitiveKind::Float && b == PrimitiveKind::Float)
                    || (a == PrimitiveKind::Double && b == PrimitiveKind::Double)
                    || (a == PrimitiveKind::Bool && b == PrimitiveKind::Bool)
            }
            _ => false,
        }
    }

    /// Identity of the base type, used for template instance hashing.
    pub fn identity(&self) -> TypeHash {
        match self.base {
            BaseType::Primitive(kind) => kind.identity(),
            BaseType::Object(hash) => {
                if self.is_handle {
                    TypeHash::from_template_instance(hash, &[])
                } else {
                    hash
                }
            }
            BaseType::Null => TypeHash::EMPTY,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_read_only {
            write!(f, "const ")?;
        }
        match self.base {
            BaseType::Primitive(kind) => write!(f, "{}", kind.name())?,
            BaseType::Object(hash) => write!(f, "{hash}")?,
            BaseType::Null => write!(f, "<null handle>")?,
        }
        if self.is_handle && !self.is_null() {
            write!(f, "@")?;
        }
        if self.is_reference {
            write!(f, "&")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_sizes() {
        assert_eq!(DataType::bool().size_in_memory_bytes(), 1);
        assert_eq!(DataType::bool().size_in_memory_dwords(), 1);
        assert_eq!(DataType::primitive(PrimitiveKind::Double).size_in_memory_dwords(), 2);
        assert_eq!(DataType::void().size_in_memory_dwords(), 0);
    }

    #[test]
    fn stack_size_of_references_and_objects() {
        let double_ref = DataType::primitive(PrimitiveKind::Double).with_reference(true);
        assert_eq!(double_ref.size_on_stack_dwords(), 1);
        let obj = DataType::object(TypeHash::from_name("obj"));
        assert_eq!(obj.size_on_stack_dwords(), 1);
    }

    #[test]
    fn equality_tiers() {
        let int = DataType::int();
        let const_int = int.with_read_only(true);
        let int_ref = int.with_reference(true);

        assert!(int.equal_except_ref(&int_ref));
        assert!(!int.equal_except_ref(&const_int));
        assert!(int.equal_except_ref_and_const(&const_int.with_reference(true)));
        assert!(int.equal_except_const(&const_int));
        assert!(!int.equal_except_const(&int_ref));
    }

    #[test]
    fn same_primitive_family() {
        let int8 = DataType::primitive(PrimitiveKind::Int8);
        let uint8 = DataType::primitive(PrimitiveKind::UInt8);
        assert!(int8.same_primitive_base_type(&DataType::int()));
        assert!(!int8.same_primitive_base_type(&uint8));
        assert!(!DataType::primitive(PrimitiveKind::Float)
            .same_primitive_base_type(&DataType::primitive(PrimitiveKind::Double)));
    }

    #[test]
    fn sized_family_members() {
        assert_eq!(PrimitiveKind::Int32.with_size(1), Some(PrimitiveKind::Int8));
        assert_eq!(PrimitiveKind::UInt8.with_size(4), Some(PrimitiveKind::UInt32));
        assert_eq!(PrimitiveKind::Bits32.with_size(2), Some(PrimitiveKind::Bits16));
        assert_eq!(PrimitiveKind::Float.with_size(4), None);
    }

    #[test]
    fn names_round_trip() {
        for kind in [PrimitiveKind::Int32, PrimitiveKind::Bits16, PrimitiveKind::Double] {
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_name("string"), None);
    }

    #[test]
    fn display_flags() {
        let dt = DataType::int().with_read_only(true).with_reference(true);
        assert_eq!(dt.to_string(), "const int&");
        assert_eq!(RefModifier::InOut.to_string(), "&inout");
    }

    #[test]
    fn ref_modifier_directions() {
        assert!(RefModifier::In.reads_value());
        assert!(!RefModifier::In.writes_value());
        assert!(RefModifier::Out.writes_value());
        assert!(RefModifier::InOut.reads_value() && RefModifier::InOut.writes_value());
    }

    #[test]
    fn null_is_a_handle_object() {
        let null = DataType::null_handle();
        assert!(null.is_null());
        assert!(null.is_object());
        assert!(null.is_object_handle());
    }
}
