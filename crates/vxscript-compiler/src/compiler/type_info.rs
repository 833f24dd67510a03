//! Result descriptor of a compiled (sub)expression.

use vxscript_core::{DataType, PrimitiveKind};

/// What the compiler knows about an expression's value.
///
/// A constant never lives in a frame slot. A temporary owns exactly one slot
/// which must be released once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeInfo {
    pub data_type: DataType,
    /// The value lives in the frame slot at `stack_offset`.
    pub is_variable: bool,
    /// The slot was allocated by the compiler for this expression.
    pub is_temporary: bool,
    /// The value is known at compile time and stored in `value`.
    pub is_constant: bool,
    /// The expression was written with `@`, or is a handle assignment target.
    pub is_explicit_handle: bool,
    pub stack_offset: i16,
    /// Raw bits of a constant in the type's representation.
    pub value: u64,
}

impl TypeInfo {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            is_variable: false,
            is_temporary: false,
            is_constant: false,
            is_explicit_handle: false,
            stack_offset: 0,
            value: 0,
        }
    }

    pub fn variable(data_type: DataType, offset: i16, is_temporary: bool) -> Self {
        Self {
            is_variable: true,
            is_temporary,
            stack_offset: offset,
            ..Self::new(data_type)
        }
    }

    pub fn constant(data_type: DataType, value: u64) -> Self {
        Self {
            is_constant: true,
            value,
            ..Self::new(data_type)
        }
    }

    pub fn null_constant() -> Self {
        Self {
            is_explicit_handle: true,
            ..Self::constant(DataType::null_handle(), 0)
        }
    }

    /// Reset to a plain value of `data_type`.
    pub fn set(&mut self, data_type: DataType) {
        *self = Self::new(data_type);
    }

    pub fn set_variable(&mut self, data_type: DataType, offset: i16, is_temporary: bool) {
        *self = Self::variable(data_type, offset, is_temporary);
    }

    pub fn set_constant(&mut self, data_type: DataType, value: u64) {
        *self = Self::constant(data_type, value);
    }

    pub fn is_null_constant(&self) -> bool {
        self.is_constant && self.data_type.is_null()
    }

    /// A primitive constant, sign extended from its declared width.
    pub fn int_value(&self) -> i32 {
        match self.data_type.primitive_kind() {
            Some(PrimitiveKind::Int8) => self.value as u8 as i8 as i32,
            Some(PrimitiveKind::Int16) => self.value as u16 as i16 as i32,
            _ => self.value as u32 as i32,
        }
    }

    /// A primitive constant, zero extended from its declared width.
    pub fn dword_value(&self) -> u32 {
        match self.data_type.size_in_memory_bytes() {
            1 => self.value as u8 as u32,
            2 => self.value as u16 as u32,
            _ => self.value as u32,
        }
    }

    pub fn float_value(&self) -> f32 {
        f32::from_bits(self.value as u32)
    }

    pub fn double_value(&self) -> f64 {
        f64::from_bits(self.value)
    }

    pub fn set_int(&mut self, value: i32) {
        self.value = value as u32 as u64;
    }

    pub fn set_dword(&mut self, value: u32) {
        self.value = value as u64;
    }

    pub fn set_float(&mut self, value: f32) {
        self.value = value.to_bits() as u64;
    }

    pub fn set_double(&mut self, value: f64) {
        self.value = value.to_bits();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_never_hold_slots() {
        let c = TypeInfo::constant(DataType::int(), 5);
        assert!(c.is_constant && !c.is_variable && !c.is_temporary);
        assert_eq!(c.int_value(), 5);
    }

    #[test]
    fn narrow_constants_extend_by_kind() {
        let mut c = TypeInfo::constant(DataType::primitive(PrimitiveKind::Int8), 0xff);
        assert_eq!(c.int_value(), -1);
        c.data_type = DataType::primitive(PrimitiveKind::UInt8);
        assert_eq!(c.dword_value(), 0xff);
    }

    #[test]
    fn float_bits_round_trip() {
        let mut c = TypeInfo::new(DataType::primitive(PrimitiveKind::Float));
        c.set_float(1.5);
        assert_eq!(c.float_value(), 1.5);
        c.set_double(-2.25);
        assert_eq!(c.double_value(), -2.25);
    }

    #[test]
    fn null_constant_is_an_explicit_handle() {
        let n = TypeInfo::null_constant();
        assert!(n.is_null_constant());
        assert!(n.is_explicit_handle);
        assert!(n.data_type.is_object_handle());
    }
}
