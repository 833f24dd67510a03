//! Deterministic identity for object types.
//!
//! Host types, script structs and array instances all live in tables keyed by
//! [`TypeHash`]. The hash is computed from the type name (or, for array
//! instances, from the template and the element identity), so a script can
//! refer to a struct declared later in the same module before it has been
//! registered.
//!
//! ```
//! use vxscript_core::TypeHash;
//!
//! let a = TypeHash::from_name("Vector");
//! assert_eq!(a, TypeHash::from_name("Vector"));
//! assert_ne!(a, TypeHash::from_name("vector"));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain mixing constants.
pub mod hash_constants {
    /// Separator used when folding several components into one hash.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type names.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for template instances.
    pub const TEMPLATE: u64 = 0x5ea77ffbcdf5f302;

    /// Position markers so that argument order changes the hash.
    pub const PARAM_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A 64-bit hash identifying an object type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash of a type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a template instantiated with the given argument identities.
    pub fn from_template_instance(template: TypeHash, args: &[TypeHash]) -> Self {
        let mut hash = hash_constants::TEMPLATE ^ template.0;
        for (i, arg) in args.iter().enumerate() {
            let marker = hash_constants::PARAM_MARKERS[i % hash_constants::PARAM_MARKERS.len()]
                .wrapping_add(i as u64);
            hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ arg.0);
        }
        TypeHash(hash)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The low 32 bits, used where the VM encodes type references in one word.
    #[inline]
    pub const fn low_word(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_deterministic() {
        assert_eq!(TypeHash::from_name("string"), TypeHash::from_name("string"));
        assert_ne!(TypeHash::from_name("string"), TypeHash::from_name("strin"));
    }

    #[test]
    fn template_argument_order_matters() {
        let t = TypeHash::from_name("array");
        let a = TypeHash::from_name("int");
        let b = TypeHash::from_name("float");
        assert_ne!(
            TypeHash::from_template_instance(t, &[a, b]),
            TypeHash::from_template_instance(t, &[b, a])
        );
        assert_ne!(TypeHash::from_template_instance(t, &[a]), t);
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::from_name("x").is_empty());
    }
}
