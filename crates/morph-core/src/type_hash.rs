//! Deterministic hash-based type identity.
//!
//! This module provides [`TypeHash`], a 64-bit token that identifies a runtime
//! type for the whole life of the process. Hashes are computed from the type name,
//! so:
//!
//! - The same name always yields the same token, across runs and processes
//! - Tokens can be computed before the type is declared
//! - Tokens are directly usable as identity keys (no secondary name → id maps)
//!
//! # Hash Computation
//!
//! Uses XXHash64 mixed with a domain constant. Parameterised family members
//! (`EnumSet<Color>`) mix the family token with each argument token in order.
//!
//! # Examples
//!
//! ```
//! use morph_core::{TypeHash, types};
//!
//! let int32 = TypeHash::from_name("Int32");
//! assert_eq!(int32, types::INT32);
//!
//! let color = TypeHash::from_name("Color");
//! let set = TypeHash::from_template_instance(types::ENUM_SET, &[color]);
//! assert_ne!(set, types::ENUM_SET);
//! ```

use std::fmt;

use morph_cache::KeyPart;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
pub mod hash_constants {
    /// Separator constant used when folding argument tokens.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Argument position mixing constants, so argument order matters.
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

/// A deterministic 64-bit token identifying a runtime type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant. Never names a type.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create the token of a parameterised family member from the family token
    /// and its argument tokens.
    ///
    /// Argument order matters.
    #[inline]
    pub fn from_template_instance(template: TypeHash, args: &[TypeHash]) -> Self {
        let mut hash = template.0;
        for (i, arg) in args.iter().enumerate() {
            let marker = hash_constants::PARAM_MARKERS
                .get(i)
                .copied()
                .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
            hash = hash.wrapping_mul(hash_constants::SEP).wrapping_add(marker ^ arg.0);
        }
        TypeHash(hash)
    }

    /// Check if this is the empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Identity key part for use in a composite cache key.
    #[inline]
    pub const fn key(self) -> KeyPart {
        KeyPart::Id(self.0)
    }
}

impl From<TypeHash> for KeyPart {
    fn from(hash: TypeHash) -> Self {
        hash.key()
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

/// Well-known type tokens.
///
/// These are pre-computed from `TypeHash::from_name()`; the values are the full
/// computed hash (TYPE constant already XORed in).
pub mod types {
    use super::TypeHash;

    /// Source type of an absent value.
    pub const NULL: TypeHash = TypeHash(0x1165f1b6597b5a46);

    /// Root of the class hierarchy.
    pub const ANY: TypeHash = TypeHash(0x892ffdb836a9ac8c);

    // === Boxed scalars (runtime types of scalar values) ===

    pub const BOOL: TypeHash = TypeHash(0x44dbe0a6b0a725b6);
    pub const CHAR: TypeHash = TypeHash(0x97da7d87504ee15d);
    pub const INT8: TypeHash = TypeHash(0xce56587e2f6e373f);
    pub const INT16: TypeHash = TypeHash(0x06a731872fed478d);
    pub const INT32: TypeHash = TypeHash(0x06b4147a231b6775);
    pub const INT64: TypeHash = TypeHash(0x7557df1a212b9b99);
    pub const FLOAT32: TypeHash = TypeHash(0xc975065761f4795e);
    pub const FLOAT64: TypeHash = TypeHash(0x62c2dce4035fa45e);

    /// Common base class of the boxed numeric types.
    pub const NUMBER: TypeHash = TypeHash(0x600ca72c8bad607e);

    /// Immutable text.
    pub const STRING: TypeHash = TypeHash(0xb496d499073b895b);

    /// Mutable text builder; surrogate of [`STRING`].
    pub const TEXT_BUF: TypeHash = TypeHash(0x8140bba108d436c6);

    // === Containers and families ===

    pub const LIST: TypeHash = TypeHash(0x7225b2e6694e6911);
    pub const ARRAY: TypeHash = TypeHash(0xad4653788f7a1b72);

    /// Generic ordered string-keyed record.
    pub const MAP: TypeHash = TypeHash(0x9cf964416a9903ea);

    /// Base class of user-declared structured types.
    pub const RECORD: TypeHash = TypeHash(0x8bdd4ebef8611a8b);

    /// Open family of enumerations; requires a concrete member as target.
    pub const ENUM: TypeHash = TypeHash(0xa8f66df95ce7a3ed);

    /// Open family of enumeration sets; requires a concrete member as target.
    pub const ENUM_SET: TypeHash = TypeHash(0x37cb556032cf0306);

    // === Interfaces ===

    pub const DISPLAY: TypeHash = TypeHash(0xa7339025d998a437);
    pub const TEXT: TypeHash = TypeHash(0x8e94bd7a01bada5b);
    pub const COLLECTION: TypeHash = TypeHash(0x00b2e5081f21994b);

    // === Marker interfaces (no conversion semantics) ===

    pub const COPY: TypeHash = TypeHash(0x70cc903632ae2c67);
    pub const SEND: TypeHash = TypeHash(0x2a67a44867952a68);

    // === Primitive forms (targets only) ===

    pub const PRIM_BOOL: TypeHash = TypeHash(0x1e0c8fa4cced99c1);
    pub const PRIM_CHAR: TypeHash = TypeHash(0x1262f4f62a255c69);
    pub const PRIM_I8: TypeHash = TypeHash(0x80c32ec9c85d8b3c);
    pub const PRIM_I16: TypeHash = TypeHash(0xecb9ffbbc5b061c6);
    pub const PRIM_I32: TypeHash = TypeHash(0x9cb37a47e9d0b0cc);
    pub const PRIM_I64: TypeHash = TypeHash(0x05783c9f00020aef);
    pub const PRIM_F32: TypeHash = TypeHash(0x96c8a91b9b171b50);
    pub const PRIM_F64: TypeHash = TypeHash(0x970099dc22c5c57b);

    /// Primitive form paired with its boxed form.
    pub const PRIMITIVE_PAIRS: [(TypeHash, TypeHash); 8] = [
        (PRIM_BOOL, BOOL),
        (PRIM_CHAR, CHAR),
        (PRIM_I8, INT8),
        (PRIM_I16, INT16),
        (PRIM_I32, INT32),
        (PRIM_I64, INT64),
        (PRIM_F32, FLOAT32),
        (PRIM_F64, FLOAT64),
    ];

    /// Token of `EnumSet<element>`.
    #[inline]
    pub fn enum_set_of(element: TypeHash) -> TypeHash {
        TypeHash::from_template_instance(ENUM_SET, &[element])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_hash_determinism() {
        assert_eq!(TypeHash::from_name("Int32"), TypeHash::from_name("Int32"));
        assert_eq!(TypeHash::from_name("Shop::Order"), TypeHash::from_name("Shop::Order"));
    }

    #[test]
    fn type_hash_uniqueness() {
        let int_hash = TypeHash::from_name("Int32");
        let float_hash = TypeHash::from_name("Float32");
        let string_hash = TypeHash::from_name("String");

        assert_ne!(int_hash, float_hash);
        assert_ne!(int_hash, string_hash);
        assert_ne!(float_hash, string_hash);
    }

    #[test]
    fn template_instance_hash() {
        let color = TypeHash::from_name("Color");
        let size = TypeHash::from_name("Size");

        let set_color = types::enum_set_of(color);
        let set_size = types::enum_set_of(size);

        assert_ne!(set_color, set_size);
        assert_eq!(set_color, TypeHash::from_template_instance(types::ENUM_SET, &[color]));
        assert_ne!(set_color, types::ENUM_SET);
    }

    #[test]
    fn template_argument_order_matters() {
        let a = TypeHash::from_name("A");
        let b = TypeHash::from_name("B");
        let pair = TypeHash::from_name("Pair");
        assert_ne!(
            TypeHash::from_template_instance(pair, &[a, b]),
            TypeHash::from_template_instance(pair, &[b, a])
        );
    }

    #[test]
    fn many_arguments_supported() {
        let int_hash = types::INT32;
        let args: Vec<TypeHash> = (0..20).map(|_| int_hash).collect();
        assert!(!TypeHash::from_template_instance(types::LIST, &args).is_empty());
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!types::NULL.is_empty());
    }

    #[test]
    fn hash_display_and_debug() {
        let hash = TypeHash(0xff);
        assert_eq!(format!("{}", hash), "0x00000000000000ff");
        assert_eq!(format!("{:?}", hash), "TypeHash(0x00000000000000ff)");
    }

    #[test]
    fn key_part_is_identity() {
        assert_eq!(types::INT32.key(), KeyPart::Id(types::INT32.as_u64()));
        assert_eq!(KeyPart::from(types::STRING), KeyPart::Id(types::STRING.0));
    }

    #[test]
    fn well_known_constants_match_from_name() {
        let expected = [
            (types::NULL, "null"),
            (types::ANY, "Any"),
            (types::BOOL, "Bool"),
            (types::CHAR, "Char"),
            (types::INT8, "Int8"),
            (types::INT16, "Int16"),
            (types::INT32, "Int32"),
            (types::INT64, "Int64"),
            (types::FLOAT32, "Float32"),
            (types::FLOAT64, "Float64"),
            (types::NUMBER, "Number"),
            (types::STRING, "String"),
            (types::TEXT_BUF, "TextBuf"),
            (types::LIST, "List"),
            (types::ARRAY, "Array"),
            (types::MAP, "Map"),
            (types::RECORD, "Record"),
            (types::ENUM, "Enum"),
            (types::ENUM_SET, "EnumSet"),
            (types::DISPLAY, "Display"),
            (types::TEXT, "Text"),
            (types::COLLECTION, "Collection"),
            (types::COPY, "Copy"),
            (types::SEND, "Send"),
            (types::PRIM_BOOL, "bool"),
            (types::PRIM_CHAR, "char"),
            (types::PRIM_I8, "i8"),
            (types::PRIM_I16, "i16"),
            (types::PRIM_I32, "i32"),
            (types::PRIM_I64, "i64"),
            (types::PRIM_F32, "f32"),
            (types::PRIM_F64, "f64"),
        ];
        for (hash, name) in expected {
            assert_eq!(hash, TypeHash::from_name(name), "constant for {name}");
        }
    }

    #[test]
    fn well_known_constants_are_unique() {
        use std::collections::HashSet;

        let mut all: Vec<TypeHash> = vec![
            types::NULL,
            types::ANY,
            types::NUMBER,
            types::STRING,
            types::TEXT_BUF,
            types::LIST,
            types::ARRAY,
            types::MAP,
            types::RECORD,
            types::ENUM,
            types::ENUM_SET,
            types::DISPLAY,
            types::TEXT,
            types::COLLECTION,
            types::COPY,
            types::SEND,
        ];
        for (prim, boxed) in types::PRIMITIVE_PAIRS {
            all.push(prim);
            all.push(boxed);
        }
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }
}
