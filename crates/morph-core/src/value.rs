//! Dynamic runtime values.
//!
//! [`Value`] is the unit of data the engine converts. Every value knows its
//! runtime type via [`Value::type_hash`]; scalar values always report their
//! boxed type (`Int32`, never `i32`), because primitive forms only exist as
//! conversion targets.

use indexmap::{IndexMap, IndexSet};

use crate::error::ValueError;
use crate::type_hash::{TypeHash, types};

/// A value of a user-declared enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    /// The enumeration's type token.
    pub type_hash: TypeHash,
    /// The variant name.
    pub variant: String,
}

impl EnumValue {
    pub fn new(type_hash: TypeHash, variant: impl Into<String>) -> Self {
        Self {
            type_hash,
            variant: variant.into(),
        }
    }
}

/// A set of variants of one enumeration, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSetValue {
    /// Token of the element enumeration.
    pub element: TypeHash,
    pub variants: IndexSet<String>,
}

impl EnumSetValue {
    pub fn new(element: TypeHash) -> Self {
        Self {
            element,
            variants: IndexSet::new(),
        }
    }

    /// Token of `EnumSet<element>`.
    pub fn type_hash(&self) -> TypeHash {
        types::enum_set_of(self.element)
    }

    pub fn insert(&mut self, variant: impl Into<String>) -> bool {
        self.variants.insert(variant.into())
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.variants.contains(variant)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// An instance of a user-declared structured type.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The record's declared type token.
    pub type_hash: TypeHash,
    /// Field values in declaration order.
    pub fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new(type_hash: TypeHash) -> Self {
        Self {
            type_hash,
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// A dynamic value.
///
/// Cloning is deep; values are plain data with no shared handles.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    /// Immutable text.
    String(String),
    /// Mutable text builder.
    TextBuf(String),
    /// Growable sequence.
    List(Vec<Value>),
    /// Fixed-size sequence.
    Array(Vec<Value>),
    /// Ordered string-keyed record.
    Map(IndexMap<String, Value>),
    Enum(EnumValue),
    EnumSet(EnumSetValue),
    Record(Record),
}

impl Value {
    /// The runtime type of this value.
    pub fn type_hash(&self) -> TypeHash {
        match self {
            Value::Null => types::NULL,
            Value::Bool(_) => types::BOOL,
            Value::Char(_) => types::CHAR,
            Value::I8(_) => types::INT8,
            Value::I16(_) => types::INT16,
            Value::I32(_) => types::INT32,
            Value::I64(_) => types::INT64,
            Value::F32(_) => types::FLOAT32,
            Value::F64(_) => types::FLOAT64,
            Value::String(_) => types::STRING,
            Value::TextBuf(_) => types::TEXT_BUF,
            Value::List(_) => types::LIST,
            Value::Array(_) => types::ARRAY,
            Value::Map(_) => types::MAP,
            Value::Enum(e) => e.type_hash,
            Value::EnumSet(s) => s.type_hash(),
            Value::Record(r) => r.type_hash,
        }
    }

    /// Get a human-readable name for this value's shape.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::String(_) => "string",
            Value::TextBuf(_) => "text buffer",
            Value::List(_) => "list",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Enum(_) => "enum",
            Value::EnumSet(_) => "enum set",
            Value::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text of a `String` or `TextBuf`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::TextBuf(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload widened to `i64`. Booleans count as 0/1.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(*b as i64),
            Value::I8(v) => Some(*v as i64),
            Value::I16(v) => Some(*v as i64),
            Value::I32(v) => Some(*v as i64),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric payload widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Element slice of a `List` or `Array`.
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

// ============================================================================
// Rust value conversions
// ============================================================================

/// Extract a Rust value from a converted [`Value`].
///
/// `target()` names the type to request from the engine so that the value
/// handed to `from_value` already has the expected shape.
pub trait FromValue: Sized {
    /// Type token requested for this Rust type.
    fn target() -> TypeHash;

    /// Extract the Rust value.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

macro_rules! impl_value_scalar {
    ($($ty:ty => $variant:ident, $prim:expr);* $(;)?) => {
        $(
            impl FromValue for $ty {
                fn target() -> TypeHash {
                    $prim
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(ValueError::TypeMismatch {
                            expected: stringify!($ty),
                            actual: other.type_name(),
                        }),
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_value_scalar! {
    bool => Bool, types::PRIM_BOOL;
    char => Char, types::PRIM_CHAR;
    i8 => I8, types::PRIM_I8;
    i16 => I16, types::PRIM_I16;
    i32 => I32, types::PRIM_I32;
    i64 => I64, types::PRIM_I64;
    f32 => F32, types::PRIM_F32;
    f64 => F64, types::PRIM_F64;
}

impl FromValue for String {
    fn target() -> TypeHash {
        types::STRING
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::String(s) | Value::TextBuf(s) => Ok(s),
            other => Err(ValueError::TypeMismatch {
                expected: "string",
                actual: other.type_name(),
            }),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<EnumValue> for Value {
    fn from(value: EnumValue) -> Self {
        Value::Enum(value)
    }
}

impl From<EnumSetValue> for Value {
    fn from(value: EnumSetValue) -> Self {
        Value::EnumSet(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
