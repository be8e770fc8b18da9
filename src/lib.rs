//! Runtime value conversion with hierarchy-aware dispatch.
//!
//! Values carry a runtime type token. A [`Converter`] turns a [`Value`] of one
//! type into another type by looking up a registered function, falling back to
//! functions registered for supertypes, and finally to structural rules.
//!
//! ```ignore
//! use morph::{Converter, Value, types};
//!
//! let converter = Converter::new();
//! assert_eq!(converter.convert(Value::from(" 42 "), types::INT32)?, Value::I32(42));
//! let text: String = converter.convert_to(Value::F64(1.5))?;
//! ```
//!
//! The built-in catalogue covers numbers, text, enumerations, null handling
//! and the sequence, map and record shapes. User types are declared on the
//! [`Runtime`]; user functions are registered either shared
//! ([`Runtime::register_shared`]) or per instance ([`Converter::add_conversion`]).

mod catalog;
mod engine;
mod resolved;
mod runtime;
mod structural;

pub use engine::{Converter, ResolutionStats};
pub use runtime::Runtime;

pub use morph_core::{
    ContextId, ConvertError, ConvertOptions, EnumSetValue, EnumValue, FromValue, MorphError, Record,
    RegistrationError, TypeHash, Value, ValueError, types,
};
pub use morph_registry::{
    AncestorEntry, AncestorKind, ConversionFn, Convert, FnKind, InheritancePair, Shape, TypeDescriptor, TypeFlags,
    TypeUniverse,
};

/// Result alias for fallible conversions.
pub type Result<T, E = ConvertError> = std::result::Result<T, E>;
