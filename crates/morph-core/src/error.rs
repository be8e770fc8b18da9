//! Unified error types for morph.
//!
//! ## Error Hierarchy
//!
//! ```text
//! MorphError (top-level wrapper)
//! ├── ConvertError      - A conversion request could not be satisfied
//! │   └── ValueError    - An atomic function rejected its input
//! └── RegistrationError - Type declaration or function registration failed
//! ```
//!
//! Each concern-specific type can be used directly for fine-grained handling,
//! or converted to `MorphError` with `?`:
//!
//! ```ignore
//! use morph::{MorphError, Converter, Value, types};
//!
//! fn setup(conv: &Converter) -> Result<Value, MorphError> {
//!     conv.add_conversion(my_fn, from, to)?;                 // RegistrationError
//!     Ok(conv.convert(Value::from("42"), types::INT32)?)     // ConvertError
//! }
//! ```

use thiserror::Error;

// ============================================================================
// Value Errors
// ============================================================================

/// Errors raised by atomic conversion functions for malformed input.
///
/// These are never produced by the engine itself; they are propagated unchanged
/// from whichever function was selected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// A numeric value does not fit the target type.
    #[error("value {value} out of range for {target}")]
    IntegerOverflow {
        /// The offending value, formatted.
        value: String,
        /// The target type name.
        target: String,
    },

    /// Text could not be parsed as the target type.
    #[error("cannot parse {input:?} as {target}")]
    InvalidFormat {
        /// The input text.
        input: String,
        /// The target type name.
        target: String,
    },

    /// Text does not name a variant of the target enumeration.
    #[error("'{variant}' is not a variant of {enum_name}")]
    UnknownVariant {
        /// The requested variant name.
        variant: String,
        /// The enumeration name.
        enum_name: String,
    },

    /// A structured value lacks a declared field.
    #[error("{record} is missing field '{field}'")]
    MissingField {
        /// The field name.
        field: String,
        /// The record type name.
        record: String,
    },

    /// A floating point value is NaN or infinite and the target cannot hold it.
    #[error("non-finite value {value} cannot convert to {target}")]
    NotFinite {
        /// The offending value.
        value: f64,
        /// The target type name.
        target: String,
    },

    /// A value had a different shape than the function expected.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// What was expected.
        expected: &'static str,
        /// What was found.
        actual: &'static str,
    },
}

// ============================================================================
// Conversion Errors
// ============================================================================

/// Errors returned by a conversion request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// No function converts between the two types.
    #[error("no conversion from {from} to {to}")]
    Unsupported {
        /// Source type name.
        from: String,
        /// Target type name.
        to: String,
    },

    /// The target is an open family and does not name a concrete member.
    #[error("target {family} is an open family; request a concrete member")]
    AmbiguousTarget {
        /// The family name.
        family: String,
    },

    /// The selected function rejected the input.
    #[error(transparent)]
    Value(#[from] ValueError),
}

impl ConvertError {
    /// Check if this is an unsupported-conversion error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ConvertError::Unsupported { .. })
    }

    /// Check if this error came from an atomic function.
    pub fn is_value(&self) -> bool {
        matches!(self, ConvertError::Value(_))
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors that occur during type declaration and function registration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// The registration itself is malformed (empty token, marker misuse).
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),

    /// A referenced type was never declared.
    #[error("type not found: {0}")]
    UnknownType(String),

    /// A type with this name already exists with a different declaration.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// A bridge pair lacks the function that defines one of its steps.
    #[error("bridge step {from} -> {to} is not registered")]
    MissingBridgeStep {
        /// Step source type name.
        from: String,
        /// Step target type name.
        to: String,
    },
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// The unified error type for all morph operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MorphError {
    /// A conversion error.
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// A registration error.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

impl From<ValueError> for MorphError {
    fn from(err: ValueError) -> Self {
        MorphError::Convert(ConvertError::Value(err))
    }
}

impl MorphError {
    /// Check if this is a conversion error.
    pub fn is_convert(&self) -> bool {
        matches!(self, MorphError::Convert(_))
    }

    /// Check if this is a registration error.
    pub fn is_registration(&self) -> bool {
        matches!(self, MorphError::Registration(_))
    }

    /// Check if this wraps a value error from an atomic function.
    pub fn is_value(&self) -> bool {
        matches!(self, MorphError::Convert(ConvertError::Value(_)))
    }
}

// ============================================================================
// Tests
// ============================================================================
