//! Conversion functions and the engine interface they call back into.

use std::fmt;
use std::sync::Arc;

use morph_core::{ConvertError, ConvertOptions, TypeHash, Value};

use crate::universe::TypeUniverse;

/// The engine as seen from inside a conversion function.
///
/// Functions use it to convert nested values (collection elements, record
/// fields), to inspect declared types and to read the configured options.
pub trait Convert {
    /// Convert `value` to `target`.
    fn convert(&self, value: Value, target: TypeHash) -> Result<Value, ConvertError>;

    /// Declared types.
    fn types(&self) -> &TypeUniverse;

    /// Options for atomic functions.
    fn options(&self) -> &ConvertOptions;

    /// Display name of a type, for error messages.
    fn type_name(&self, ty: TypeHash) -> String {
        self.types().name_of(ty)
    }
}

/// Signature of a conversion function body.
///
/// The third argument is the concrete target that was requested, which may be
/// more specific than the target the function was registered for.
pub type ConvertFnBody =
    dyn Fn(Value, &dyn Convert, TypeHash) -> Result<Value, ConvertError> + Send + Sync;

/// The kind of function stored in a dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnKind {
    /// A function registered by a catalogue or a user.
    Atomic,
    /// Returns the value unchanged.
    Identity,
    /// Reflexive "this type has overrides" entry; never selected.
    Marker,
    /// Two functions composed through an intermediate type.
    Bridge {
        /// The intermediate type.
        via: TypeHash,
    },
}

/// A cloneable conversion function handle.
#[derive(Clone)]
pub struct ConversionFn {
    body: Arc<ConvertFnBody>,
    kind: FnKind,
}

impl ConversionFn {
    /// Wrap a closure as an atomic function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value, &dyn Convert, TypeHash) -> Result<Value, ConvertError> + Send + Sync + 'static,
    {
        Self {
            body: Arc::new(f),
            kind: FnKind::Atomic,
        }
    }

    /// Wrap a closure that only needs the value.
    pub fn from_value_fn<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ConvertError> + Send + Sync + 'static,
    {
        Self::new(move |value, _, _| f(value))
    }

    /// A function returning its input unchanged.
    pub fn identity() -> Self {
        Self::new(|value, _, _| Ok(value)).with_kind(FnKind::Identity)
    }

    pub(crate) fn marker() -> Self {
        Self::new(|value, _, _| Ok(value)).with_kind(FnKind::Marker)
    }

    /// `first` to `via`, then `second` to the requested target.
    pub fn compose(first: ConversionFn, via: TypeHash, second: ConversionFn) -> Self {
        Self::new(move |value, engine, target| {
            let mid = first.call(value, engine, via)?;
            second.call(mid, engine, target)
        })
        .with_kind(FnKind::Bridge { via })
    }

    fn with_kind(mut self, kind: FnKind) -> Self {
        self.kind = kind;
        self
    }

    /// Invoke the function.
    #[inline]
    pub fn call(&self, value: Value, engine: &dyn Convert, target: TypeHash) -> Result<Value, ConvertError> {
        (self.body)(value, engine, target)
    }

    pub fn kind(&self) -> FnKind {
        self.kind
    }

    pub fn is_marker(&self) -> bool {
        self.kind == FnKind::Marker
    }

    /// Whether both handles share one function body.
    pub fn ptr_eq(&self, other: &ConversionFn) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for ConversionFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionFn").field("kind", &self.kind).finish()
    }
}
