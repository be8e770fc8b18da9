//! Core types shared by all morph crates.
//!
//! This crate provides:
//! - [`TypeHash`]: deterministic type tokens, plus the well-known [`types`]
//! - [`Value`]: the dynamic values the engine converts
//! - Error types: [`ConvertError`], [`ValueError`], [`RegistrationError`], [`MorphError`]
//! - [`ConvertOptions`]: configuration passed through to atomic functions

mod error;
mod options;
mod type_hash;
mod value;

pub use error::{ConvertError, MorphError, RegistrationError, ValueError};
pub use options::ConvertOptions;
pub use type_hash::{TypeHash, hash_constants, types};
pub use value::{EnumSetValue, EnumValue, FromValue, Record, Value};

/// Scope of a registration or resolved-cache entry.
///
/// [`ContextId::SHARED`] is visible to every engine instance; each engine
/// instance owns one private id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ContextId(pub u64);

impl ContextId {
    /// The context shared by all instances.
    pub const SHARED: ContextId = ContextId(0);

    #[inline]
    pub const fn is_shared(self) -> bool {
        self.0 == 0
    }

    /// Identity key part for use in a composite cache key.
    #[inline]
    pub const fn key(self) -> morph_cache::KeyPart {
        morph_cache::KeyPart::Id(self.0)
    }
}

impl From<ContextId> for morph_cache::KeyPart {
    fn from(ctx: ContextId) -> Self {
        ctx.key()
    }
}
