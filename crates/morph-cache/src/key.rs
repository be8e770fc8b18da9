//! Key parts and the combined key hash.
//!
//! A composite key is an ordered tuple of [`KeyPart`]s. Identity tokens (type
//! hashes, context ids) are hashed as their raw value; everything else is hashed
//! by value with `FxHasher`. The per-part hashes are folded with a `* 31 + part`
//! accumulator and then run through an avalanche finisher, because identity
//! tokens handed out sequentially would otherwise land in neighbouring buckets.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;
use smallvec::SmallVec;

/// Owned composite key. Keys of up to three parts never allocate.
pub type CompositeKey = SmallVec<[KeyPart; 3]>;

/// One component of a composite key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    /// Identity token (type hash, context id). Hashed as-is.
    Id(u64),
    /// Plain integer, hashed by value.
    Int(i64),
    /// Shared string, hashed by value.
    Str(Arc<str>),
}

impl KeyPart {
    /// Hash contribution of this part.
    #[inline]
    pub fn part_hash(&self) -> u64 {
        match self {
            KeyPart::Id(id) => *id,
            KeyPart::Int(v) => fx_hash(v),
            KeyPart::Str(s) => fx_hash(&**s),
        }
    }

    /// The raw token of an [`KeyPart::Id`] part.
    #[inline]
    pub fn as_id(&self) -> Option<u64> {
        match self {
            KeyPart::Id(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Debug for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Id(id) => write!(f, "Id({:#x})", id),
            KeyPart::Int(v) => write!(f, "Int({})", v),
            KeyPart::Str(s) => write!(f, "Str({:?})", s),
        }
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(Arc::from(value))
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(Arc::from(value))
    }
}

impl From<Arc<str>> for KeyPart {
    fn from(value: Arc<str>) -> Self {
        KeyPart::Str(value)
    }
}

fn fx_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Combine the hashes of all parts into one well-mixed key hash.
#[inline]
pub fn combine<'a, I>(parts: I) -> u64
where
    I: IntoIterator<Item = &'a KeyPart>,
{
    let mut hash: u64 = 1;
    for part in parts {
        hash = hash.wrapping_mul(31).wrapping_add(part.part_hash());
    }
    finish(hash)
}

/// MurmurHash3 `fmix64` finisher.
#[inline]
pub const fn finish(mut hash: u64) -> u64 {
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51_afd7_ed55_8ccd);
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    hash ^= hash >> 33;
    hash
}
