//! Concurrent composite-key cache map.
//!
//! [`CompositeKeyMap`] is the storage behind every table and cache in `morph`:
//! the dispatch registry, the resolved-function cache and the type hierarchy
//! caches. Keys are ordered tuples of [`KeyPart`]s; reads never lock.

mod key;
mod map;

pub use key::{CompositeKey, KeyPart, combine, finish};
pub use map::{CompositeKeyMap, DEFAULT_CAPACITY, DEFAULT_LOAD_FACTOR, Iter};
