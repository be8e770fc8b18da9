//! Concurrent map keyed by ordered tuples of [`KeyPart`]s.
//!
//! # Storage Model
//!
//! The map owns a power-of-two array of buckets. Each bucket holds an optional,
//! immutable chain of entries; an entry stores its cloned key, its value and the
//! combined key hash. Writers never mutate a chain: they build a replacement and
//! publish it into the bucket slot.
//!
//! # Concurrency
//!
//! - Reads load the current bucket array through `ArcSwap`, then the chain of one
//!   bucket, and scan it. No lock is taken, and a reader racing a writer sees
//!   either the old or the new chain, never a partial one.
//! - `put`, `remove`, `remove_if`, `clear` and resizing run under a single
//!   per-map mutex. Hashing happens before the lock is taken.
//! - Resizing doubles the bucket array, rehashing entries with their stored hash,
//!   and publishes the new array with one `ArcSwap::store`. Readers keep using
//!   the old array until then.
//!
//! # Example
//!
//! ```
//! use morph_cache::{CompositeKeyMap, KeyPart};
//!
//! let map = CompositeKeyMap::new();
//! map.put3(KeyPart::Id(1), KeyPart::Id(2), KeyPart::Id(0), "fn");
//! assert_eq!(map.get3(&KeyPart::Id(1), &KeyPart::Id(2), &KeyPart::Id(0)), Some("fn"));
//! assert_eq!(map.get(&[KeyPart::Id(1), KeyPart::Id(2), KeyPart::Id(0)]), Some("fn"));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::trace;

use crate::key::{CompositeKey, KeyPart, combine};

/// Bucket count used by [`CompositeKeyMap::new`].
pub const DEFAULT_CAPACITY: usize = 16;

/// Occupancy ratio that triggers a resize.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

struct Entry<V> {
    key: CompositeKey,
    value: V,
    hash: u64,
}

struct Chain<V> {
    entries: Box<[Arc<Entry<V>>]>,
}

impl<V> Chain<V> {
    fn from_vec(entries: Vec<Arc<Entry<V>>>) -> Option<Arc<Self>> {
        if entries.is_empty() {
            None
        } else {
            Some(Arc::new(Chain {
                entries: entries.into_boxed_slice(),
            }))
        }
    }
}

struct Table<V> {
    buckets: Box<[ArcSwapOption<Chain<V>>]>,
    mask: usize,
}

impl<V> Table<V> {
    fn new(capacity: usize) -> Self {
        let len = capacity.max(2).next_power_of_two();
        let buckets = (0..len).map(|_| ArcSwapOption::empty()).collect();
        Table {
            buckets,
            mask: len - 1,
        }
    }

    #[inline]
    fn bucket(&self, hash: u64) -> &ArcSwapOption<Chain<V>> {
        &self.buckets[(hash as usize) & self.mask]
    }
}

/// Concurrent map with lock-free reads and serialized writes.
pub struct CompositeKeyMap<V> {
    table: ArcSwap<Table<V>>,
    write: Mutex<()>,
    len: AtomicUsize,
    initial_capacity: usize,
    load_factor: f32,
}

impl<V: Clone> CompositeKeyMap<V> {
    /// Create an empty map with the default capacity and load factor.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty map with room for `capacity` buckets (rounded up to a power of two).
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_load_factor(capacity, DEFAULT_LOAD_FACTOR)
    }

    /// Create an empty map with an explicit load factor.
    ///
    /// Non-positive or non-finite load factors fall back to [`DEFAULT_LOAD_FACTOR`].
    pub fn with_capacity_and_load_factor(capacity: usize, load_factor: f32) -> Self {
        let load_factor = if load_factor.is_finite() && load_factor > 0.0 {
            load_factor
        } else {
            DEFAULT_LOAD_FACTOR
        };
        Self {
            table: ArcSwap::from_pointee(Table::new(capacity)),
            write: Mutex::new(()),
            len: AtomicUsize::new(0),
            initial_capacity: capacity,
            load_factor,
        }
    }

    // ==========================================================================
    // Reads (lock-free)
    // ==========================================================================

    /// Look up a key given as a slice (sequence or fixed-size array form).
    #[inline]
    pub fn get(&self, key: &[KeyPart]) -> Option<V> {
        self.find(combine(key), |parts| parts == key)
    }

    /// Look up a single-part key.
    #[inline]
    pub fn get1(&self, a: &KeyPart) -> Option<V> {
        self.find(combine([a]), |parts| parts.len() == 1 && parts[0] == *a)
    }

    /// Look up a two-part key.
    #[inline]
    pub fn get2(&self, a: &KeyPart, b: &KeyPart) -> Option<V> {
        self.find(combine([a, b]), |parts| {
            parts.len() == 2 && parts[0] == *a && parts[1] == *b
        })
    }

    /// Look up a three-part key.
    #[inline]
    pub fn get3(&self, a: &KeyPart, b: &KeyPart, c: &KeyPart) -> Option<V> {
        self.find(combine([a, b, c]), |parts| {
            parts.len() == 3 && parts[0] == *a && parts[1] == *b && parts[2] == *c
        })
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: &[KeyPart]) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Check if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.table.load().buckets.len()
    }

    /// Iterate over a snapshot of the bucket array.
    ///
    /// The iterator does not block writers. Entries inserted or removed while it
    /// runs may or may not be observed; every yielded entry is complete.
    pub fn iter(&self) -> Iter<V> {
        Iter {
            table: self.table.load_full(),
            bucket: 0,
            chain: None,
            pos: 0,
        }
    }

    fn find(&self, hash: u64, matches: impl Fn(&[KeyPart]) -> bool) -> Option<V> {
        let table = self.table.load();
        let guard = table.bucket(hash).load();
        let chain = (*guard).as_ref()?;
        chain
            .entries
            .iter()
            .find(|entry| entry.hash == hash && matches(&entry.key))
            .map(|entry| entry.value.clone())
    }

    // ==========================================================================
    // Writes (serialized)
    // ==========================================================================

    /// Insert or replace a value, returning the previous one.
    pub fn put(&self, key: &[KeyPart], value: V) -> Option<V> {
        let hash = combine(key);
        self.insert(key.iter().cloned().collect(), hash, value)
    }

    /// Insert or replace a value under a three-part key.
    pub fn put3(&self, a: KeyPart, b: KeyPart, c: KeyPart, value: V) -> Option<V> {
        let hash = combine([&a, &b, &c]);
        let key: CompositeKey = SmallVec::from_buf([a, b, c]);
        self.insert(key, hash, value)
    }

    /// Insert only if the key is absent. Returns `true` when the value was stored.
    pub fn put_if_absent(&self, key: &[KeyPart], value: V) -> bool {
        let hash = combine(key);
        let _lock = self.write.lock();
        let table = self.table.load_full();
        let slot = table.bucket(hash);
        let current = slot.load_full();
        let exists = current.as_ref().is_some_and(|chain| {
            chain
                .entries
                .iter()
                .any(|entry| entry.hash == hash && entry.key.as_slice() == key)
        });
        if exists {
            return false;
        }
        let mut entries: Vec<Arc<Entry<V>>> = current
            .as_ref()
            .map(|chain| chain.entries.to_vec())
            .unwrap_or_default();
        entries.push(Arc::new(Entry {
            key: key.iter().cloned().collect(),
            value,
            hash,
        }));
        slot.store(Chain::from_vec(entries));
        self.grew(&table);
        true
    }

    /// Remove a key, returning its value.
    pub fn remove(&self, key: &[KeyPart]) -> Option<V> {
        let hash = combine(key);
        self.remove_hashed(hash, |parts| parts == key)
    }

    /// Remove a three-part key, returning its value.
    pub fn remove3(&self, a: &KeyPart, b: &KeyPart, c: &KeyPart) -> Option<V> {
        let hash = combine([a, b, c]);
        self.remove_hashed(hash, |parts| {
            parts.len() == 3 && parts[0] == *a && parts[1] == *b && parts[2] == *c
        })
    }

    /// Remove every entry for which `pred` returns `true`. Returns the number removed.
    pub fn remove_if(&self, mut pred: impl FnMut(&[KeyPart], &V) -> bool) -> usize {
        let _lock = self.write.lock();
        let table = self.table.load_full();
        let mut removed = 0;
        for slot in table.buckets.iter() {
            let Some(chain) = slot.load_full() else {
                continue;
            };
            let kept: Vec<Arc<Entry<V>>> = chain
                .entries
                .iter()
                .filter(|entry| !pred(&entry.key, &entry.value))
                .cloned()
                .collect();
            if kept.len() != chain.entries.len() {
                removed += chain.entries.len() - kept.len();
                slot.store(Chain::from_vec(kept));
            }
        }
        if removed > 0 {
            self.len.fetch_sub(removed, Ordering::AcqRel);
        }
        removed
    }

    /// Drop all entries and return to the initial capacity.
    pub fn clear(&self) {
        let _lock = self.write.lock();
        self.table
            .store(Arc::new(Table::new(self.initial_capacity)));
        self.len.store(0, Ordering::Release);
    }

    fn insert(&self, key: CompositeKey, hash: u64, value: V) -> Option<V> {
        let _lock = self.write.lock();
        let table = self.table.load_full();
        let slot = table.bucket(hash);
        let mut entries: Vec<Arc<Entry<V>>> = slot
            .load_full()
            .map(|chain| chain.entries.to_vec())
            .unwrap_or_default();

        let position = entries
            .iter()
            .position(|entry| entry.hash == hash && entry.key == key);
        let entry = Arc::new(Entry { key, value, hash });
        let previous = match position {
            Some(index) => Some(std::mem::replace(&mut entries[index], entry).value.clone()),
            None => {
                entries.push(entry);
                None
            }
        };
        slot.store(Chain::from_vec(entries));

        if previous.is_none() {
            self.grew(&table);
        }
        previous
    }

    fn remove_hashed(&self, hash: u64, matches: impl Fn(&[KeyPart]) -> bool) -> Option<V> {
        let _lock = self.write.lock();
        let table = self.table.load_full();
        let slot = table.bucket(hash);
        let chain = slot.load_full()?;
        let index = chain
            .entries
            .iter()
            .position(|entry| entry.hash == hash && matches(&entry.key))?;

        let previous = chain.entries[index].value.clone();
        let kept: Vec<Arc<Entry<V>>> = chain
            .entries
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, entry)| Arc::clone(entry))
            .collect();
        slot.store(Chain::from_vec(kept));
        self.len.fetch_sub(1, Ordering::AcqRel);
        Some(previous)
    }

    /// Account for one new entry; resize when over the load factor.
    ///
    /// Must be called with the write lock held.
    fn grew(&self, table: &Table<V>) {
        let len = self.len.fetch_add(1, Ordering::AcqRel) + 1;
        let threshold = self.load_factor * table.buckets.len() as f32;
        if len as f32 > threshold {
            self.resize(table);
        }
    }

    fn resize(&self, old: &Table<V>) {
        let new_len = old.buckets.len() * 2;
        let mask = new_len - 1;
        let mut chains: Vec<Vec<Arc<Entry<V>>>> = (0..new_len).map(|_| Vec::new()).collect();

        for slot in old.buckets.iter() {
            if let Some(chain) = slot.load_full() {
                for entry in chain.entries.iter() {
                    chains[(entry.hash as usize) & mask].push(Arc::clone(entry));
                }
            }
        }

        let buckets = chains
            .into_iter()
            .map(|entries| ArcSwapOption::new(Chain::from_vec(entries)))
            .collect();
        self.table.store(Arc::new(Table { buckets, mask }));
        trace!(buckets = new_len, len = self.len(), "composite key map resized");
    }
}

impl<V: Clone> Default for CompositeKeyMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> fmt::Debug for CompositeKeyMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeKeyMap")
            .field("len", &self.len())
            .field("buckets", &self.bucket_count())
            .field("load_factor", &self.load_factor)
            .finish()
    }
}

/// Snapshot iterator returned by [`CompositeKeyMap::iter`].
pub struct Iter<V> {
    table: Arc<Table<V>>,
    bucket: usize,
    chain: Option<Arc<Chain<V>>>,
    pos: usize,
}

impl<V: Clone> Iterator for Iter<V> {
    type Item = (CompositeKey, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chain) = &self.chain {
                if let Some(entry) = chain.entries.get(self.pos) {
                    self.pos += 1;
                    return Some((entry.key.clone(), entry.value.clone()));
                }
                self.chain = None;
            }
            if self.bucket >= self.table.buckets.len() {
                return None;
            }
            self.chain = self.table.buckets[self.bucket].load_full();
            self.bucket += 1;
            self.pos = 0;
        }
    }
}
