//! Type Hierarchy Index - ancestors with shortest distances.
//!
//! For a type, the index produces every supertype reachable through base and
//! interface edges together with the length of the shortest path to it. A type
//! inherited along several paths (a diamond) keeps its smallest distance.
//!
//! Two views are exposed:
//! - [`HierarchyIndex::complete`]: the type itself at distance 0 plus its ancestors
//! - [`HierarchyIndex::proper`]: ancestors only
//!
//! Both views leave out marker interfaces, which carry no conversion semantics.
//! Assignability still honours them.
//!
//! Entries are ordered by distance, then concrete before interface-like, then
//! name, then token, so resolution over the index is reproducible.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use morph_cache::CompositeKeyMap;
use morph_core::{TypeHash, types};

use crate::universe::TypeUniverse;

/// How an ancestor participates in resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AncestorKind {
    Concrete,
    Interface,
}

/// One ancestor of a host type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorEntry {
    pub ty: TypeHash,
    pub name: Arc<str>,
    /// Shortest path length from the host type; 0 is the host itself.
    pub distance: u32,
    pub kind: AncestorKind,
}

impl AncestorEntry {
    pub fn is_interface_like(&self) -> bool {
        self.kind != AncestorKind::Concrete
    }

    /// The total order used for every hierarchy view.
    pub fn order(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.is_interface_like().cmp(&other.is_interface_like()))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.ty.cmp(&other.ty))
    }
}

struct Ancestry {
    /// Self and ancestors without markers, ordered.
    complete: Arc<[AncestorEntry]>,
    /// Every supertype including markers, and self.
    supertypes: FxHashSet<TypeHash>,
}

/// Cached hierarchy queries over a [`TypeUniverse`].
pub struct HierarchyIndex {
    universe: Arc<TypeUniverse>,
    cache: CompositeKeyMap<Arc<Ancestry>>,
}

impl HierarchyIndex {
    pub fn new(universe: Arc<TypeUniverse>) -> Self {
        Self {
            universe,
            cache: CompositeKeyMap::new(),
        }
    }

    pub fn universe(&self) -> &TypeUniverse {
        &self.universe
    }

    /// Self (distance 0) plus ancestors, markers excluded.
    pub fn complete(&self, ty: TypeHash) -> Arc<[AncestorEntry]> {
        Arc::clone(&self.ancestry(ty).complete)
    }

    /// Ancestors without the type itself, markers excluded.
    pub fn proper(&self, ty: TypeHash) -> Vec<AncestorEntry> {
        self.ancestry(ty)
            .complete
            .iter()
            .filter(|e| e.distance > 0)
            .cloned()
            .collect()
    }

    /// Whether a value of type `from` may be used where `to` is expected.
    ///
    /// The null sentinel is assignable to every non-primitive type. Primitive
    /// forms are only assignable to themselves.
    pub fn is_assignable(&self, from: TypeHash, to: TypeHash) -> bool {
        if from == to {
            return true;
        }
        let to_primitive = self.universe.get(to).is_some_and(|d| d.is_primitive());
        if to_primitive {
            return false;
        }
        if from == types::NULL {
            return true;
        }
        self.ancestry(from).supertypes.contains(&to)
    }

    /// Drop the cached ancestry of `ty`, e.g. after it was (re)declared.
    pub fn forget(&self, ty: TypeHash) -> bool {
        self.cache.remove(&[ty.key()]).is_some()
    }

    fn ancestry(&self, ty: TypeHash) -> Arc<Ancestry> {
        if let Some(hit) = self.cache.get1(&ty.key()) {
            return hit;
        }
        let computed = Arc::new(self.compute(ty));
        // Losing a race just means both threads computed the same answer.
        self.cache.put_if_absent(&[ty.key()], Arc::clone(&computed));
        computed
    }

    fn compute(&self, ty: TypeHash) -> Ancestry {
        let mut supertypes = FxHashSet::default();
        let mut complete = Vec::new();
        let mut queue = VecDeque::new();

        supertypes.insert(ty);
        queue.push_back((ty, 0u32));

        // BFS reaches every node first along a shortest path.
        while let Some((current, distance)) = queue.pop_front() {
            if let Some(entry) = self.entry(current, distance) {
                complete.push(entry);
            }
            for (parent, _) in self.universe.parents(current) {
                if supertypes.insert(parent) {
                    queue.push_back((parent, distance + 1));
                }
            }
        }

        complete.sort_by(AncestorEntry::order);
        Ancestry {
            complete: complete.into(),
            supertypes,
        }
    }

    fn entry(&self, ty: TypeHash, distance: u32) -> Option<AncestorEntry> {
        let (name, kind) = match self.universe.get(ty) {
            Some(desc) if desc.is_marker() => return None,
            Some(desc) if desc.is_interface_like() => (desc.name.as_str().into(), AncestorKind::Interface),
            Some(desc) => (desc.name.as_str().into(), AncestorKind::Concrete),
            None => (ty.to_string().into(), AncestorKind::Concrete),
        };
        Some(AncestorEntry {
            ty,
            name,
            distance,
            kind,
        })
    }
}

impl std::fmt::Debug for HierarchyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyIndex")
            .field("cached", &self.cache.len())
            .finish()
    }
}
