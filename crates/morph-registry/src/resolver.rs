//! Hierarchy Resolver - fall back to ancestor pairs when no exact function exists.
//!
//! For a request `source → target`, the resolver crosses the complete hierarchy
//! of the source with the complete hierarchy of the target, orders the pairs,
//! and returns the first pair that has a registered (non-marker) function.
//!
//! Pair order, most preferred first:
//! 1. target candidate is the requested target
//! 2. more specific target candidate (assignable to more of the target's
//!    hierarchy)
//! 3. smaller `source_distance + target_distance`
//! 4. concrete source candidate before interface-like
//! 5. concrete target candidate before interface-like
//! 6. names, then tokens
//!
//! The pair list depends only on the two types, so it is cached per
//! `(source, target)` and shared by every context.

use std::cmp::{Ordering, Reverse};
use std::sync::Arc;

use tracing::trace;

use morph_cache::CompositeKeyMap;
use morph_core::{ContextId, TypeHash};

use crate::dispatch::DispatchTable;
use crate::function::ConversionFn;
use crate::hierarchy::{AncestorEntry, HierarchyIndex};

/// One cell of the source × target hierarchy cross product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritancePair {
    pub source: TypeHash,
    pub target: TypeHash,
    pub source_distance: u32,
    pub target_distance: u32,
    pub source_interface: bool,
    pub target_interface: bool,
    /// Number of the requested target's hierarchy members this target
    /// candidate is assignable to.
    pub target_specificity: u32,
    pub source_name: Arc<str>,
    pub target_name: Arc<str>,
}

impl InheritancePair {
    fn new(source: &AncestorEntry, target: &AncestorEntry, target_specificity: u32) -> Self {
        Self {
            source: source.ty,
            target: target.ty,
            source_distance: source.distance,
            target_distance: target.distance,
            source_interface: source.is_interface_like(),
            target_interface: target.is_interface_like(),
            target_specificity,
            source_name: Arc::clone(&source.name),
            target_name: Arc::clone(&target.name),
        }
    }

    pub fn combined_distance(&self) -> u32 {
        self.source_distance + self.target_distance
    }

    pub fn is_reflexive(&self) -> bool {
        self.source == self.target
    }

    fn order(&self, other: &Self, requested: TypeHash) -> Ordering {
        (self.target != requested)
            .cmp(&(other.target != requested))
            .then_with(|| Reverse(self.target_specificity).cmp(&Reverse(other.target_specificity)))
            .then_with(|| self.combined_distance().cmp(&other.combined_distance()))
            .then_with(|| self.source_interface.cmp(&other.source_interface))
            .then_with(|| self.target_interface.cmp(&other.target_interface))
            .then_with(|| self.source_name.cmp(&other.source_name))
            .then_with(|| self.target_name.cmp(&other.target_name))
            .then_with(|| self.source.cmp(&other.source))
            .then_with(|| self.target.cmp(&other.target))
    }
}

/// The pair and function a resolution settled on.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub pair: InheritancePair,
    pub function: ConversionFn,
}

/// Searches ancestor pairs for a registered function.
#[derive(Debug, Default)]
pub struct HierarchyResolver {
    pairs: CompositeKeyMap<Arc<[InheritancePair]>>,
}

impl HierarchyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered candidate pairs for `source → target`.
    pub fn candidates(&self, hierarchy: &HierarchyIndex, source: TypeHash, target: TypeHash) -> Arc<[InheritancePair]> {
        if let Some(hit) = self.pairs.get2(&source.key(), &target.key()) {
            return hit;
        }

        let sources = hierarchy.complete(source);
        let targets = hierarchy.complete(target);

        let mut pairs = Vec::with_capacity(sources.len() * targets.len());
        for t in targets.iter() {
            let specificity = targets
                .iter()
                .filter(|member| hierarchy.is_assignable(t.ty, member.ty))
                .count() as u32;
            for s in sources.iter() {
                pairs.push(InheritancePair::new(s, t, specificity));
            }
        }
        pairs.sort_by(|a, b| a.order(b, target));

        let pairs: Arc<[InheritancePair]> = pairs.into();
        self.pairs
            .put_if_absent(&[source.key(), target.key()], Arc::clone(&pairs));
        pairs
    }

    /// Walk the ordered pairs and return the first registered function visible
    /// from `ctx`. Reflexive pairs are skipped.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(
        &self,
        hierarchy: &HierarchyIndex,
        table: &DispatchTable,
        source: TypeHash,
        target: TypeHash,
        ctx: ContextId,
    ) -> Option<Resolution> {
        let candidates = self.candidates(hierarchy, source, target);
        for pair in candidates.iter().filter(|p| !p.is_reflexive()) {
            if let Some(function) = table.lookup(pair.source, pair.target, ctx) {
                trace!(
                    source = %pair.source_name,
                    target = %pair.target_name,
                    distance = pair.combined_distance(),
                    "resolved through hierarchy"
                );
                return Some(Resolution {
                    pair: pair.clone(),
                    function,
                });
            }
        }
        trace!(%source, %target, candidates = candidates.len(), "no hierarchy match");
        None
    }

    /// Drop every cached pair list with `ty` on either side.
    pub fn forget(&self, ty: TypeHash) -> usize {
        let key = ty.key();
        self.pairs.remove_if(|parts, _| parts.contains(&key))
    }

    /// Number of cached pair lists.
    pub fn cached(&self) -> usize {
        self.pairs.len()
    }
}
