//! Dispatch Registry - registered conversion functions by (source, target, context).
//!
//! One [`CompositeKeyMap`] holds both the shared table (context
//! [`ContextId::SHARED`]) and every instance's private override table. An
//! instance lookup probes its own context first and then the shared one.
//!
//! Every type that takes part in an instance override also gets a reflexive
//! `Marker` entry `(ty, ty, ctx)` in that instance's table, so "does this
//! instance customise `ty`?" is a single probe.

use std::fmt;

use tracing::debug;

use morph_cache::{CompositeKeyMap, KeyPart};
use morph_core::{ContextId, RegistrationError, TypeHash};

use crate::function::ConversionFn;

/// One registered function.
#[derive(Debug, Clone)]
pub struct DispatchEntry {
    pub source: TypeHash,
    pub target: TypeHash,
    pub context: ContextId,
    pub function: ConversionFn,
}

/// Table of registered conversion functions.
pub struct DispatchTable {
    entries: CompositeKeyMap<ConversionFn>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self {
            entries: CompositeKeyMap::with_capacity(256),
        }
    }

    /// Register `function` for `source → target` in `ctx`, returning whatever
    /// was registered for that exact key before.
    ///
    /// Registering into an instance context also records reflexive markers for
    /// both types. A user function registered for an exact `ty → ty` pair
    /// replaces the marker for that pair.
    pub fn register(
        &self,
        source: TypeHash,
        target: TypeHash,
        function: ConversionFn,
        ctx: ContextId,
    ) -> Result<Option<ConversionFn>, RegistrationError> {
        if source.is_empty() || target.is_empty() {
            return Err(RegistrationError::InvalidRegistration(format!(
                "empty type token in {} -> {}",
                source, target
            )));
        }
        if function.is_marker() {
            return Err(RegistrationError::InvalidRegistration(
                "marker entries are managed by the registry".into(),
            ));
        }

        if !ctx.is_shared() {
            self.mark(ctx, source);
            self.mark(ctx, target);
        }

        let previous = self
            .entries
            .put3(source.key(), target.key(), ctx.key(), function)
            .filter(|f| !f.is_marker());
        debug!(%source, %target, ctx = ctx.0, replaced = previous.is_some(), "registered conversion");
        Ok(previous)
    }

    fn mark(&self, ctx: ContextId, ty: TypeHash) {
        self.entries
            .put_if_absent(&[ty.key(), ty.key(), ctx.key()], ConversionFn::marker());
    }

    /// Instance table, then shared table. Markers are never returned.
    pub fn lookup(&self, source: TypeHash, target: TypeHash, ctx: ContextId) -> Option<ConversionFn> {
        if !ctx.is_shared() {
            if let Some(f) = self.lookup_exact(source, target, ctx) {
                return Some(f);
            }
        }
        self.lookup_exact(source, target, ContextId::SHARED)
    }

    /// Only the given context. Markers are never returned.
    pub fn lookup_exact(&self, source: TypeHash, target: TypeHash, ctx: ContextId) -> Option<ConversionFn> {
        self.entries
            .get3(&source.key(), &target.key(), &ctx.key())
            .filter(|f| !f.is_marker())
    }

    /// Whether `ctx` has any override involving `ty`.
    #[inline]
    pub fn has_custom(&self, ctx: ContextId, ty: TypeHash) -> bool {
        !ctx.is_shared() && self.entries.contains_key(&[ty.key(), ty.key(), ctx.key()])
    }

    /// Snapshot of the shared table.
    pub fn shared_entries(&self) -> Vec<DispatchEntry> {
        self.context_entries(ContextId::SHARED)
    }

    /// Snapshot of one context's table, markers excluded.
    pub fn context_entries(&self, ctx: ContextId) -> Vec<DispatchEntry> {
        self.entries
            .iter()
            .filter(|(_, f)| !f.is_marker())
            .filter_map(|(key, function)| {
                let entry = decode(&key, function)?;
                (entry.context == ctx).then_some(entry)
            })
            .collect()
    }

    /// Drop an instance's private table.
    pub fn remove_context(&self, ctx: ContextId) -> usize {
        if ctx.is_shared() {
            return 0;
        }
        let removed = self
            .entries
            .remove_if(|key, _| context_of(key) == Some(ctx));
        debug!(ctx = ctx.0, removed, "removed context");
        removed
    }

    /// Number of entries across all contexts, markers included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn context_of(key: &[KeyPart]) -> Option<ContextId> {
    key.get(2).and_then(KeyPart::as_id).map(ContextId)
}

fn decode(key: &[KeyPart], function: ConversionFn) -> Option<DispatchEntry> {
    match key {
        [source, target, ctx] => Some(DispatchEntry {
            source: TypeHash(source.as_id()?),
            target: TypeHash(target.as_id()?),
            context: ContextId(ctx.as_id()?),
            function,
        }),
        _ => None,
    }
}
