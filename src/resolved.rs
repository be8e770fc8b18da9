//! Resolved-function cache keyed by `(source, target, context)`.
//!
//! Only successful resolutions are stored. The simple-support map caches both
//! answers of [`Converter::is_simple_type_conversion_supported`].
//!
//! [`Converter::is_simple_type_conversion_supported`]: crate::Converter::is_simple_type_conversion_supported

use morph_cache::{CompositeKeyMap, KeyPart};
use morph_core::{ContextId, TypeHash};
use morph_registry::{ConversionFn, HierarchyIndex};

pub(crate) struct ResolvedCache {
    functions: CompositeKeyMap<ConversionFn>,
    support: CompositeKeyMap<bool>,
}

impl ResolvedCache {
    pub(crate) fn new() -> Self {
        Self {
            functions: CompositeKeyMap::with_capacity(512),
            support: CompositeKeyMap::with_capacity(64),
        }
    }

    #[inline]
    pub(crate) fn get(&self, source: TypeHash, target: TypeHash, ctx: ContextId) -> Option<ConversionFn> {
        self.functions.get3(&source.key(), &target.key(), &ctx.key())
    }

    pub(crate) fn put(&self, source: TypeHash, target: TypeHash, ctx: ContextId, function: ConversionFn) {
        self.functions.put3(source.key(), target.key(), ctx.key(), function);
    }

    pub(crate) fn support(&self, source: TypeHash, target: TypeHash, ctx: ContextId) -> Option<bool> {
        self.support.get3(&source.key(), &target.key(), &ctx.key())
    }

    pub(crate) fn put_support(&self, source: TypeHash, target: TypeHash, ctx: ContextId, supported: bool) {
        self.support.put3(source.key(), target.key(), ctx.key(), supported);
    }

    /// Drop entries whose source or target is related (either direction) to
    /// one of `changed`. `ctx` of `None` means every context.
    pub(crate) fn invalidate(&self, ctx: Option<ContextId>, changed: &[TypeHash], hierarchy: &HierarchyIndex) -> usize {
        let related = |ty: TypeHash| {
            changed
                .iter()
                .any(|&c| hierarchy.is_assignable(ty, c) || hierarchy.is_assignable(c, ty))
        };
        let stale = |key: &[KeyPart]| match decode(key) {
            Some((source, target, entry_ctx)) => {
                ctx.is_none_or(|c| c == entry_ctx) && (related(source) || related(target))
            }
            None => false,
        };
        self.functions.remove_if(|key, _| stale(key)) + self.support.remove_if(|key, _| stale(key))
    }

    /// Drop everything cached for one engine instance.
    pub(crate) fn remove_context(&self, ctx: ContextId) -> usize {
        let owned = |key: &[KeyPart]| decode(key).is_some_and(|(_, _, c)| c == ctx);
        self.functions.remove_if(|key, _| owned(key)) + self.support.remove_if(|key, _| owned(key))
    }

    /// Drop everything mentioning `ty` as source or target.
    pub(crate) fn forget_type(&self, ty: TypeHash) -> usize {
        let mentions = |key: &[KeyPart]| decode(key).is_some_and(|(s, t, _)| s == ty || t == ty);
        self.functions.remove_if(|key, _| mentions(key)) + self.support.remove_if(|key, _| mentions(key))
    }

    pub(crate) fn len(&self) -> usize {
        self.functions.len()
    }
}

fn decode(key: &[KeyPart]) -> Option<(TypeHash, TypeHash, ContextId)> {
    match key {
        [s, t, c] => Some((TypeHash(s.as_id()?), TypeHash(t.as_id()?), ContextId(c.as_id()?))),
        _ => None,
    }
}
