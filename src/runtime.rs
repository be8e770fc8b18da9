//! Shared conversion state.
//!
//! A [`Runtime`] owns everything engine instances share: the type universe,
//! the hierarchy caches, the dispatch table and the resolved-function cache.
//! [`Converter`](crate::Converter) instances hold an `Arc<Runtime>` and tell
//! their registrations apart only by [`ContextId`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use smallvec::SmallVec;
use tracing::debug;

use morph_core::{ContextId, RegistrationError, TypeHash};
use morph_registry::{
    BridgeExpander, ConversionFn, DispatchTable, HierarchyIndex, HierarchyResolver, Shape, TypeDescriptor,
    TypeUniverse,
};

use crate::catalog;
use crate::resolved::ResolvedCache;
use crate::structural::StructuralFns;

static GLOBAL: OnceLock<Arc<Runtime>> = OnceLock::new();
static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// Hands out a fresh, never reused instance context.
pub(crate) fn next_context_id() -> ContextId {
    ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
}

pub struct Runtime {
    pub(crate) universe: Arc<TypeUniverse>,
    pub(crate) hierarchy: HierarchyIndex,
    pub(crate) dispatch: DispatchTable,
    pub(crate) resolver: HierarchyResolver,
    pub(crate) resolved: ResolvedCache,
    pub(crate) structural: StructuralFns,
}

impl Runtime {
    /// Build a runtime with the built-in types and conversions installed.
    ///
    /// Bridge expansion runs twice: first the primitive ↔ boxed pairs, then the
    /// `TextBuf` ↔ `String` pair, so that `TextBuf → i32` composes through the
    /// `String → i32` function derived in the first pass.
    pub fn new() -> Result<Arc<Self>, RegistrationError> {
        let universe = Arc::new(TypeUniverse::new());
        catalog::declare_builtin_types(&universe)?;

        let dispatch = DispatchTable::new();
        catalog::register_builtin_conversions(&dispatch)?;

        let primitive = BridgeExpander::primitives().expand(&dispatch, &universe)?;
        let text = BridgeExpander::text().expand(&dispatch, &universe)?;
        debug!(
            types = universe.len(),
            functions = dispatch.len(),
            bridged = primitive + text,
            "runtime initialised"
        );

        Ok(Arc::new(Self {
            hierarchy: HierarchyIndex::new(Arc::clone(&universe)),
            universe,
            dispatch,
            resolver: HierarchyResolver::new(),
            resolved: ResolvedCache::new(),
            structural: StructuralFns::new(),
        }))
    }

    /// The process-wide runtime used by [`Converter::new`](crate::Converter::new).
    pub fn global() -> Arc<Runtime> {
        let runtime = GLOBAL.get_or_init(|| Runtime::new().expect("built-in catalogue must register"));
        Arc::clone(runtime)
    }

    pub fn types(&self) -> &TypeUniverse {
        &self.universe
    }

    pub fn hierarchy(&self) -> &HierarchyIndex {
        &self.hierarchy
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    /// Declare a user type. Parents must already be declared.
    pub fn declare_type(&self, desc: TypeDescriptor) -> Result<TypeHash, RegistrationError> {
        let enum_set = (desc.shape == Shape::Enum && !desc.is_open_family())
            .then(|| morph_core::types::enum_set_of(desc.hash));
        let declared = self.universe.declare(desc)?;

        // Lookups made before the declaration saw an unknown type.
        for ty in std::iter::once(declared.hash).chain(enum_set) {
            self.hierarchy.forget(ty);
            self.resolver.forget(ty);
            self.resolved.forget_type(ty);
        }
        Ok(declared.hash)
    }

    /// Declare a concrete enumeration and its `EnumSet<E>`.
    pub fn declare_enum<I, S>(&self, name: &str, variants: I) -> Result<TypeHash, RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declare_type(TypeDescriptor::enumeration(name, variants))
    }

    /// Declare a record type with the given required fields.
    pub fn declare_record<I, S>(&self, name: &str, fields: I) -> Result<TypeHash, RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declare_type(TypeDescriptor::record(name, fields))
    }

    /// Register a function visible to every engine instance.
    ///
    /// Like instance overrides, the registration covers the primitive and
    /// boxed forms of both types. Resolved entries of every context that
    /// involve a related type are dropped.
    pub fn register_shared(
        &self,
        source: TypeHash,
        target: TypeHash,
        function: ConversionFn,
    ) -> Result<Option<ConversionFn>, RegistrationError> {
        self.register_expanded(source, target, function, ContextId::SHARED, None)
    }

    /// Register `function` for every expansion of `source` and `target` in
    /// `ctx`, then invalidate `scope` (`None` for every context).
    pub(crate) fn register_expanded(
        &self,
        source: TypeHash,
        target: TypeHash,
        function: ConversionFn,
        ctx: ContextId,
        scope: Option<ContextId>,
    ) -> Result<Option<ConversionFn>, RegistrationError> {
        let sources = self.expansions(source);
        let targets = self.expansions(target);

        let mut previous = None;
        for &s in &sources {
            for &t in &targets {
                let replaced = self.dispatch.register(s, t, function.clone(), ctx)?;
                if s == source && t == target {
                    previous = replaced;
                }
            }
        }

        let changed: SmallVec<[TypeHash; 4]> = sources.iter().chain(targets.iter()).copied().collect();
        let dropped = self.resolved.invalidate(scope, &changed, &self.hierarchy);
        debug!(%source, %target, ctx = ctx.0, dropped, "registered with expansions");
        Ok(previous)
    }

    /// `ty` plus its primitive or boxed partner, if any.
    fn expansions(&self, ty: TypeHash) -> SmallVec<[TypeHash; 2]> {
        let mut out = SmallVec::new();
        out.push(ty);
        if let Some(partner) = self.universe.partner(ty) {
            out.push(partner);
        }
        out
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("types", &self.universe.len())
            .field("functions", &self.dispatch.len())
            .field("resolved", &self.resolved.len())
            .finish()
    }
}
