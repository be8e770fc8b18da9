//! The engine facade.
//!
//! A [`Converter`] is one engine instance: a private [`ContextId`] for its
//! overrides, its [`ConvertOptions`] and its resolution counters, on top of a
//! shared [`Runtime`].
//!
//! Resolution of `source → target` proceeds as follows, the first hit wins:
//!
//! 1. Resolved cache (fast path)
//! 2. Exact dispatch entry, instance table then shared table
//! 3. Identity when `source == target`
//! 4. Structural reshaping (sequences, enum sets, maps)
//! 5. Hierarchy resolution over ancestor pairs
//! 6. Identity when `source` is assignable to `target`
//! 7. Record field extraction into a `Map`
//!
//! Steps 2 to 7 form the slow path; a success is stored in the resolved cache.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::trace;

use morph_core::{ContextId, ConvertError, ConvertOptions, FromValue, RegistrationError, TypeHash, Value};
use morph_registry::{ConversionFn, Convert, Shape, TypeDescriptor, TypeUniverse};

use crate::runtime::{Runtime, next_context_id};

/// Counters of how conversions were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Conversions served from the resolved cache.
    pub fast_path_hits: u64,
    /// Conversions that ran the full search.
    pub slow_path_searches: u64,
}

/// A conversion engine instance.
///
/// Instances are cheap. Overrides added with [`Converter::add_conversion`]
/// are visible only to the instance that added them and are dropped with it.
pub struct Converter {
    runtime: Arc<Runtime>,
    ctx: ContextId,
    options: ConvertOptions,
    has_overrides: AtomicBool,
    fast_hits: AtomicU64,
    slow_searches: AtomicU64,
}

impl Converter {
    /// An instance on the process-wide runtime.
    pub fn new() -> Self {
        Self::with_runtime(Runtime::global())
    }

    pub fn with_runtime(runtime: Arc<Runtime>) -> Self {
        Self {
            runtime,
            ctx: next_context_id(),
            options: ConvertOptions::default(),
            has_overrides: AtomicBool::new(false),
            fast_hits: AtomicU64::new(0),
            slow_searches: AtomicU64::new(0),
        }
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// This instance's private context.
    pub fn context(&self) -> ContextId {
        self.ctx
    }

    /// Context under which `source → target` is searched and cached.
    ///
    /// Pairs untouched by this instance's overrides use the shared cache. A
    /// pair is touched when an override involves any member of the complete
    /// source or target hierarchy.
    #[inline]
    fn cache_context(&self, source: TypeHash, target: TypeHash) -> ContextId {
        if !self.has_overrides.load(Ordering::Acquire) {
            return ContextId::SHARED;
        }
        let dispatch = &self.runtime.dispatch;
        let hierarchy = &self.runtime.hierarchy;
        let touched = |ty: TypeHash| {
            dispatch.has_custom(self.ctx, ty)
                || hierarchy
                    .complete(ty)
                    .iter()
                    .any(|entry| dispatch.has_custom(self.ctx, entry.ty))
        };
        if touched(source) || touched(target) {
            self.ctx
        } else {
            ContextId::SHARED
        }
    }

    /// Convert `value` to `target`.
    pub fn convert(&self, value: Value, target: TypeHash) -> Result<Value, ConvertError> {
        let function = self.resolve(value.type_hash(), target)?;
        function.call(value, self, target)
    }

    /// Convert `value` to a Rust type.
    ///
    /// ```ignore
    /// let n: i32 = converter.convert_to(Value::from("42"))?;
    /// ```
    pub fn convert_to<T: FromValue>(&self, value: Value) -> Result<T, ConvertError> {
        let converted = self.convert(value, T::target())?;
        Ok(T::from_value(converted)?)
    }

    /// Find the function that converts `source` to `target`.
    ///
    /// Unknown and open-family targets never reach the resolved cache, so
    /// they are rejected on the slow path only.
    pub fn resolve(&self, source: TypeHash, target: TypeHash) -> Result<ConversionFn, ConvertError> {
        let ctx = self.cache_context(source, target);
        if let Some(function) = self.runtime.resolved.get(source, target, ctx) {
            self.fast_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(function);
        }

        let target_desc = self
            .runtime
            .universe
            .get(target)
            .ok_or_else(|| self.unsupported(source, target))?;
        if target_desc.is_open_family() {
            return Err(ConvertError::AmbiguousTarget {
                family: target_desc.name.clone(),
            });
        }

        self.slow_searches.fetch_add(1, Ordering::Relaxed);
        let function = self
            .search(source, &target_desc, ctx)
            .ok_or_else(|| self.unsupported(source, target))?;
        self.runtime.resolved.put(source, target, ctx, function.clone());
        Ok(function)
    }

    /// Slow path. Dispatch is searched in the same `ctx` the result is cached
    /// under, so a shared entry never holds an instance override.
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn search(&self, source: TypeHash, target_desc: &TypeDescriptor, ctx: ContextId) -> Option<ConversionFn> {
        let rt = &*self.runtime;
        let target = target_desc.hash;

        if let Some(function) = rt.dispatch.lookup(source, target, ctx) {
            trace!(%source, %target, "exact dispatch");
            return Some(function);
        }
        if source == target {
            return Some(ConversionFn::identity());
        }

        let source_desc = rt.universe.get(source);
        if let Some(function) = source_desc
            .as_deref()
            .and_then(|src| rt.structural.special_case(src, target_desc))
        {
            trace!(%source, %target, "structural");
            return Some(function);
        }

        if let Some(resolution) = rt.resolver.resolve(&rt.hierarchy, &rt.dispatch, source, target, ctx) {
            return Some(resolution.function);
        }
        if rt.hierarchy.is_assignable(source, target) {
            trace!(%source, %target, "assignable");
            return Some(ConversionFn::identity());
        }

        let extraction = source_desc
            .as_deref()
            .and_then(|src| rt.structural.record_extraction(src, target_desc));
        if extraction.is_some() {
            trace!(%source, %target, "record extraction");
        }
        extraction
    }

    fn unsupported(&self, source: TypeHash, target: TypeHash) -> ConvertError {
        ConvertError::Unsupported {
            from: self.runtime.universe.name_of(source),
            to: self.runtime.universe.name_of(target),
        }
    }

    /// Register an override visible only to this instance.
    ///
    /// The override also covers the primitive and boxed forms of both types.
    /// Returns the function previously registered by this instance for the
    /// exact pair.
    pub fn add_conversion(
        &self,
        function: ConversionFn,
        source: TypeHash,
        target: TypeHash,
    ) -> Result<Option<ConversionFn>, RegistrationError> {
        self.has_overrides.store(true, Ordering::Release);
        self.runtime
            .register_expanded(source, target, function, self.ctx, Some(self.ctx))
    }

    /// Whether `source → target` resolves to any function.
    pub fn is_conversion_supported(&self, source: TypeHash, target: TypeHash) -> bool {
        self.resolve(source, target).is_ok()
    }

    /// Like [`Converter::is_conversion_supported`], but always `false` for
    /// sequence, map and record targets. Answers are cached.
    pub fn is_simple_type_conversion_supported(&self, source: TypeHash, target: TypeHash) -> bool {
        let ctx = self.cache_context(source, target);
        if let Some(known) = self.runtime.resolved.support(source, target, ctx) {
            return known;
        }

        let structured = self.runtime.universe.get(target).is_some_and(|desc| {
            matches!(
                desc.shape,
                Shape::Collection | Shape::Array | Shape::Map | Shape::Record | Shape::EnumSet
            )
        });
        let supported = !structured && self.is_conversion_supported(source, target);
        self.runtime.resolved.put_support(source, target, ctx, supported);
        supported
    }

    /// Every `source → targets` this instance can convert directly: shared
    /// entries, this instance's overrides, and the shape-driven container and
    /// record conversions between declared types.
    pub fn all_supported_conversions(&self) -> BTreeMap<TypeHash, BTreeSet<TypeHash>> {
        let rt = &*self.runtime;
        let mut out: BTreeMap<TypeHash, BTreeSet<TypeHash>> = BTreeMap::new();
        for entry in rt
            .dispatch
            .shared_entries()
            .into_iter()
            .chain(rt.dispatch.context_entries(self.ctx))
        {
            out.entry(entry.source).or_default().insert(entry.target);
        }

        let shaped: Vec<Arc<TypeDescriptor>> = rt
            .universe
            .all_types()
            .into_iter()
            .filter_map(|ty| rt.universe.get(ty))
            .filter(|desc| !desc.is_open_family())
            .filter(|desc| {
                matches!(
                    desc.shape,
                    Shape::Collection | Shape::Array | Shape::EnumSet | Shape::Map | Shape::Record
                )
            })
            .collect();
        for source in &shaped {
            for target in &shaped {
                let structural = rt
                    .structural
                    .special_case(source, target)
                    .or_else(|| rt.structural.record_extraction(source, target));
                if structural.is_some() {
                    out.entry(source.hash).or_default().insert(target.hash);
                }
            }
        }
        out
    }

    /// [`Converter::all_supported_conversions`] by type name.
    pub fn supported_conversion_names(&self) -> BTreeMap<String, BTreeSet<String>> {
        let universe = &self.runtime.universe;
        self.all_supported_conversions()
            .into_iter()
            .map(|(source, targets)| {
                let names = targets.into_iter().map(|t| universe.name_of(t)).collect();
                (universe.name_of(source), names)
            })
            .collect()
    }

    pub fn stats(&self) -> ResolutionStats {
        ResolutionStats {
            fast_path_hits: self.fast_hits.load(Ordering::Relaxed),
            slow_path_searches: self.slow_searches.load(Ordering::Relaxed),
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Convert for Converter {
    fn convert(&self, value: Value, target: TypeHash) -> Result<Value, ConvertError> {
        Converter::convert(self, value, target)
    }

    fn types(&self) -> &TypeUniverse {
        &self.runtime.universe
    }

    fn options(&self) -> &ConvertOptions {
        &self.options
    }
}

impl Drop for Converter {
    fn drop(&mut self) {
        self.runtime.dispatch.remove_context(self.ctx);
        self.runtime.resolved.remove_context(self.ctx);
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("ctx", &self.ctx)
            .field("options", &self.options)
            .field("stats", &self.stats())
            .finish()
    }
}
