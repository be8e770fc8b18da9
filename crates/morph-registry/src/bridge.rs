//! Bridge Expander - composite functions for narrow/canonical type pairs.
//!
//! A bridge pair joins a narrow type to its canonical counterpart (`i32` and
//! `Int32`, `TextBuf` and `String`). Expansion derives, from the shared table:
//!
//! 1. `narrow → X` for every registered `canonical → X`, as
//!    `narrow → canonical` followed by `canonical → X`
//! 2. `Y → narrow` for every registered `Y → canonical`, as
//!    `Y → canonical` followed by `canonical → narrow`
//!
//! Both passes read a single snapshot taken before expansion starts, so a
//! composite created here never feeds another composite of the same run.
//! Existing registrations always win over composites.

use rustc_hash::FxHashSet;
use tracing::debug;

use morph_core::{ContextId, RegistrationError, TypeHash, types};

use crate::dispatch::{DispatchEntry, DispatchTable};
use crate::function::ConversionFn;
use crate::universe::TypeUniverse;

/// Derives composite functions for bridge pairs.
#[derive(Debug, Clone, Default)]
pub struct BridgeExpander {
    /// `(narrow, canonical)`
    to_canonical: Vec<(TypeHash, TypeHash)>,
    /// `(canonical, narrow)`
    from_canonical: Vec<(TypeHash, TypeHash)>,
}

impl BridgeExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every primitive form paired with its boxed form.
    pub fn primitives() -> Self {
        types::PRIMITIVE_PAIRS
            .iter()
            .fold(Self::new(), |exp, &(prim, boxed)| exp.with_pair(prim, boxed))
    }

    /// `TextBuf` paired with `String`.
    pub fn text() -> Self {
        Self::new().with_pair(types::TEXT_BUF, types::STRING)
    }

    /// Add a pair in both directions.
    pub fn with_pair(self, narrow: TypeHash, canonical: TypeHash) -> Self {
        self.with_to_canonical(narrow, canonical)
            .with_from_canonical(canonical, narrow)
    }

    pub fn with_to_canonical(mut self, narrow: TypeHash, canonical: TypeHash) -> Self {
        self.to_canonical.push((narrow, canonical));
        self
    }

    pub fn with_from_canonical(mut self, canonical: TypeHash, narrow: TypeHash) -> Self {
        self.from_canonical.push((canonical, narrow));
        self
    }

    /// Add composites to the shared table. Returns how many were added.
    pub fn expand(&self, table: &DispatchTable, universe: &TypeUniverse) -> Result<usize, RegistrationError> {
        let snapshot = table.shared_entries();
        let mut present: FxHashSet<(TypeHash, TypeHash)> =
            snapshot.iter().map(|e| (e.source, e.target)).collect();
        let mut added = 0;

        for &(narrow, canonical) in &self.to_canonical {
            let step = defining_step(&snapshot, narrow, canonical, universe)?;
            for entry in snapshot.iter().filter(|e| e.source == canonical) {
                let target = entry.target;
                if target == narrow || !present.insert((narrow, target)) {
                    continue;
                }
                let composite = ConversionFn::compose(step.clone(), canonical, entry.function.clone());
                table.register(narrow, target, composite, ContextId::SHARED)?;
                added += 1;
            }
        }

        for &(canonical, narrow) in &self.from_canonical {
            let step = defining_step(&snapshot, canonical, narrow, universe)?;
            for entry in snapshot.iter().filter(|e| e.target == canonical) {
                let source = entry.source;
                if source == narrow || !present.insert((source, narrow)) {
                    continue;
                }
                let composite = ConversionFn::compose(entry.function.clone(), canonical, step.clone());
                table.register(source, narrow, composite, ContextId::SHARED)?;
                added += 1;
            }
        }

        debug!(pairs = self.to_canonical.len() + self.from_canonical.len(), added, "expanded bridges");
        Ok(added)
    }
}

fn defining_step(
    snapshot: &[DispatchEntry],
    from: TypeHash,
    to: TypeHash,
    universe: &TypeUniverse,
) -> Result<ConversionFn, RegistrationError> {
    snapshot
        .iter()
        .find(|e| e.source == from && e.target == to)
        .map(|e| e.function.clone())
        .ok_or_else(|| RegistrationError::MissingBridgeStep {
            from: universe.name_of(from),
            to: universe.name_of(to),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FnKind;
    use crate::function::tests::NoEngine;
    use morph_core::{Value, ValueError};

    fn narrow() -> TypeHash {
        TypeHash::from_name("Narrow")
    }

    fn canonical() -> TypeHash {
        TypeHash::from_name("Canonical")
    }

    fn tag(label: &'static str) -> ConversionFn {
        ConversionFn::from_value_fn(move |v| {
            let prefix = v.as_str().map(str::to_owned).unwrap_or_default();
            Ok(Value::String(format!("{prefix}{label}")))
        })
    }

    fn shared(table: &DispatchTable, from: TypeHash, to: TypeHash, f: ConversionFn) {
        table.register(from, to, f, ContextId::SHARED).unwrap();
    }

    fn seeded() -> DispatchTable {
        let table = DispatchTable::new();
        shared(&table, narrow(), canonical(), tag("n>c;"));
        shared(&table, canonical(), narrow(), tag("c>n;"));
        shared(&table, canonical(), types::STRING, tag("c>s;"));
        shared(&table, types::BOOL, canonical(), tag("b>c;"));
        table
    }

    fn run(table: &DispatchTable, from: TypeHash, to: TypeHash) -> Value {
        table
            .lookup(from, to, ContextId::SHARED)
            .unwrap()
            .call(Value::from(""), &NoEngine::new(), to)
            .unwrap()
    }

    #[test]
    fn narrow_to_canonical_targets() {
        let table = seeded();
        let expander = BridgeExpander::new().with_pair(narrow(), canonical());
        expander.expand(&table, &TypeUniverse::new()).unwrap();

        let f = table.lookup(narrow(), types::STRING, ContextId::SHARED).unwrap();
        assert_eq!(f.kind(), FnKind::Bridge { via: canonical() });
        assert_eq!(run(&table, narrow(), types::STRING), Value::from("n>c;c>s;"));
    }

    #[test]
    fn canonical_sources_to_narrow() {
        let table = seeded();
        BridgeExpander::new()
            .with_pair(narrow(), canonical())
            .expand(&table, &TypeUniverse::new())
            .unwrap();

        assert_eq!(run(&table, types::BOOL, narrow()), Value::from("b>c;c>n;"));
    }

    #[test]
    fn composite_passes_requested_target_to_second_step() {
        let table = DispatchTable::new();
        let seen = ConversionFn::new(|_, _, target| Ok(Value::I64(target.as_u64() as i64)));
        shared(&table, narrow(), canonical(), ConversionFn::identity());
        shared(&table, canonical(), narrow(), ConversionFn::identity());
        shared(&table, canonical(), types::STRING, seen);

        BridgeExpander::new()
            .with_pair(narrow(), canonical())
            .expand(&table, &TypeUniverse::new())
            .unwrap();

        let requested = TypeHash::from_name("Specific");
        let out = table
            .lookup(narrow(), types::STRING, ContextId::SHARED)
            .unwrap()
            .call(Value::Null, &NoEngine::new(), requested)
            .unwrap();
        assert_eq!(out, Value::I64(requested.as_u64() as i64));
    }

    #[test]
    fn existing_registrations_win() {
        let table = seeded();
        let direct = tag("direct;");
        shared(&table, narrow(), types::STRING, direct.clone());

        BridgeExpander::new()
            .with_pair(narrow(), canonical())
            .expand(&table, &TypeUniverse::new())
            .unwrap();

        assert!(table
            .lookup(narrow(), types::STRING, ContextId::SHARED)
            .unwrap()
            .ptr_eq(&direct));
    }

    #[test]
    fn composites_do_not_feed_the_same_run() {
        let table = seeded();
        let expander = BridgeExpander::new().with_pair(narrow(), canonical());
        let added = expander.expand(&table, &TypeUniverse::new()).unwrap();

        // narrow → String and Bool → narrow only; no Bool → narrow → String chain.
        assert_eq!(added, 2);
        assert!(table.lookup(types::BOOL, types::STRING, ContextId::SHARED).is_none());
    }

    #[test]
    fn second_expansion_is_idempotent() {
        let table = seeded();
        let expander = BridgeExpander::new().with_pair(narrow(), canonical());
        expander.expand(&table, &TypeUniverse::new()).unwrap();
        assert_eq!(expander.expand(&table, &TypeUniverse::new()).unwrap(), 0);
    }

    #[test]
    fn missing_step_is_reported() {
        let table = DispatchTable::new();
        shared(&table, canonical(), types::STRING, tag("c>s;"));

        let err = BridgeExpander::new()
            .with_pair(narrow(), canonical())
            .expand(&table, &TypeUniverse::new())
            .unwrap_err();
        assert!(matches!(err, RegistrationError::MissingBridgeStep { .. }));
    }

    #[test]
    fn composite_propagates_step_errors() {
        let table = DispatchTable::new();
        let reject = ConversionFn::from_value_fn(|_| {
            Err(ValueError::IntegerOverflow {
                value: "300".into(),
                target: "Narrow".into(),
            }
            .into())
        });
        shared(&table, narrow(), canonical(), ConversionFn::identity());
        shared(&table, canonical(), narrow(), reject);
        shared(&table, types::BOOL, canonical(), ConversionFn::identity());

        BridgeExpander::new()
            .with_pair(narrow(), canonical())
            .expand(&table, &TypeUniverse::new())
            .unwrap();

        let err = table
            .lookup(types::BOOL, narrow(), ContextId::SHARED)
            .unwrap()
            .call(Value::Bool(true), &NoEngine::new(), narrow())
            .unwrap_err();
        assert!(err.is_value());
    }

    #[test]
    fn builtin_pair_sets() {
        assert_eq!(BridgeExpander::primitives().to_canonical.len(), 8);
        assert_eq!(BridgeExpander::text().from_canonical, vec![(types::STRING, types::TEXT_BUF)]);
    }
}
