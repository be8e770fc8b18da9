//! Integration tests for the conversion engine.
//!
//! Each test builds its own [`Runtime`] so that declarations and shared
//! registrations never leak between tests.

use std::sync::Arc;

use indexmap::IndexMap;
use morph::{
    ConversionFn, ConvertError, ConvertOptions, Converter, EnumSetValue, EnumValue, Record, ResolutionStats, Runtime,
    Shape, TypeDescriptor, TypeHash, Value, ValueError, types,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fresh() -> Converter {
    init_tracing();
    Converter::with_runtime(Runtime::new().expect("runtime"))
}

fn constant(value: Value) -> ConversionFn {
    ConversionFn::from_value_fn(move |_| Ok(value.clone()))
}

// =============================================================================
// Identity and caching
// =============================================================================

#[test]
fn test_identity_law() {
    let c = fresh();
    let color = c.runtime().declare_enum("Color", ["Red", "Green"]).unwrap();
    let point = c.runtime().declare_record("Point", ["x"]).unwrap();

    let mut map = IndexMap::new();
    map.insert("k".to_string(), Value::I8(1));

    let samples = vec![
        Value::Bool(true),
        Value::Char('q'),
        Value::I8(-1),
        Value::I16(300),
        Value::I32(7),
        Value::I64(1 << 40),
        Value::F32(0.5),
        Value::F64(-2.25),
        Value::from("text"),
        Value::TextBuf("buffer".into()),
        Value::List(vec![Value::I32(1)]),
        Value::Array(vec![Value::from("a")]),
        Value::Map(map),
        Value::Enum(EnumValue::new(color, "Green")),
        Value::Record(Record::new(point).with_field("x", 1i64)),
    ];
    for value in samples {
        let ty = value.type_hash();
        assert_eq!(c.convert(value.clone(), ty).unwrap(), value, "identity for {}", ty);
    }
}

#[test]
fn test_second_conversion_uses_fast_path() {
    let c = fresh();
    let first = c.convert(Value::I64(12), types::STRING).unwrap();
    let after_first = c.stats();
    let second = c.convert(Value::I64(12), types::STRING).unwrap();
    let after_second = c.stats();

    assert_eq!(first, second);
    assert_eq!(after_first.slow_path_searches, 1);
    assert_eq!(after_second.slow_path_searches, after_first.slow_path_searches);
    assert_eq!(after_second.fast_path_hits, after_first.fast_path_hits + 1);
}

#[test]
fn test_stats_start_at_zero() {
    assert_eq!(fresh().stats(), ResolutionStats::default());
}

// =============================================================================
// Built-in catalogue
// =============================================================================

#[test]
fn test_numbers_format_through_display() {
    let c = fresh();
    assert_eq!(c.convert(Value::I32(-5), types::STRING).unwrap(), Value::from("-5"));
    assert_eq!(c.convert(Value::Bool(false), types::STRING).unwrap(), Value::from("false"));
    assert_eq!(c.convert(Value::Char('z'), types::STRING).unwrap(), Value::from("z"));
}

#[test]
fn test_text_parses_to_numbers() {
    let c = fresh();
    assert_eq!(c.convert(Value::from(" 42 "), types::INT32).unwrap(), Value::I32(42));
    assert_eq!(c.convert(Value::from("2.5"), types::FLOAT64).unwrap(), Value::F64(2.5));
    assert_eq!(c.convert(Value::from("off"), types::BOOL).unwrap(), Value::Bool(false));
}

#[test]
fn test_numeric_widening_and_narrowing() {
    let c = fresh();
    assert_eq!(c.convert(Value::I8(9), types::INT64).unwrap(), Value::I64(9));
    assert_eq!(c.convert(Value::F64(9.99), types::INT16).unwrap(), Value::I16(9));
    assert!(matches!(
        c.convert(Value::I64(70_000), types::INT16),
        Err(ConvertError::Value(ValueError::IntegerOverflow { .. }))
    ));
}

#[test]
fn test_bridged_primitive_targets() {
    let c = fresh();
    assert_eq!(c.convert(Value::from("12"), types::PRIM_I32).unwrap(), Value::I32(12));
    assert_eq!(c.convert(Value::I16(3), types::PRIM_F64).unwrap(), Value::F64(3.0));
    assert_eq!(c.convert(Value::I32(4), types::PRIM_I32).unwrap(), Value::I32(4));
}

#[test]
fn test_text_buffers_bridge_through_string() {
    let c = fresh();
    let buf = || Value::TextBuf("64".into());
    assert_eq!(c.convert(buf(), types::INT64).unwrap(), Value::I64(64));
    assert_eq!(c.convert(buf(), types::PRIM_F32).unwrap(), Value::F32(64.0));
    assert_eq!(c.convert(buf(), types::STRING).unwrap(), Value::from("64"));
    assert_eq!(c.convert(Value::from("x"), types::TEXT_BUF).unwrap(), Value::TextBuf("x".into()));
}

#[test]
fn test_typed_convenience() {
    let c = fresh();
    let n: i32 = c.convert_to(Value::from("17")).unwrap();
    let f: f64 = c.convert_to(Value::I8(2)).unwrap();
    let s: String = c.convert_to(Value::F64(1.5)).unwrap();
    let b: bool = c.convert_to(Value::from("YES")).unwrap();
    let ch: char = c.convert_to(Value::from("k")).unwrap();
    assert_eq!((n, f, s.as_str(), b, ch), (17, 2.0, "1.5", true, 'k'));
}

// =============================================================================
// Null policy
// =============================================================================

#[test]
fn test_null_to_primitives_is_zero() {
    let c = fresh();
    assert_eq!(c.convert(Value::Null, types::PRIM_I32).unwrap(), Value::I32(0));
    assert_eq!(c.convert(Value::Null, types::PRIM_BOOL).unwrap(), Value::Bool(false));
    assert_eq!(c.convert(Value::Null, types::PRIM_F64).unwrap(), Value::F64(0.0));
    assert_eq!(c.convert_to::<i64>(Value::Null).unwrap(), 0);
}

#[test]
fn test_null_to_everything_else_is_null() {
    let c = fresh();
    let point = c.runtime().declare_record("Point", ["x"]).unwrap();
    for target in [types::INT32, types::STRING, types::LIST, types::MAP, types::ANY, point] {
        assert_eq!(c.convert(Value::Null, target).unwrap(), Value::Null);
    }
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_unsupported_names_both_types() {
    let c = fresh();
    let err = c.convert(Value::from("x"), types::MAP).unwrap_err();
    assert_eq!(
        err,
        ConvertError::Unsupported {
            from: "String".into(),
            to: "Map".into()
        }
    );
    assert_eq!(err.to_string(), "no conversion from String to Map");
    assert!(err.is_unsupported());
}

#[test]
fn test_unknown_target_is_unsupported() {
    let c = fresh();
    let err = c.convert(Value::I32(1), TypeHash::from_name("Nowhere")).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn test_unresolvable_targets_are_never_cached() {
    let c = fresh();
    let shade = TypeHash::from_name("Shade");
    assert!(c.convert(Value::from("Dark"), shade).unwrap_err().is_unsupported());
    assert!(c.convert(Value::from("Dark"), types::ENUM).is_err());
    assert_eq!(c.stats(), ResolutionStats::default());

    c.runtime().declare_enum("Shade", ["Dark", "Light"]).unwrap();
    assert_eq!(
        c.convert(Value::from("Dark"), shade).unwrap(),
        Value::Enum(EnumValue::new(shade, "Dark"))
    );
    assert_eq!(c.stats().slow_path_searches, 1);
}

#[test]
fn test_open_family_targets_are_ambiguous() {
    let c = fresh();
    c.runtime().declare_enum("Color", ["Red"]).unwrap();
    assert_eq!(
        c.convert(Value::from("Red"), types::ENUM),
        Err(ConvertError::AmbiguousTarget { family: "Enum".into() })
    );
    assert!(matches!(
        c.convert(Value::List(vec![]), types::ENUM_SET),
        Err(ConvertError::AmbiguousTarget { .. })
    ));
}

#[test]
fn test_value_errors_propagate_unchanged() {
    let c = fresh();
    assert_eq!(
        c.convert(Value::from("300"), types::INT8),
        Err(ConvertError::Value(ValueError::IntegerOverflow {
            value: "300".into(),
            target: "Int8".into()
        }))
    );
    assert!(matches!(
        c.convert(Value::from("abc"), types::INT32),
        Err(ConvertError::Value(ValueError::InvalidFormat { .. }))
    ));
    assert!(matches!(
        c.convert(Value::F64(f64::INFINITY), types::INT64),
        Err(ConvertError::Value(ValueError::NotFinite { .. }))
    ));
}

// =============================================================================
// Enumerations and structures
// =============================================================================

#[test]
fn test_enums_round_trip_through_text() {
    let c = fresh();
    let color = c.runtime().declare_enum("Color", ["Red", "Green"]).unwrap();

    assert_eq!(
        c.convert(Value::from("green"), color).unwrap(),
        Value::Enum(EnumValue::new(color, "Green"))
    );
    assert_eq!(
        c.convert(Value::Enum(EnumValue::new(color, "Red")), types::STRING).unwrap(),
        Value::from("Red")
    );
    assert_eq!(
        c.convert(Value::from("Purple"), color),
        Err(ConvertError::Value(ValueError::UnknownVariant {
            variant: "Purple".into(),
            enum_name: "Color".into()
        }))
    );
}

#[test]
fn test_text_buffer_to_enum() {
    let c = fresh();
    let size = c.runtime().declare_enum("Size", ["Small", "Large"]).unwrap();
    assert_eq!(
        c.convert(Value::TextBuf("large".into()), size).unwrap(),
        Value::Enum(EnumValue::new(size, "Large"))
    );
}

#[test]
fn test_enum_sets_from_sequences() {
    let c = fresh();
    let color = c.runtime().declare_enum("Color", ["Red", "Green", "Blue"]).unwrap();
    let set_type = types::enum_set_of(color);

    let array = Value::Array(vec![Value::from("Blue"), Value::Enum(EnumValue::new(color, "Red"))]);
    let mut expected = EnumSetValue::new(color);
    expected.insert("Blue");
    expected.insert("Red");
    assert_eq!(c.convert(array, set_type).unwrap(), Value::EnumSet(expected));

    assert!(matches!(
        c.convert(Value::List(vec![Value::from("Mauve")]), set_type),
        Err(ConvertError::Value(ValueError::UnknownVariant { .. }))
    ));
}

#[test]
fn test_map_shaped_types_copy() {
    let c = fresh();
    c.runtime()
        .declare_type(TypeDescriptor::new("Settings", Shape::Map))
        .unwrap();
    let settings = TypeHash::from_name("Settings");

    let mut entries = IndexMap::new();
    entries.insert("debug".to_string(), Value::Bool(true));
    assert_eq!(
        c.convert(Value::Map(entries.clone()), settings).unwrap(),
        Value::Map(entries)
    );
}

#[test]
fn test_generic_records_extract_without_declared_fields() {
    let c = fresh();
    let record = Record::new(types::RECORD).with_field("a", "b");
    let Value::Map(map) = c.convert(Value::Record(record), types::MAP).unwrap() else {
        panic!("expected a map");
    };
    assert_eq!(map.get("a"), Some(&Value::from("b")));
}

// =============================================================================
// Hierarchy resolution
// =============================================================================

fn animals(c: &Converter) -> TypeHash {
    let rt = c.runtime();
    rt.declare_type(TypeDescriptor::interface("Named")).unwrap();
    rt.declare_type(TypeDescriptor::new("Animal", Shape::Scalar)).unwrap();
    rt.declare_type(
        TypeDescriptor::new("Dog", Shape::Scalar)
            .with_base(TypeHash::from_name("Animal"))
            .with_interface(TypeHash::from_name("Named")),
    )
    .unwrap()
}

#[test]
fn test_concrete_ancestor_beats_interface_at_equal_distance() {
    let c = fresh();
    let dog = animals(&c);
    let rt = c.runtime();
    rt.register_shared(TypeHash::from_name("Named"), types::STRING, constant(Value::from("named")))
        .unwrap();
    rt.register_shared(TypeHash::from_name("Animal"), types::STRING, constant(Value::from("animal")))
        .unwrap();

    let dog_value = Value::Record(Record::new(dog));
    for _ in 0..3 {
        assert_eq!(c.convert(dog_value.clone(), types::STRING).unwrap(), Value::from("animal"));
    }
}

#[test]
fn test_requested_target_beats_closer_source() {
    let c = fresh();
    let dog = animals(&c);
    let rt = c.runtime();
    rt.register_shared(TypeHash::from_name("Animal"), types::STRING, constant(Value::from("animal")))
        .unwrap();
    rt.register_shared(dog, TypeHash::from_name("Text"), constant(Value::from("text")))
        .unwrap();

    // Both pairs are one step away; the one ending at the requested target wins.
    assert_eq!(
        c.convert(Value::Record(Record::new(dog)), types::STRING).unwrap(),
        Value::from("animal")
    );
}

#[test]
fn test_subtypes_assign_to_supertypes() {
    let c = fresh();
    let dog = animals(&c);
    let value = Value::Record(Record::new(dog));
    assert_eq!(c.convert(value.clone(), TypeHash::from_name("Animal")).unwrap(), value);
    assert_eq!(c.convert(value.clone(), TypeHash::from_name("Named")).unwrap(), value);
    assert_eq!(c.convert(Value::I32(1), types::NUMBER).unwrap(), Value::I32(1));
}

// =============================================================================
// Registration and overrides
// =============================================================================

#[test]
fn test_override_is_private_to_its_instance() {
    init_tracing();
    let runtime = Runtime::new().unwrap();
    let a = Converter::with_runtime(Arc::clone(&runtime));
    let b = Converter::with_runtime(runtime);

    assert_eq!(a.convert(Value::from("5"), types::INT32).unwrap(), Value::I32(5));
    let previous = a
        .add_conversion(constant(Value::I32(99)), types::STRING, types::INT32)
        .unwrap();
    assert!(previous.is_none());

    assert_eq!(a.convert(Value::from("5"), types::INT32).unwrap(), Value::I32(99));
    assert_eq!(a.convert(Value::from("5"), types::PRIM_I32).unwrap(), Value::I32(99));
    assert_eq!(b.convert(Value::from("5"), types::INT32).unwrap(), Value::I32(5));
}

#[test]
fn test_override_through_hierarchy() {
    let c = fresh();
    c.add_conversion(constant(Value::from("number")), types::NUMBER, types::STRING)
        .unwrap();
    assert_eq!(c.convert(Value::I16(1), types::STRING).unwrap(), Value::from("number"));
    assert_eq!(c.convert(Value::Bool(true), types::STRING).unwrap(), Value::from("true"));
}

#[test]
fn test_add_conversion_returns_previous() {
    let c = fresh();
    let first = constant(Value::I32(1));
    assert!(c.add_conversion(first.clone(), types::STRING, types::INT32).unwrap().is_none());
    let previous = c
        .add_conversion(constant(Value::I32(2)), types::STRING, types::INT32)
        .unwrap()
        .expect("previous function");
    assert!(previous.ptr_eq(&first));
}

#[test]
fn test_add_conversion_invalidates_cached_resolution() {
    let c = fresh();
    assert_eq!(c.convert(Value::I32(3), types::STRING).unwrap(), Value::from("3"));
    assert_eq!(c.convert(Value::I32(3), types::STRING).unwrap(), Value::from("3"));
    c.add_conversion(constant(Value::from("three")), types::INT32, types::STRING)
        .unwrap();
    assert_eq!(c.convert(Value::I32(3), types::STRING).unwrap(), Value::from("three"));
}

#[test]
fn test_shared_registration_reaches_every_instance() {
    init_tracing();
    let runtime = Runtime::new().unwrap();
    let a = Converter::with_runtime(Arc::clone(&runtime));
    let b = Converter::with_runtime(Arc::clone(&runtime));
    b.add_conversion(constant(Value::I8(0)), types::BOOL, types::INT8).unwrap();

    assert_eq!(a.convert(Value::I64(8), types::STRING).unwrap(), Value::from("8"));
    assert_eq!(b.convert(Value::I64(8), types::STRING).unwrap(), Value::from("8"));

    runtime
        .register_shared(types::INT64, types::STRING, constant(Value::from("eight")))
        .unwrap();
    assert_eq!(a.convert(Value::I64(8), types::STRING).unwrap(), Value::from("eight"));
    assert_eq!(b.convert(Value::I64(8), types::STRING).unwrap(), Value::from("eight"));
}

#[test]
fn test_user_types_with_registered_functions() {
    let c = fresh();
    let point = c.runtime().declare_record("Point", ["x", "y"]).unwrap();
    let sum = ConversionFn::new(|value, engine, _| {
        let Value::Record(record) = value else {
            return Err(ConvertError::Unsupported {
                from: "?".into(),
                to: "Int64".into(),
            });
        };
        let mut total = 0;
        for field in ["x", "y"] {
            let v = record.get(field).cloned().unwrap_or_default();
            if let Value::I64(n) = engine.convert(v, types::INT64)? {
                total += n;
            }
        }
        Ok(Value::I64(total))
    });
    c.add_conversion(sum, point, types::INT64).unwrap();

    let record = Record::new(point).with_field("x", "4").with_field("y", 5i32);
    assert_eq!(c.convert(Value::Record(record), types::INT64).unwrap(), Value::I64(9));
}

// =============================================================================
// Options
// =============================================================================

#[test]
fn test_options_reach_atomic_functions() {
    init_tracing();
    let runtime = Runtime::new().unwrap();
    let strict = Converter::with_runtime(Arc::clone(&runtime)).with_options(
        ConvertOptions::default()
            .with_trim_strings(false)
            .with_true_words(["ja"])
            .with_float_precision(Some(2))
            .with_allow_lossy_float(false),
    );
    let lenient = Converter::with_runtime(runtime);

    assert!(strict.convert(Value::from(" 1 "), types::INT32).is_err());
    assert_eq!(lenient.convert(Value::from(" 1 "), types::INT32).unwrap(), Value::I32(1));

    assert_eq!(strict.convert(Value::from("JA"), types::BOOL).unwrap(), Value::Bool(true));
    assert!(lenient.convert(Value::from("ja"), types::BOOL).is_err());

    assert_eq!(strict.convert(Value::F64(3.14159), types::STRING).unwrap(), Value::from("3.14"));
    assert!(strict.convert(Value::F64(1.5), types::INT32).is_err());
    assert_eq!(lenient.convert(Value::F64(1.5), types::INT32).unwrap(), Value::I32(1));
}

// =============================================================================
// Introspection
// =============================================================================

#[test]
fn test_supported_queries() {
    let c = fresh();
    assert!(c.is_conversion_supported(types::STRING, types::INT32));
    assert!(c.is_conversion_supported(types::LIST, types::ARRAY));
    assert!(!c.is_conversion_supported(types::STRING, types::MAP));

    assert!(c.is_simple_type_conversion_supported(types::STRING, types::INT32));
    assert!(!c.is_simple_type_conversion_supported(types::LIST, types::ARRAY));
    assert!(!c.is_simple_type_conversion_supported(types::STRING, types::MAP));
}

#[test]
fn test_simple_support_is_invalidated_by_overrides() {
    let c = fresh();
    let point = c.runtime().declare_record("Point", ["x"]).unwrap();
    assert!(!c.is_simple_type_conversion_supported(point, types::INT32));
    c.add_conversion(constant(Value::I32(0)), point, types::INT32).unwrap();
    assert!(c.is_simple_type_conversion_supported(point, types::INT32));
}

#[test]
fn test_declaring_a_type_forgets_earlier_answers() {
    let c = fresh();
    let shade = TypeHash::from_name("Shade");
    assert!(!c.is_simple_type_conversion_supported(types::STRING, shade));
    c.runtime().declare_enum("Shade", ["Dark", "Light"]).unwrap();
    assert!(c.is_simple_type_conversion_supported(types::STRING, shade));
}

#[test]
fn test_supported_conversion_listing() {
    init_tracing();
    let runtime = Runtime::new().unwrap();
    let a = Converter::with_runtime(Arc::clone(&runtime));
    let b = Converter::with_runtime(runtime);
    let point = a.runtime().declare_record("Point", ["x"]).unwrap();
    let color = a.runtime().declare_enum("Color", ["Red"]).unwrap();
    let headers = a
        .runtime()
        .declare_type(TypeDescriptor::new("Headers", Shape::Map))
        .unwrap();
    a.add_conversion(constant(Value::from("p")), point, types::STRING).unwrap();

    let all = a.all_supported_conversions();
    assert!(all[&types::STRING].contains(&types::INT32));
    assert!(all[&point].contains(&types::STRING));
    assert!(!b.all_supported_conversions()[&point].contains(&types::STRING));

    // Shape-driven conversions are listed for every instance.
    let set_type = types::enum_set_of(color);
    let shared = b.all_supported_conversions();
    assert!(shared[&types::LIST].contains(&types::ARRAY));
    assert!(shared[&types::ARRAY].contains(&types::LIST));
    assert!(shared[&types::LIST].contains(&set_type));
    assert!(shared[&set_type].contains(&types::ARRAY));
    assert!(!shared[&types::LIST].contains(&types::ENUM_SET));
    assert!(shared[&headers].contains(&types::MAP));
    assert!(shared[&types::MAP].contains(&headers));
    assert!(shared[&point].contains(&types::MAP));
    assert!(shared[&types::RECORD].contains(&types::MAP));
    assert!(b.convert(Value::List(vec![]), types::ARRAY).is_ok());

    let names = a.supported_conversion_names();
    assert!(names["String"].contains("Int32"));
    assert!(names["Point"].contains("String"));
    assert!(names["i32"].contains("Int32"));
}
