//! Structural conversions chosen by type shape rather than by registration.
//!
//! - Sequence reshaping between `List`, `Array` and `EnumSet<E>` shapes
//! - Copying between distinct map-shaped types
//! - Extracting the fields of a record into a `Map`
//!
//! Elements are moved as they are, except when building an `EnumSet<E>`: each
//! element is converted to `E` through the engine.

use indexmap::IndexMap;

use morph_core::{ConvertError, EnumSetValue, EnumValue, TypeHash, Value, ValueError};
use morph_registry::{ConversionFn, Convert, Shape, TypeDescriptor};

/// Prebuilt structural functions, shared by every resolution.
pub(crate) struct StructuralFns {
    to_list: ConversionFn,
    to_array: ConversionFn,
    to_enum_set: ConversionFn,
    copy_map: ConversionFn,
    record_to_map: ConversionFn,
}

impl StructuralFns {
    pub(crate) fn new() -> Self {
        Self {
            to_list: ConversionFn::from_value_fn(|value| Ok(Value::List(elements(value)?))),
            to_array: ConversionFn::from_value_fn(|value| Ok(Value::Array(elements(value)?))),
            to_enum_set: ConversionFn::new(to_enum_set),
            copy_map: ConversionFn::from_value_fn(|value| match value {
                Value::Map(entries) => Ok(Value::Map(entries)),
                other => Err(mismatch("map", &other)),
            }),
            record_to_map: ConversionFn::new(record_to_map),
        }
    }

    /// Container reshaping and map copying for `source → target`.
    pub(crate) fn special_case(&self, source: &TypeDescriptor, target: &TypeDescriptor) -> Option<ConversionFn> {
        if source.hash == target.hash {
            return None;
        }
        if source.shape.is_collection_like() && target.shape.is_collection_like() {
            return match target.shape {
                Shape::Collection => Some(self.to_list.clone()),
                Shape::Array => Some(self.to_array.clone()),
                Shape::EnumSet => Some(self.to_enum_set.clone()),
                _ => None,
            };
        }
        if source.shape == Shape::Map && target.shape == Shape::Map {
            return Some(self.copy_map.clone());
        }
        None
    }

    /// Record field extraction, the last resort before failing.
    pub(crate) fn record_extraction(&self, source: &TypeDescriptor, target: &TypeDescriptor) -> Option<ConversionFn> {
        let applies = source.shape == Shape::Record && target.shape == Shape::Map;
        applies.then(|| self.record_to_map.clone())
    }
}

fn mismatch(expected: &'static str, actual: &Value) -> ConvertError {
    ValueError::TypeMismatch {
        expected,
        actual: actual.type_name(),
    }
    .into()
}

/// Elements of any sequence-shaped value; enum sets yield enum values.
fn elements(value: Value) -> Result<Vec<Value>, ConvertError> {
    match value {
        Value::List(items) | Value::Array(items) => Ok(items),
        Value::EnumSet(set) => Ok(set
            .variants
            .into_iter()
            .map(|variant| Value::Enum(EnumValue::new(set.element, variant)))
            .collect()),
        other => Err(mismatch("sequence", &other)),
    }
}

fn to_enum_set(value: Value, engine: &dyn Convert, target: TypeHash) -> Result<Value, ConvertError> {
    let element = engine
        .types()
        .get(target)
        .and_then(|desc| desc.type_args.first().copied())
        .ok_or_else(|| ConvertError::AmbiguousTarget {
            family: engine.type_name(target),
        })?;

    let mut set = EnumSetValue::new(element);
    for item in elements(value)? {
        match engine.convert(item, element)? {
            Value::Enum(e) => {
                set.insert(e.variant);
            }
            other => return Err(mismatch("enum", &other)),
        }
    }
    Ok(Value::EnumSet(set))
}

fn record_to_map(value: Value, engine: &dyn Convert, _: TypeHash) -> Result<Value, ConvertError> {
    let record = match value {
        Value::Record(record) => record,
        other => return Err(mismatch("record", &other)),
    };

    if let Some(desc) = engine.types().get(record.type_hash) {
        if let Some(missing) = desc.fields.iter().find(|f| !record.fields.contains_key(f.as_str())) {
            return Err(ValueError::MissingField {
                field: missing.clone(),
                record: desc.name.clone(),
            }
            .into());
        }
    }

    let map: IndexMap<String, Value> = record.fields.into_iter().collect();
    Ok(Value::Map(map))
}
