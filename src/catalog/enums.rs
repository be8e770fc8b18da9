//! Enumeration ↔ text.
//!
//! `String → Enum` is registered once against the family and reads the variant
//! list of whichever concrete enumeration was requested.

use morph_core::{ConvertError, EnumValue, RegistrationError, TypeHash, Value, ValueError, types};
use morph_registry::{ConversionFn, Convert, DispatchTable, Shape};

use super::{shared, text::text_of};

pub(super) fn register(table: &DispatchTable) -> Result<(), RegistrationError> {
    shared(table, types::STRING, types::ENUM, ConversionFn::new(string_to_enum))?;
    shared(
        table,
        types::ENUM,
        types::STRING,
        ConversionFn::from_value_fn(|value| match value {
            Value::Enum(e) => Ok(Value::String(e.variant)),
            other => Err(ValueError::TypeMismatch {
                expected: "enum",
                actual: other.type_name(),
            }
            .into()),
        }),
    )?;
    Ok(())
}

fn string_to_enum(value: Value, engine: &dyn Convert, target: TypeHash) -> Result<Value, ConvertError> {
    let desc = engine
        .types()
        .get(target)
        .filter(|d| d.shape == Shape::Enum)
        .ok_or_else(|| ConvertError::Unsupported {
            from: engine.type_name(types::STRING),
            to: engine.type_name(target),
        })?;
    if desc.is_open_family() {
        return Err(ConvertError::AmbiguousTarget {
            family: desc.name.clone(),
        });
    }

    let text = engine.options().prepare(text_of(&value)?);
    let variant = desc
        .variants
        .iter()
        .find(|v| v.as_str() == text)
        .or_else(|| desc.variants.iter().find(|v| v.eq_ignore_ascii_case(text)))
        .ok_or_else(|| ValueError::UnknownVariant {
            variant: text.to_string(),
            enum_name: desc.name.clone(),
        })?;

    Ok(Value::Enum(EnumValue::new(target, variant.clone())))
}
