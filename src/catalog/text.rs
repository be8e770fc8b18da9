//! Text conversions: formatting, parsing and the `TextBuf` bridge steps.

use std::fmt::Display;
use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

use morph_core::{ConvertError, ConvertOptions, RegistrationError, TypeHash, Value, ValueError, types};
use morph_registry::{ConversionFn, DispatchTable};

use super::shared;

/// Boxed scalar types parseable from text.
const PARSE_TARGETS: [TypeHash; 8] = [
    types::BOOL,
    types::CHAR,
    types::INT8,
    types::INT16,
    types::INT32,
    types::INT64,
    types::FLOAT32,
    types::FLOAT64,
];

pub(super) fn register(table: &DispatchTable) -> Result<(), RegistrationError> {
    shared(
        table,
        types::DISPLAY,
        types::STRING,
        ConversionFn::new(|value, engine, _| Ok(Value::String(format_value(&value, engine.options())?))),
    )?;

    for &target in &PARSE_TARGETS {
        shared(
            table,
            types::STRING,
            target,
            ConversionFn::new(move |value, engine, _| {
                let text = text_of(&value)?;
                Ok(parse(text, target, engine.options())?)
            }),
        )?;
    }

    shared(
        table,
        types::STRING,
        types::TEXT_BUF,
        ConversionFn::from_value_fn(|value| match value {
            Value::String(s) => Ok(Value::TextBuf(s)),
            other => Err(mismatch("string", &other)),
        }),
    )?;
    shared(
        table,
        types::TEXT_BUF,
        types::STRING,
        ConversionFn::from_value_fn(|value| match value {
            Value::TextBuf(s) => Ok(Value::String(s)),
            other => Err(mismatch("text buffer", &other)),
        }),
    )?;
    Ok(())
}

pub(super) fn text_of(value: &Value) -> Result<&str, ValueError> {
    value.as_str().ok_or(ValueError::TypeMismatch {
        expected: "string",
        actual: value.type_name(),
    })
}

fn mismatch(expected: &'static str, actual: &Value) -> ConvertError {
    ValueError::TypeMismatch {
        expected,
        actual: actual.type_name(),
    }
    .into()
}

/// Render a displayable value as text.
pub(crate) fn format_value(value: &Value, options: &ConvertOptions) -> Result<String, ValueError> {
    let text = match value {
        Value::Bool(v) => v.to_string(),
        Value::Char(v) => v.to_string(),
        Value::I8(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::F32(v) => format_float(v, options.float_precision),
        Value::F64(v) => format_float(v, options.float_precision),
        Value::String(s) | Value::TextBuf(s) => s.clone(),
        Value::Enum(e) => e.variant.clone(),
        other => {
            return Err(ValueError::TypeMismatch {
                expected: "displayable value",
                actual: other.type_name(),
            });
        }
    };
    Ok(text)
}

fn format_float<T: Display>(v: &T, precision: Option<usize>) -> String {
    match precision {
        Some(p) => format!("{:.*}", p, v),
        None => v.to_string(),
    }
}

/// Parse text as the boxed scalar `target`.
pub(crate) fn parse(raw: &str, target: TypeHash, options: &ConvertOptions) -> Result<Value, ValueError> {
    let text = options.prepare(raw);
    let invalid = |name: &str| ValueError::InvalidFormat {
        input: raw.to_string(),
        target: name.to_string(),
    };

    match target {
        types::BOOL => options
            .parse_bool_word(text)
            .map(Value::Bool)
            .ok_or_else(|| invalid("Bool")),
        types::CHAR => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(invalid("Char")),
            }
        }
        types::INT8 => parse_int(text, "Int8").map(Value::I8),
        types::INT16 => parse_int(text, "Int16").map(Value::I16),
        types::INT32 => parse_int(text, "Int32").map(Value::I32),
        types::INT64 => parse_int(text, "Int64").map(Value::I64),
        types::FLOAT32 => text.parse::<f32>().map(Value::F32).map_err(|_| invalid("Float32")),
        types::FLOAT64 => text.parse::<f64>().map(Value::F64).map_err(|_| invalid("Float64")),
        _ => Err(invalid(&target.to_string())),
    }
}

fn parse_int<T>(text: &str, target: &str) -> Result<T, ValueError>
where
    T: FromStr<Err = ParseIntError>,
{
    text.parse::<T>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ValueError::IntegerOverflow {
            value: text.to_string(),
            target: target.to_string(),
        },
        _ => ValueError::InvalidFormat {
            input: text.to_string(),
            target: target.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use morph_core::{EnumValue, TypeHash};

    fn opts() -> ConvertOptions {
        ConvertOptions::default()
    }

    #[test]
    fn formats_scalars() {
        assert_eq!(format_value(&Value::I32(-4), &opts()).unwrap(), "-4");
        assert_eq!(format_value(&Value::Bool(true), &opts()).unwrap(), "true");
        assert_eq!(format_value(&Value::F64(2.5), &opts()).unwrap(), "2.5");
        assert_eq!(format_value(&Value::F32(0.1), &opts()).unwrap(), "0.1");
    }

    #[test]
    fn float_precision_option() {
        let fixed = opts().with_float_precision(Some(2));
        assert_eq!(format_value(&Value::F64(1.0), &fixed).unwrap(), "1.00");
        assert_eq!(format_value(&Value::F32(3.14159), &fixed).unwrap(), "3.14");
    }

    #[test]
    fn formats_enum_variant() {
        let v = Value::Enum(EnumValue::new(TypeHash::from_name("Color"), "Red"));
        assert_eq!(format_value(&v, &opts()).unwrap(), "Red");
    }

    #[test]
    fn parses_numbers_with_trim() {
        assert_eq!(parse(" 42 ", types::INT32, &opts()), Ok(Value::I32(42)));
        assert_eq!(parse("-1.25", types::FLOAT64, &opts()), Ok(Value::F64(-1.25)));
        assert!(matches!(
            parse(" 42", types::INT32, &opts().with_trim_strings(false)),
            Err(ValueError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn integer_overflow_is_distinct_from_bad_format() {
        assert!(matches!(
            parse("128", types::INT8, &opts()),
            Err(ValueError::IntegerOverflow { .. })
        ));
        assert_eq!(
            parse("12a", types::INT8, &opts()),
            Err(ValueError::InvalidFormat {
                input: "12a".into(),
                target: "Int8".into()
            })
        );
    }

    #[test]
    fn parses_bool_words_and_chars() {
        assert_eq!(parse("Yes", types::BOOL, &opts()), Ok(Value::Bool(true)));
        assert_eq!(parse("x", types::CHAR, &opts()), Ok(Value::Char('x')));
        assert!(parse("xy", types::CHAR, &opts()).is_err());
        assert!(parse("perhaps", types::BOOL, &opts()).is_err());
    }
}
