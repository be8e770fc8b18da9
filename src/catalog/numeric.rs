//! Numeric conversions between the boxed numeric types, `Bool` and `Char`.
//!
//! Integer narrowing is checked. Float → integer truncates toward zero and is
//! range checked; with `allow_lossy_float` off a fractional part is an error.

use morph_core::{ConvertOptions, RegistrationError, TypeHash, Value, ValueError, types};
use morph_registry::{ConversionFn, DispatchTable};

use super::shared;

/// Boxed numeric types, narrowest integer first.
const NUMERIC: [TypeHash; 6] = [
    types::INT8,
    types::INT16,
    types::INT32,
    types::INT64,
    types::FLOAT32,
    types::FLOAT64,
];

pub(super) fn register(table: &DispatchTable) -> Result<(), RegistrationError> {
    for &from in &NUMERIC {
        for &to in &NUMERIC {
            if from != to {
                shared(table, from, to, number_fn(to))?;
            }
        }
        shared(table, types::BOOL, from, number_fn(from))?;
        shared(table, from, types::BOOL, ConversionFn::from_value_fn(to_bool))?;
    }
    shared(table, types::CHAR, types::INT32, ConversionFn::from_value_fn(char_to_int))?;
    Ok(())
}

fn number_fn(target: TypeHash) -> ConversionFn {
    ConversionFn::new(move |value, engine, _| Ok(cast(&value, target, engine.options())?))
}

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::F32(v) => Some(Num::Float(*v as f64)),
            Value::F64(v) => Some(Num::Float(*v)),
            other => other.as_i64().map(Num::Int),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(v) => v as f64,
            Num::Float(v) => v,
        }
    }
}

/// Convert a numeric (or boolean) value to the boxed numeric type `target`.
pub(crate) fn cast(value: &Value, target: TypeHash, options: &ConvertOptions) -> Result<Value, ValueError> {
    let num = Num::of(value).ok_or(ValueError::TypeMismatch {
        expected: "number",
        actual: value.type_name(),
    })?;

    let out = match target {
        types::INT8 => Value::I8(narrow(num, "Int8", options)?),
        types::INT16 => Value::I16(narrow(num, "Int16", options)?),
        types::INT32 => Value::I32(narrow(num, "Int32", options)?),
        types::INT64 => Value::I64(narrow(num, "Int64", options)?),
        types::FLOAT32 => Value::F32(num.as_f64() as f32),
        types::FLOAT64 => match num {
            Num::Float(v) => Value::F64(v),
            Num::Int(v) => Value::F64(v as f64),
        },
        _ => {
            return Err(ValueError::TypeMismatch {
                expected: "numeric target",
                actual: value.type_name(),
            });
        }
    };
    Ok(out)
}

fn narrow<T: TryFrom<i64>>(num: Num, target: &str, options: &ConvertOptions) -> Result<T, ValueError> {
    let wide = match num {
        Num::Int(v) => v,
        Num::Float(v) => truncate(v, target, options)?,
    };
    T::try_from(wide).map_err(|_| ValueError::IntegerOverflow {
        value: wide.to_string(),
        target: target.to_string(),
    })
}

fn truncate(v: f64, target: &str, options: &ConvertOptions) -> Result<i64, ValueError> {
    if !v.is_finite() {
        return Err(ValueError::NotFinite {
            value: v,
            target: target.to_string(),
        });
    }
    if v.fract() != 0.0 && !options.allow_lossy_float {
        return Err(ValueError::InvalidFormat {
            input: v.to_string(),
            target: target.to_string(),
        });
    }
    let t = v.trunc();
    // i64::MAX as f64 rounds up to 2^63
    if t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return Err(ValueError::IntegerOverflow {
            value: v.to_string(),
            target: target.to_string(),
        });
    }
    Ok(t as i64)
}

fn to_bool(value: Value) -> Result<Value, morph_core::ConvertError> {
    let num = Num::of(&value).ok_or(ValueError::TypeMismatch {
        expected: "number",
        actual: value.type_name(),
    })?;
    Ok(Value::Bool(num.as_f64() != 0.0))
}

fn char_to_int(value: Value) -> Result<Value, morph_core::ConvertError> {
    match value {
        Value::Char(c) => Ok(Value::I32(c as u32 as i32)),
        other => Err(ValueError::TypeMismatch {
            expected: "char",
            actual: other.type_name(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ConvertOptions {
        ConvertOptions::default()
    }

    #[test]
    fn widening() {
        assert_eq!(cast(&Value::I8(-5), types::INT64, &opts()), Ok(Value::I64(-5)));
        assert_eq!(cast(&Value::I32(7), types::FLOAT64, &opts()), Ok(Value::F64(7.0)));
        assert_eq!(cast(&Value::F32(1.5), types::FLOAT64, &opts()), Ok(Value::F64(1.5)));
    }

    #[test]
    fn checked_narrowing() {
        assert_eq!(cast(&Value::I32(127), types::INT8, &opts()), Ok(Value::I8(127)));
        assert_eq!(
            cast(&Value::I32(300), types::INT8, &opts()),
            Err(ValueError::IntegerOverflow {
                value: "300".into(),
                target: "Int8".into()
            })
        );
    }

    #[test]
    fn float_truncation() {
        assert_eq!(cast(&Value::F64(-2.9), types::INT32, &opts()), Ok(Value::I32(-2)));
        assert!(matches!(
            cast(&Value::F64(1e20), types::INT64, &opts()),
            Err(ValueError::IntegerOverflow { .. })
        ));
        assert!(matches!(
            cast(&Value::F64(f64::NAN), types::INT32, &opts()),
            Err(ValueError::NotFinite { .. })
        ));
    }

    #[test]
    fn lossless_float_mode() {
        let strict = opts().with_allow_lossy_float(false);
        assert_eq!(cast(&Value::F64(4.0), types::INT16, &strict), Ok(Value::I16(4)));
        assert!(matches!(
            cast(&Value::F64(4.5), types::INT16, &strict),
            Err(ValueError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn booleans_count_as_numbers() {
        assert_eq!(cast(&Value::Bool(true), types::INT32, &opts()), Ok(Value::I32(1)));
        assert_eq!(to_bool(Value::I64(0)), Ok(Value::Bool(false)));
        assert_eq!(to_bool(Value::F32(0.25)), Ok(Value::Bool(true)));
    }

    #[test]
    fn chars_to_code_points() {
        assert_eq!(char_to_int(Value::Char('A')), Ok(Value::I32(65)));
    }

    #[test]
    fn non_numbers_rejected() {
        assert!(matches!(
            cast(&Value::from("1"), types::INT32, &opts()),
            Err(ValueError::TypeMismatch { .. })
        ));
    }
}
