//! Null → primitive zero values.
//!
//! Every other target receives `Value::Null` through assignability, so only the
//! primitive forms need functions.

use morph_core::{RegistrationError, TypeHash, Value, types};
use morph_registry::{ConversionFn, DispatchTable};

use super::shared;

pub(super) fn register(table: &DispatchTable) -> Result<(), RegistrationError> {
    for (target, zero) in zero_values() {
        shared(
            table,
            types::NULL,
            target,
            ConversionFn::from_value_fn(move |_| Ok(zero.clone())),
        )?;
    }
    Ok(())
}

fn zero_values() -> [(TypeHash, Value); 8] {
    [
        (types::PRIM_BOOL, Value::Bool(false)),
        (types::PRIM_CHAR, Value::Char('\0')),
        (types::PRIM_I8, Value::I8(0)),
        (types::PRIM_I16, Value::I16(0)),
        (types::PRIM_I32, Value::I32(0)),
        (types::PRIM_I64, Value::I64(0)),
        (types::PRIM_F32, Value::F32(0.0)),
        (types::PRIM_F64, Value::F64(0.0)),
    ]
}
