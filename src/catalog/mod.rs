//! Built-in types and conversion functions.
//!
//! Everything here is installed once by `Runtime::new`, before bridge
//! expansion derives the primitive and `TextBuf` composites.

mod enums;
mod nulls;
mod numeric;
mod text;

use morph_core::{ContextId, RegistrationError, TypeHash, types};
use morph_registry::{ConversionFn, DispatchTable, Shape, TypeDescriptor, TypeFlags, TypeUniverse};

/// Declare the well-known types in dependency order.
pub(crate) fn declare_builtin_types(universe: &TypeUniverse) -> Result<(), RegistrationError> {
    universe.declare(TypeDescriptor::new("Any", Shape::Abstract))?;
    universe.declare(TypeDescriptor::new("null", Shape::Scalar))?;

    universe.declare(TypeDescriptor::marker("Copy"))?;
    universe.declare(TypeDescriptor::marker("Send"))?;
    universe.declare(TypeDescriptor::interface("Display"))?;
    universe.declare(TypeDescriptor::interface("Text"))?;
    universe.declare(TypeDescriptor::interface("Collection"))?;

    universe.declare(TypeDescriptor::new("Number", Shape::Abstract).with_interface(types::DISPLAY))?;

    let scalars: [(&str, &str, bool); 8] = [
        ("Bool", "bool", false),
        ("Char", "char", false),
        ("Int8", "i8", true),
        ("Int16", "i16", true),
        ("Int32", "i32", true),
        ("Int64", "i64", true),
        ("Float32", "f32", true),
        ("Float64", "f64", true),
    ];
    for (boxed, prim, numeric) in scalars {
        let boxed_hash = TypeHash::from_name(boxed);
        let mut desc = TypeDescriptor::new(boxed, Shape::Scalar).with_partner(TypeHash::from_name(prim));
        desc = if numeric {
            desc.with_base(types::NUMBER)
        } else {
            desc.with_interface(types::DISPLAY)
        };
        universe.declare(desc.with_interface(types::COPY).with_interface(types::SEND))?;
        universe.declare(TypeDescriptor::primitive(prim, boxed_hash))?;
    }

    universe.declare(
        TypeDescriptor::new("String", Shape::Scalar)
            .with_interface(types::TEXT)
            .with_interface(types::DISPLAY),
    )?;
    universe.declare(TypeDescriptor::new("TextBuf", Shape::Scalar).with_interface(types::TEXT))?;

    universe.declare(TypeDescriptor::new("List", Shape::Collection).with_interface(types::COLLECTION))?;
    universe.declare(TypeDescriptor::new("Array", Shape::Array).with_interface(types::COLLECTION))?;
    universe.declare(TypeDescriptor::new("Map", Shape::Map))?;
    universe.declare(TypeDescriptor::new("Record", Shape::Record))?;
    universe.declare(TypeDescriptor::new("Enum", Shape::Enum).with_flags(TypeFlags::OPEN_FAMILY))?;
    universe.declare(
        TypeDescriptor::new("EnumSet", Shape::EnumSet)
            .with_flags(TypeFlags::OPEN_FAMILY)
            .with_interface(types::COLLECTION),
    )?;
    Ok(())
}

/// Register every built-in function into the shared table.
pub(crate) fn register_builtin_conversions(table: &DispatchTable) -> Result<(), RegistrationError> {
    register_bridge_steps(table)?;
    numeric::register(table)?;
    text::register(table)?;
    enums::register(table)?;
    nulls::register(table)?;
    Ok(())
}

/// Primitive ↔ boxed identities; these define the primitive bridge pairs.
fn register_bridge_steps(table: &DispatchTable) -> Result<(), RegistrationError> {
    for (prim, boxed) in types::PRIMITIVE_PAIRS {
        shared(table, prim, boxed, ConversionFn::identity())?;
        shared(table, boxed, prim, ConversionFn::identity())?;
    }
    Ok(())
}

fn shared(
    table: &DispatchTable,
    from: TypeHash,
    to: TypeHash,
    function: ConversionFn,
) -> Result<(), RegistrationError> {
    table.register(from, to, function, ContextId::SHARED)?;
    Ok(())
}
