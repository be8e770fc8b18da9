//! Type registry and conversion dispatch for morph.
//!
//! This crate provides:
//! - [`TypeUniverse`]: declared types and their supertype graph
//! - [`HierarchyIndex`]: cached ancestor views with shortest distances
//! - [`ConversionFn`] and the [`Convert`] engine interface
//! - [`DispatchTable`]: registered functions per (source, target, context)
//! - [`BridgeExpander`]: composite functions for narrow/canonical pairs
//! - [`HierarchyResolver`]: ancestor-pair fallback search

mod bridge;
mod dispatch;
mod function;
mod hierarchy;
mod resolver;
mod universe;

pub use bridge::BridgeExpander;
pub use dispatch::{DispatchEntry, DispatchTable};
pub use function::{ConversionFn, Convert, ConvertFnBody, FnKind};
pub use hierarchy::{AncestorEntry, AncestorKind, HierarchyIndex};
pub use resolver::{HierarchyResolver, InheritancePair, Resolution};
pub use universe::{EdgeKind, Shape, TypeDescriptor, TypeFlags, TypeUniverse};
