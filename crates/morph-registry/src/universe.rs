//! TypeUniverse - declared types and their supertype graph.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: one `TypeHash` per declared type
//! - Edges: child → parent, `Extends` for the base class, `Implements` for interfaces
//!
//! Descriptors are immutable once declared. Redeclaring a type with an identical
//! descriptor is a no-op; anything else under the same token is rejected, so a
//! type's ancestors never change after it is declared.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::RwLock;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use morph_core::{RegistrationError, TypeHash, types};

bitflags! {
    /// Classification flags of a declared type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        /// Unboxed form of a scalar; only ever a conversion target.
        const PRIMITIVE = 1 << 0;
        /// Interface-like; never the runtime type of a value.
        const INTERFACE = 1 << 1;
        /// Pure tagging interface with no conversion semantics.
        const MARKER = 1 << 2;
        /// Family that needs a concrete member to be a conversion target.
        const OPEN_FAMILY = 1 << 3;
    }
}

/// Structural shape of a type's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Single scalar value.
    Scalar,
    /// Growable sequence.
    Collection,
    /// Fixed-size sequence.
    Array,
    /// Ordered string-keyed record.
    Map,
    /// User-declared structured type.
    Record,
    Enum,
    EnumSet,
    /// No values of its own (roots, interfaces).
    Abstract,
}

impl Shape {
    /// Sequence-like shapes whose values can be reshaped into each other.
    pub fn is_collection_like(self) -> bool {
        matches!(self, Shape::Collection | Shape::Array | Shape::EnumSet)
    }
}

/// Supertype edge kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Extends,
    Implements,
}

/// Declaration of one runtime type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub hash: TypeHash,
    pub flags: TypeFlags,
    pub shape: Shape,
    /// Base class. Concrete types without one extend `Any`.
    pub base: Option<TypeHash>,
    /// Implemented interfaces, in declaration order.
    pub interfaces: Vec<TypeHash>,
    /// Boxed form of a primitive, or primitive form of a boxed scalar.
    pub partner: Option<TypeHash>,
    /// Family of a parameterised instance (`EnumSet` for `EnumSet<Color>`).
    pub template: Option<TypeHash>,
    pub type_args: Vec<TypeHash>,
    /// Declared variants of an enumeration.
    pub variants: Vec<String>,
    /// Declared fields of a record.
    pub fields: Vec<String>,
}

impl TypeDescriptor {
    /// Create a concrete type; the token is computed from the name.
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_name(&name),
            name,
            flags: TypeFlags::empty(),
            shape,
            base: None,
            interfaces: Vec::new(),
            partner: None,
            template: None,
            type_args: Vec::new(),
            variants: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Create an interface type.
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Abstract).with_flags(TypeFlags::INTERFACE)
    }

    /// Create a marker interface.
    pub fn marker(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Abstract).with_flags(TypeFlags::INTERFACE | TypeFlags::MARKER)
    }

    /// Create the primitive form of `boxed`.
    pub fn primitive(name: impl Into<String>, boxed: TypeHash) -> Self {
        Self::new(name, Shape::Scalar)
            .with_flags(TypeFlags::PRIMITIVE)
            .with_partner(boxed)
    }

    /// Create an enumeration with the given variants.
    pub fn enumeration<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut desc = Self::new(name, Shape::Enum).with_base(types::ENUM);
        desc.variants = variants.into_iter().map(Into::into).collect();
        desc
    }

    /// Create a record type with the given fields.
    pub fn record<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut desc = Self::new(name, Shape::Record).with_base(types::RECORD);
        desc.fields = fields.into_iter().map(Into::into).collect();
        desc
    }

    /// Turn this descriptor into the instance `template<args>`; the token and
    /// the name are recomputed.
    pub fn instance_of(mut self, template: TypeHash, template_name: &str, args: &[(TypeHash, &str)]) -> Self {
        let hashes: Vec<TypeHash> = args.iter().map(|(h, _)| *h).collect();
        let names: Vec<&str> = args.iter().map(|(_, n)| *n).collect();
        self.hash = TypeHash::from_template_instance(template, &hashes);
        self.name = format!("{}<{}>", template_name, names.join(", "));
        self.template = Some(template);
        self.type_args = hashes;
        self
    }

    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_base(mut self, base: TypeHash) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_interface(mut self, interface: TypeHash) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_partner(mut self, partner: TypeHash) -> Self {
        self.partner = Some(partner);
        self
    }

    pub fn is_primitive(&self) -> bool {
        self.flags.contains(TypeFlags::PRIMITIVE)
    }

    pub fn is_marker(&self) -> bool {
        self.flags.contains(TypeFlags::MARKER)
    }

    pub fn is_open_family(&self) -> bool {
        self.flags.contains(TypeFlags::OPEN_FAMILY)
    }

    /// Interfaces and markers.
    pub fn is_interface_like(&self) -> bool {
        self.flags.intersects(TypeFlags::INTERFACE | TypeFlags::MARKER)
    }

    /// Direct supertypes with their edge kinds, base first.
    fn parent_edges(&self) -> SmallVec<[(TypeHash, EdgeKind); 4]> {
        let mut out = SmallVec::new();
        match self.base {
            Some(base) => out.push((base, EdgeKind::Extends)),
            None if self.implicitly_extends_any() => out.push((types::ANY, EdgeKind::Extends)),
            None => {}
        }
        out.extend(self.interfaces.iter().map(|&i| (i, EdgeKind::Implements)));
        out
    }

    fn implicitly_extends_any(&self) -> bool {
        self.hash != types::ANY
            && self.hash != types::NULL
            && !self.is_primitive()
            && !self.is_interface_like()
    }
}

#[derive(Default)]
struct UniverseInner {
    graph: DiGraph<TypeHash, EdgeKind>,
    nodes: FxHashMap<TypeHash, NodeIndex>,
    types: FxHashMap<TypeHash, Arc<TypeDescriptor>>,
}

/// Store of every declared type.
///
/// Reads take a shared lock; declarations take the exclusive lock.
#[derive(Default)]
pub struct TypeUniverse {
    inner: RwLock<UniverseInner>,
}

impl TypeUniverse {
    /// Create an empty universe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a type.
    ///
    /// Parents must already be declared. Declaring a concrete enumeration also
    /// declares its `EnumSet<E>` instance.
    pub fn declare(&self, desc: TypeDescriptor) -> Result<Arc<TypeDescriptor>, RegistrationError> {
        let enum_set = (desc.shape == Shape::Enum && !desc.is_open_family())
            .then(|| enum_set_descriptor(&desc));

        let mut inner = self.inner.write();
        let declared = Self::declare_locked(&mut inner, desc)?;
        if let Some(set) = enum_set {
            Self::declare_locked(&mut inner, set)?;
        }
        Ok(declared)
    }

    fn declare_locked(
        inner: &mut UniverseInner,
        desc: TypeDescriptor,
    ) -> Result<Arc<TypeDescriptor>, RegistrationError> {
        if desc.hash.is_empty() {
            return Err(RegistrationError::InvalidRegistration(format!(
                "type '{}' has an empty token",
                desc.name
            )));
        }
        if let Some(existing) = inner.types.get(&desc.hash) {
            if **existing == desc {
                return Ok(Arc::clone(existing));
            }
            return Err(RegistrationError::DuplicateType(desc.name));
        }

        let parents = desc.parent_edges();
        for (parent, _) in &parents {
            if !inner.types.contains_key(parent) {
                let name = if *parent == types::ANY {
                    "Any".to_string()
                } else {
                    parent.to_string()
                };
                return Err(RegistrationError::UnknownType(name));
            }
        }

        let node = inner.graph.add_node(desc.hash);
        inner.nodes.insert(desc.hash, node);
        for (parent, kind) in parents {
            let parent_node = inner.nodes[&parent];
            inner.graph.add_edge(node, parent_node, kind);
        }

        debug!(name = %desc.name, hash = %desc.hash, shape = ?desc.shape, "declared type");
        let desc = Arc::new(desc);
        inner.types.insert(desc.hash, Arc::clone(&desc));
        Ok(desc)
    }

    /// Get a declared type.
    pub fn get(&self, hash: TypeHash) -> Option<Arc<TypeDescriptor>> {
        self.inner.read().types.get(&hash).cloned()
    }

    pub fn contains(&self, hash: TypeHash) -> bool {
        self.inner.read().types.contains_key(&hash)
    }

    /// Display name of a type; undeclared tokens render as hex.
    pub fn name_of(&self, hash: TypeHash) -> String {
        match self.inner.read().types.get(&hash) {
            Some(desc) => desc.name.clone(),
            None => hash.to_string(),
        }
    }

    /// Direct supertypes of a type, in edge insertion order.
    pub fn parents(&self, hash: TypeHash) -> SmallVec<[(TypeHash, EdgeKind); 4]> {
        let inner = self.inner.read();
        let Some(&node) = inner.nodes.get(&hash) else {
            return SmallVec::new();
        };
        let mut out: SmallVec<[(TypeHash, EdgeKind); 4]> = inner
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| (inner.graph[edge.target()], *edge.weight()))
            .collect();
        // petgraph yields the most recently added edge first
        out.reverse();
        out
    }

    /// The other half of a primitive/boxed pair.
    pub fn partner(&self, hash: TypeHash) -> Option<TypeHash> {
        self.inner.read().types.get(&hash).and_then(|d| d.partner)
    }

    /// Number of declared types.
    pub fn len(&self) -> usize {
        self.inner.read().types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().types.is_empty()
    }

    /// Tokens of all declared types, sorted.
    pub fn all_types(&self) -> Vec<TypeHash> {
        let mut all: Vec<TypeHash> = self.inner.read().types.keys().copied().collect();
        all.sort_unstable();
        all
    }
}

impl fmt::Debug for TypeUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("TypeUniverse")
            .field("types", &inner.types.len())
            .field("edges", &inner.graph.edge_count())
            .finish()
    }
}

fn enum_set_descriptor(element: &TypeDescriptor) -> TypeDescriptor {
    TypeDescriptor::new("", Shape::EnumSet)
        .with_base(types::ENUM_SET)
        .instance_of(types::ENUM_SET, "EnumSet", &[(element.hash, &element.name)])
}
