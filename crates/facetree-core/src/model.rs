//! The assembly graph: products, shape representations and the linkages between them.
//!
//! The model is an arena. Entities refer to each other through `Copy` ids, and a
//! reference that does not resolve is treated as absent rather than as an error.

use std::fmt;

use crate::placement::Placement;
use smallvec::SmallVec;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Identifies a product (part or assembly node).
    ProductId,
    "product"
);
arena_id!(
    /// Identifies a shape representation.
    RepId,
    "rep"
);
arena_id!(
    /// Identifies a representation item. Meshes are cached by this id.
    ItemId,
    "item"
);

/// A logical part or assembly node.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Product {
    pub name: String,
    /// Associated shape representations, in registration order.
    pub shapes: SmallVec<[RepId; 2]>,
}

/// An individual shape element. It may or may not end up with a cached mesh.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RepresentationItem {
    pub name: String,
}

/// How a child representation is attached to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkageKind {
    /// Direct sub-assembly nesting through a shape representation relationship.
    Relationship,
    /// Instanced geometry placed through a mapped item.
    MappedItem,
}

/// A child representation together with its local placement.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChildLinkage {
    pub kind: LinkageKind,
    /// Target representation; `None` when the source link did not resolve.
    pub child: Option<RepId>,
    /// Placement of the child in the parent's coordinate system.
    pub placement: Placement,
}

impl ChildLinkage {
    pub fn relationship(child: RepId, placement: Placement) -> Self {
        Self {
            kind: LinkageKind::Relationship,
            child: Some(child),
            placement,
        }
    }

    pub fn mapped_item(child: RepId, placement: Placement) -> Self {
        Self {
            kind: LinkageKind::MappedItem,
            child: Some(child),
            placement,
        }
    }

    /// A linkage whose target could not be resolved.
    pub fn unresolved(kind: LinkageKind) -> Self {
        Self {
            kind,
            child: None,
            placement: Placement::IDENTITY,
        }
    }
}

/// Child linkages recorded for one shape representation.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeLinkages {
    pub relationships: Vec<ChildLinkage>,
    pub mapped_items: Vec<ChildLinkage>,
}

impl ShapeLinkages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a linkage in the collection matching its kind.
    pub fn push(&mut self, linkage: ChildLinkage) {
        match linkage.kind {
            LinkageKind::Relationship => self.relationships.push(linkage),
            LinkageKind::MappedItem => self.mapped_items.push(linkage),
        }
    }

    /// All linkages: relationships first, then mapped items.
    pub fn iter(&self) -> impl Iterator<Item = &ChildLinkage> {
        self.relationships.iter().chain(self.mapped_items.iter())
    }

    pub fn len(&self) -> usize {
        self.relationships.len() + self.mapped_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty() && self.mapped_items.is_empty()
    }
}

/// A geometry container for one product or sub-assembly level.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapeRepresentation {
    pub name: String,
    pub items: Vec<ItemId>,
    /// `None` when no child linkage of either kind was ever recorded.
    pub linkages: Option<ShapeLinkages>,
}

/// The assembly graph owned by the loaded model.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssemblyModel {
    pub products: Vec<Product>,
    pub representations: Vec<ShapeRepresentation>,
    pub items: Vec<RepresentationItem>,
    /// Top-level assemblies, used when an export does not name its own roots.
    pub roots: Vec<ProductId>,
}

impl AssemblyModel {
    /// Create a new empty model.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(id.0)
    }

    pub fn representation(&self, id: RepId) -> Option<&ShapeRepresentation> {
        self.representations.get(id.0)
    }

    pub fn item(&self, id: ItemId) -> Option<&RepresentationItem> {
        self.items.get(id.0)
    }

    /// Shape representations associated with a product; empty for unknown products.
    pub fn find_product_shapes(&self, id: ProductId) -> &[RepId] {
        self.product(id).map(|p| p.shapes.as_slice()).unwrap_or(&[])
    }

    /// The child-linkage manager of a representation, if one was ever recorded.
    pub fn find_shape_linkages(&self, id: RepId) -> Option<&ShapeLinkages> {
        self.representation(id).and_then(|r| r.linkages.as_ref())
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn representation_count(&self) -> usize {
        self.representations.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
