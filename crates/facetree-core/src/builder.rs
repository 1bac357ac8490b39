//! Builder for assembling a model.

use crate::model::{
    AssemblyModel, ChildLinkage, ItemId, LinkageKind, Product, ProductId, RepId,
    RepresentationItem, ShapeRepresentation,
};
use crate::placement::Placement;

/// Incrementally builds an [`AssemblyModel`].
///
/// Every `add_*` call returns the id of the new entity. Linking calls accept ids
/// that do not exist yet; they simply fail to resolve at export time.
#[derive(Debug, Default)]
pub struct AssemblyBuilder {
    model: AssemblyModel,
}

impl AssemblyBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product that is not a top-level assembly.
    pub fn add_product(&mut self, name: &str) -> ProductId {
        let id = ProductId(self.model.products.len());
        self.model.products.push(Product {
            name: name.to_string(),
            shapes: Default::default(),
        });
        id
    }

    /// Add a product and record it as a top-level assembly.
    pub fn add_root(&mut self, name: &str) -> ProductId {
        let id = self.add_product(name);
        self.model.roots.push(id);
        id
    }

    /// Add an empty shape representation.
    pub fn add_representation(&mut self, name: &str) -> RepId {
        let id = RepId(self.model.representations.len());
        self.model.representations.push(ShapeRepresentation {
            name: name.to_string(),
            ..Default::default()
        });
        id
    }

    /// Add a representation item to a representation.
    pub fn add_item(&mut self, rep: RepId, name: &str) -> ItemId {
        let id = ItemId(self.model.items.len());
        self.model.items.push(RepresentationItem {
            name: name.to_string(),
        });
        if let Some(r) = self.model.representations.get_mut(rep.0) {
            r.items.push(id);
        }
        id
    }

    /// Associate a shape representation with a product.
    pub fn attach_shape(&mut self, product: ProductId, rep: RepId) -> &mut Self {
        if let Some(p) = self.model.products.get_mut(product.0) {
            p.shapes.push(rep);
        }
        self
    }

    /// Nest `child` under `parent` through a shape representation relationship.
    pub fn link_relationship(&mut self, parent: RepId, child: RepId, placement: Placement) -> &mut Self {
        self.link(parent, ChildLinkage::relationship(child, placement))
    }

    /// Place an instance of `child` under `parent` through a mapped item.
    pub fn link_mapped_item(&mut self, parent: RepId, child: RepId, placement: Placement) -> &mut Self {
        self.link(parent, ChildLinkage::mapped_item(child, placement))
    }

    /// Record a linkage whose target did not resolve.
    pub fn link_unresolved(&mut self, parent: RepId, kind: LinkageKind) -> &mut Self {
        self.link(parent, ChildLinkage::unresolved(kind))
    }

    /// Record an arbitrary linkage under `parent`.
    pub fn link(&mut self, parent: RepId, linkage: ChildLinkage) -> &mut Self {
        if let Some(r) = self.model.representations.get_mut(parent.0) {
            r.linkages.get_or_insert_with(Default::default).push(linkage);
        }
        self
    }

    /// Finish building.
    pub fn build(self) -> AssemblyModel {
        self.model
    }
}
