//! Product-level driver: runs the shape walker once per associated representation.

use std::io::Write;

use facetree_core::{ExportError, Placement, ProductId};
use facetree_mesh::MeshLookup;

use crate::walker::{FacetSink, ShapeWalker};

impl<L: MeshLookup> ShapeWalker<'_, L> {
    /// Walk every shape of `product`, each starting from the same `start` placement.
    ///
    /// Sibling representations do not chain placements. A product without
    /// shapes, or an unknown product, contributes nothing.
    pub fn walk_product<S: FacetSink>(
        &self,
        product: ProductId,
        start: Placement,
        sink: &mut S,
    ) -> Result<(), ExportError> {
        for &rep in self.model.find_product_shapes(product) {
            self.walk(Some(rep), start, sink)?;
        }
        Ok(())
    }

    /// Number of triangles across every shape of `product`.
    pub fn count_mesh_for_product(&self, product: ProductId) -> Result<u64, ExportError> {
        let mut total = 0;
        for &rep in self.model.find_product_shapes(product) {
            total += self.count_mesh_for_shape(Some(rep))?;
        }
        Ok(total)
    }

    /// Write every triangle of `product`, placed by `start`. Returns the record count.
    pub fn emit_mesh_for_product<W: Write + ?Sized>(
        &self,
        out: &mut W,
        product: ProductId,
        start: Placement,
    ) -> Result<u64, ExportError> {
        let mut emitted = 0;
        for &rep in self.model.find_product_shapes(product) {
            emitted += self.emit_mesh_for_shape(out, Some(rep), start)?;
        }
        Ok(emitted)
    }
}
