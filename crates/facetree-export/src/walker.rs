//! Recursive walk of a shape representation and its child linkages.
//!
//! Counting and emitting share [`ShapeWalker::walk`]; only the [`FacetSink`]
//! differs. Both passes therefore visit the same facets in the same order, which
//! is what keeps the header count equal to the number of records written.
//!
//! The walk keeps its own work stack, so nesting depth is bounded by memory
//! rather than by the thread's call stack.

use std::io::Write;

use facetree_core::{AssemblyModel, ExportError, Placement, RepId};
use facetree_mesh::{FacetSet, MeshLookup};
use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::facet::{check_facets, emit_facet};

/// Receives every cached facet set reached by a walk, with its accumulated placement.
pub trait FacetSink {
    fn accept(&mut self, facets: &FacetSet, accum: &Placement) -> Result<(), ExportError>;
}

/// Sums facet counts. Placements are ignored.
///
/// Every facet is checked against its point and normal tables while counting,
/// so a bad index is reported before anything is written.
#[derive(Debug, Default)]
pub struct FacetCounter {
    pub total: u64,
}

impl FacetSink for FacetCounter {
    fn accept(&mut self, facets: &FacetSet, _accum: &Placement) -> Result<(), ExportError> {
        check_facets(facets)?;
        self.total += facets.facet_count() as u64;
        Ok(())
    }
}

/// Writes one triangle record per facet.
pub struct FacetWriter<'w, W: Write + ?Sized> {
    out: &'w mut W,
    pub emitted: u64,
}

impl<'w, W: Write + ?Sized> FacetWriter<'w, W> {
    pub fn new(out: &'w mut W) -> Self {
        Self { out, emitted: 0 }
    }
}

impl<W: Write + ?Sized> FacetSink for FacetWriter<'_, W> {
    fn accept(&mut self, facets: &FacetSet, accum: &Placement) -> Result<(), ExportError> {
        for index in 0..facets.facet_count() {
            emit_facet(&mut *self.out, facets, index, accum)?;
            self.emitted += 1;
        }
        Ok(())
    }
}

enum Step {
    Enter(RepId, Placement),
    Leave,
}

/// Walks shape representations of a read-only model against a mesh lookup.
pub struct ShapeWalker<'a, L: MeshLookup> {
    pub(crate) model: &'a AssemblyModel,
    meshes: &'a L,
}

impl<'a, L: MeshLookup> ShapeWalker<'a, L> {
    pub fn new(model: &'a AssemblyModel, meshes: &'a L) -> Self {
        Self { model, meshes }
    }

    /// Depth-first pre-order walk starting at `rep` with placement `accum`.
    ///
    /// Local meshes come first, then relationship children, then mapped-item
    /// children. A child is placed by `child.placement.then(accum)`. Absent
    /// representations, unresolved linkages and items without a cached mesh
    /// contribute nothing. Re-entering an ancestor fails with
    /// [`ExportError::CyclicAssembly`].
    pub fn walk<S: FacetSink>(
        &self,
        rep: Option<RepId>,
        accum: Placement,
        sink: &mut S,
    ) -> Result<(), ExportError> {
        let Some(rep) = rep else {
            return Ok(());
        };

        // Current path from the walk root, in order.
        let mut ancestors: IndexSet<RepId> = IndexSet::new();
        let mut stack = vec![Step::Enter(rep, accum)];

        while let Some(step) = stack.pop() {
            let (rep_id, accum) = match step {
                Step::Enter(rep_id, accum) => (rep_id, accum),
                Step::Leave => {
                    ancestors.pop();
                    continue;
                }
            };

            let Some(shape) = self.model.representation(rep_id) else {
                debug!(rep = %rep_id, "skipping unknown shape representation");
                continue;
            };
            if ancestors.contains(&rep_id) {
                let mut path: Vec<RepId> = ancestors.iter().copied().collect();
                path.push(rep_id);
                return Err(ExportError::CyclicAssembly { rep: rep_id, path });
            }
            trace!(rep = %rep_id, depth = ancestors.len(), "visiting shape");

            for &item in &shape.items {
                if let Some(mesh) = self.meshes.find_cached_mesh(item) {
                    sink.accept(mesh.facet_set(), &accum)?;
                }
            }

            let Some(linkages) = &shape.linkages else {
                continue;
            };

            ancestors.insert(rep_id);
            stack.push(Step::Leave);
            let first_child = stack.len();
            for linkage in linkages.iter() {
                let Some(child) = linkage.child else {
                    debug!(parent = %rep_id, kind = ?linkage.kind, "skipping unresolved child linkage");
                    continue;
                };
                stack.push(Step::Enter(child, linkage.placement.then(&accum)));
            }
            // Popped last-in first-out; the first linkage must come off first.
            stack[first_child..].reverse();
        }

        Ok(())
    }

    /// Number of triangles under `rep`, including every child instance.
    pub fn count_mesh_for_shape(&self, rep: Option<RepId>) -> Result<u64, ExportError> {
        let mut counter = FacetCounter::default();
        self.walk(rep, Placement::IDENTITY, &mut counter)?;
        Ok(counter.total)
    }

    /// Write every triangle under `rep`, placed by `accum`. Returns the record count.
    pub fn emit_mesh_for_shape<W: Write + ?Sized>(
        &self,
        out: &mut W,
        rep: Option<RepId>,
        accum: Placement,
    ) -> Result<u64, ExportError> {
        let mut writer = FacetWriter::new(out);
        self.walk(rep, accum, &mut writer)?;
        Ok(writer.emitted)
    }
}
