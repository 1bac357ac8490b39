//! The seam to an external meshing service.

use std::collections::HashSet;

use facetree_core::{AssemblyModel, ItemId, MeshError, ProductId, RepId};
use tracing::debug;

use crate::cache::MeshCache;

/// A meshing service that populates the cache before an export.
///
/// Implementations facet every representation item with geometry that is
/// reachable from `roots` and store the result in `cache`. Items without
/// geometry are simply left out.
pub trait Mesher {
    fn facet_all_products(
        &self,
        model: &AssemblyModel,
        roots: &[ProductId],
        cache: &mut MeshCache,
    ) -> Result<(), MeshError>;
}

impl<F> Mesher for F
where
    F: Fn(&AssemblyModel, &[ProductId], &mut MeshCache) -> Result<(), MeshError>,
{
    fn facet_all_products(
        &self,
        model: &AssemblyModel,
        roots: &[ProductId],
        cache: &mut MeshCache,
    ) -> Result<(), MeshError> {
        self(model, roots, cache)
    }
}

/// A mesher backed by meshes that were computed ahead of time.
///
/// Only meshes for items reachable from the requested roots are copied, so an
/// export of a sub-assembly does not carry the rest of the model's meshes.
#[derive(Debug, Clone, Default)]
pub struct PrefacetedMesher {
    meshes: MeshCache,
}

impl PrefacetedMesher {
    pub fn new(meshes: MeshCache) -> Self {
        Self { meshes }
    }

    pub fn meshes(&self) -> &MeshCache {
        &self.meshes
    }
}

impl Mesher for PrefacetedMesher {
    fn facet_all_products(
        &self,
        model: &AssemblyModel,
        roots: &[ProductId],
        cache: &mut MeshCache,
    ) -> Result<(), MeshError> {
        let items = reachable_items(model, roots);
        let mut copied = 0usize;
        for item in items {
            if let Some(mesh) = self.meshes.get(item) {
                cache.insert(item, mesh.clone());
                copied += 1;
            }
        }
        debug!(roots = roots.len(), meshes = copied, "copied prefaceted meshes");
        Ok(())
    }
}

/// Items reachable from the given roots, each listed once in discovery order.
fn reachable_items(model: &AssemblyModel, roots: &[ProductId]) -> Vec<ItemId> {
    let mut seen_reps: HashSet<RepId> = HashSet::new();
    let mut items = Vec::new();
    let mut stack: Vec<RepId> = roots
        .iter()
        .flat_map(|&root| model.find_product_shapes(root).iter().copied())
        .collect();
    stack.reverse();

    while let Some(rep_id) = stack.pop() {
        if !seen_reps.insert(rep_id) {
            continue;
        }
        let Some(rep) = model.representation(rep_id) else {
            continue;
        };
        items.extend(rep.items.iter().copied());
        if let Some(linkages) = &rep.linkages {
            let children: Vec<RepId> = linkages.iter().filter_map(|l| l.child).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    items
}
