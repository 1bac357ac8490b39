//! The mesh cache, keyed by representation item.

use facetree_core::ItemId;
use indexmap::IndexMap;

use crate::facet::Mesh;

/// Read-only lookup of cached meshes.
///
/// The exporter only ever reads meshes through this trait, so a walk can run
/// against a synthetic lookup as easily as against a populated [`MeshCache`].
pub trait MeshLookup {
    /// Find the mesh cached for an item. Absence is normal (e.g. placement items).
    fn find_cached_mesh(&self, item: ItemId) -> Option<&Mesh>;
}

impl<T: MeshLookup + ?Sized> MeshLookup for &T {
    fn find_cached_mesh(&self, item: ItemId) -> Option<&Mesh> {
        (**self).find_cached_mesh(item)
    }
}

/// Meshes produced by a meshing pass.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshCache {
    meshes: IndexMap<ItemId, Mesh>,
}

impl MeshCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache a mesh for an item, replacing any previous one.
    pub fn insert(&mut self, item: ItemId, mesh: impl Into<Mesh>) -> Option<Mesh> {
        self.meshes.insert(item, mesh.into())
    }

    pub fn get(&self, item: ItemId) -> Option<&Mesh> {
        self.meshes.get(&item)
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.meshes.contains_key(&item)
    }

    /// Number of cached meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Total facets across every cached mesh.
    pub fn total_facets(&self) -> usize {
        self.meshes.values().map(Mesh::facet_count).sum()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &Mesh)> {
        self.meshes.iter().map(|(id, mesh)| (*id, mesh))
    }

    /// Copy every entry of `other` into this cache.
    pub fn extend_from(&mut self, other: &MeshCache) {
        for (id, mesh) in other.iter() {
            self.meshes.insert(id, mesh.clone());
        }
    }
}

impl MeshLookup for MeshCache {
    fn find_cached_mesh(&self, item: ItemId) -> Option<&Mesh> {
        self.get(item)
    }
}
