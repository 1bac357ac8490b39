//! Triangle facet data and the mesh cache consumed by the exporter.
//!
//! This crate provides:
//! - Facet sets with shared vertex and normal tables
//! - The mesh cache, keyed by representation item
//! - The [`Mesher`] trait, the seam to an external meshing service

mod cache;
mod facet;
mod mesher;

pub use cache::{MeshCache, MeshLookup};
pub use facet::{Facet, FacetSet, Mesh};
pub use mesher::{Mesher, PrefacetedMesher};
