//! Core types for the facetree assembly exporter.
//!
//! This crate provides the foundational types used across the other facetree crates:
//! - The assembly graph (products, shape representations, representation items)
//! - Child linkages and the placements they carry
//! - The builder used to assemble a model
//! - Error types

pub mod builder;
pub mod errors;
pub mod model;
pub mod placement;

pub use builder::AssemblyBuilder;
pub use errors::*;
pub use model::*;
pub use placement::Placement;
