//! Binary STL export for meshed assembly graphs.
//!
//! An export runs in stages:
//!
//! ```text
//! Start -> Meshing -> Counting -> HeaderWritten -> Emitting -> Closed
//! ```
//!
//! The counting and emitting passes share one walker, so the triangle count in
//! the header always matches the records that follow it.
//!
//! # Quick Start
//!
//! ```ignore
//! use facetree_export::{ExportOptions, StlExporter};
//!
//! let options = ExportOptions::new().with_path("assembly.stl");
//! let summary = StlExporter::new(&model, &mesher).export(&options)?;
//! println!("wrote {} triangles", summary.triangles);
//! ```

pub mod binary;
pub mod facet;
pub mod inspect;
pub mod options;
pub mod product;
pub mod stl;
pub mod walker;

pub use binary::{write_f32, write_u32, PREAMBLE_LEN, RECORD_LEN};
pub use facet::{check_facets, emit_facet};
pub use inspect::{StlSummary, StlTriangle};
pub use options::{Destination, ExportOptions, DEFAULT_HEADER};
pub use stl::{export_to_vec, header_bytes, write_binary_stl, ExportSummary, StlExporter};
pub use walker::{FacetCounter, FacetSink, FacetWriter, ShapeWalker};

// Re-export the types needed to drive an export
pub use facetree_core::{exit_code, ExportError, ExportStage};
