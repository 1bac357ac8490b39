//! Error types for facetree.

use std::fmt;
use std::path::PathBuf;

use crate::model::{ItemId, RepId};
use thiserror::Error;

/// Stage of a binary STL export, in the order the orchestrator visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Start,
    Meshing,
    Counting,
    HeaderWritten,
    Emitting,
    Closed,
    Failed,
}

impl ExportStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStage::Start => "start",
            ExportStage::Meshing => "meshing",
            ExportStage::Counting => "counting",
            ExportStage::HeaderWritten => "header",
            ExportStage::Emitting => "emitting",
            ExportStage::Closed => "closed",
            ExportStage::Failed => "failed",
        }
    }
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a meshing service while populating the mesh cache.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Faceting failed for {item}: {reason}")]
    FacetingFailed { item: ItemId, reason: String },
}

/// Errors during binary STL export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Only single STL file output is currently implemented")]
    SplitUnsupported,

    #[error("Could not open output file {}: {source}", .path.display())]
    OpenDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while {stage}: {source}")]
    Write {
        stage: ExportStage,
        #[source]
        source: std::io::Error,
    },

    #[error("Meshing failed: {0}")]
    Meshing(#[from] MeshError),

    #[error("Cyclic assembly: {rep} is its own ancestor ({})", format_path(.path))]
    CyclicAssembly { rep: RepId, path: Vec<RepId> },

    #[error("Facet {facet} references missing table entry {index}")]
    FacetIndex { facet: usize, index: u32 },

    #[error("Assembly has {count} triangles, more than binary STL can declare")]
    TooManyTriangles { count: u64 },

    #[error("Header declared {declared} triangles but {emitted} were written")]
    CountMismatch { declared: u32, emitted: u64 },

    #[error("Invalid export options: {reason}")]
    InvalidOptions { reason: String },

    #[error("Invalid binary STL: {reason}")]
    InvalidStl { reason: String },
}

impl ExportError {
    /// Process exit status for this failure. Success is 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExportError::SplitUnsupported | ExportError::InvalidOptions { .. } => 2,
            ExportError::OpenDestination { .. } => 3,
            ExportError::Write { .. } => 4,
            ExportError::CyclicAssembly { .. } => 5,
            ExportError::Meshing(_) => 6,
            ExportError::FacetIndex { .. } | ExportError::InvalidStl { .. } => 7,
            ExportError::TooManyTriangles { .. } | ExportError::CountMismatch { .. } => 8,
        }
    }

    /// Wrap an I/O failure raised during `stage`.
    pub fn write(stage: ExportStage, source: std::io::Error) -> Self {
        ExportError::Write { stage, source }
    }
}

/// Exit status for an export result: 0 on success, the error's code otherwise.
pub fn exit_code<T>(result: &Result<T, ExportError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.exit_code(),
    }
}

fn format_path(path: &[RepId]) -> String {
    path.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
