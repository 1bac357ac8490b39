//! Export configuration.

use std::path::PathBuf;

use facetree_core::{AssemblyModel, ExportError, ProductId};
use serde::{Deserialize, Serialize};

/// Header text written when none is configured.
pub const DEFAULT_HEADER: &str = "binary stl";

/// Where the binary STL goes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Standard output.
    #[default]
    Stdout,
    /// A file, created or truncated.
    Path(PathBuf),
}

/// Options for a binary STL export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Output destination.
    pub destination: Destination,
    /// Split the output into one file per product. Not supported; always rejected.
    pub split: bool,
    /// Root products to export. `None` exports the model's own roots.
    pub roots: Option<Vec<ProductId>>,
    /// Text stored in the 80-byte header (truncated, zero padded).
    pub header: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            destination: Destination::Stdout,
            split: false,
            roots: None,
            header: DEFAULT_HEADER.to_string(),
        }
    }
}

impl ExportOptions {
    /// Create default export options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ExportError> {
        serde_json::from_str(text).map_err(|e| ExportError::InvalidOptions {
            reason: e.to_string(),
        })
    }

    /// Write to a file.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Destination::Path(path.into());
        self
    }

    /// Write to standard output.
    pub fn with_stdout(mut self) -> Self {
        self.destination = Destination::Stdout;
        self
    }

    /// Export these roots instead of the model's.
    pub fn with_roots(mut self, roots: impl IntoIterator<Item = ProductId>) -> Self {
        self.roots = Some(roots.into_iter().collect());
        self
    }

    /// Set the header text. Text beginning with `solid` is written with a
    /// `binary ` prefix so readers do not mistake the file for ASCII STL.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Request one file per product.
    pub fn split_output(mut self) -> Self {
        self.split = true;
        self
    }

    /// The roots this export covers.
    pub fn resolve_roots(&self, model: &AssemblyModel) -> Vec<ProductId> {
        match &self.roots {
            Some(roots) => roots.clone(),
            None => model.roots.clone(),
        }
    }
}
