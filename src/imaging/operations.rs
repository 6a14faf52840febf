//! High-level image operations.
//!
//! These functions take a planned op chain, build backend parameters, and
//! call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{DerivativeParams, ImageOp, Quality};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<Dimensions> {
    backend.identify(path)
}

/// Write one derivative of `source` to `output`.
///
/// Creates the output directory if needed. The caller decides where the
/// bytes land; the store writes to a temp path and renames afterwards.
pub fn create_derivative(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    ops: Vec<ImageOp>,
    quality: Quality,
) -> Result<()> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    backend.derive(&DerivativeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        ops,
        quality,
    })
}
