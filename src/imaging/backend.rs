//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the derivative store
//! needs: identify a source, and write a derivative from a planned op chain.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate and statically linked into the binary.

use super::params::DerivativeParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Trait for image processing backends.
///
/// `Sync` because the derivative store shares one backend across rayon
/// workers and concurrent requests.
pub trait ImageBackend: Sync {
    /// Get image dimensions without decoding the pixels.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the source, apply every op in order, encode to the output path.
    fn derive(&self, params: &DerivativeParams) -> Result<(), BackendError>;
}
