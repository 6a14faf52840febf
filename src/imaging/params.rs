//! Parameter types for derivative generation.
//!
//! These structs describe *what* to do to a source image, not *how*. The
//! [`operations`](super::operations) module turns an image style into a list
//! of [`ImageOp`]s; the [`backend`](super::backend) executes them.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`ImageOp`]: A single pixel operation (exact resize or crop).
//! - [`DerivativeParams`]: Source, output path, the op chain and quality.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// One step of a derivative pipeline, applied in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOp {
    /// Resample to exactly `width` x `height`.
    Resize { width: u32, height: u32 },
    /// Cut a `width` x `height` window starting at (`x`, `y`).
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
}

/// Everything a backend needs to write one derivative file.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub ops: Vec<ImageOp>,
    pub quality: Quality,
}
