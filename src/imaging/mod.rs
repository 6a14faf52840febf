//! Image processing in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize** | Lanczos3 `resize_exact` |
//! | **Crop** | `crop_imm` |
//! | **Encode** | by extension: JPEG (quality), PNG, WebP, TIFF |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining parameters + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{calculate_fill_dimensions, center_crop_offset, scale_dimensions};
pub use operations::{create_derivative, get_dimensions};
pub use params::{DerivativeParams, ImageOp, Quality};
pub use rust_backend::RustBackend;
