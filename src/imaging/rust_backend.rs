//! Pure Rust image processing backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG / WebP / TIFF | `DynamicImage::write_to` (lossless) |
//!
//! Derivatives keep the source's extension, so the output format always
//! matches the file name the URL promised.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{DerivativeParams, ImageOp};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

fn output_format(path: &Path) -> Result<ImageFormat, BackendError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        "webp" => Ok(ImageFormat::WebP),
        "tif" | "tiff" => Ok(ImageFormat::Tiff),
        other => Err(BackendError::ProcessingFailed(format!(
            "Unsupported output format: {other:?}"
        ))),
    }
}

/// Encode and save, choosing the encoder by file extension.
fn save_image(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let format = output_format(path)?;
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let mut writer = std::io::BufWriter::new(file);
    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, quality as u8);
            rgb.write_with_encoder(encoder)
                .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
        }
        // The WebP encoder only supports 8-bit RGB(A)
        ImageFormat::WebP => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_to(&mut writer, format)
            .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {}", e))),
        _ => img
            .write_to(&mut writer, format)
            .map_err(|e| BackendError::ProcessingFailed(format!("Encode failed: {}", e))),
    }
}

fn apply_op(img: DynamicImage, op: &ImageOp) -> DynamicImage {
    match *op {
        ImageOp::Resize { width, height } => img.resize_exact(width, height, FilterType::Lanczos3),
        ImageOp::Crop {
            x,
            y,
            width,
            height,
        } => img.crop_imm(x, y, width, height),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn derive(&self, params: &DerivativeParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let result = params.ops.iter().fold(img, apply_op);
        save_image(&result, &params.output, params.quality.value())
    }
}
