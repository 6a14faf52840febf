//! Shared fixtures for unit tests.
//!
//! Mirrors the setup most tests need: the `responsive_image_test_module`
//! breakpoint group (mobile 0px, narrow 560px, wide 851px, all at `1x`), the
//! stock styles, a 40×20 source image, and the `mapping_one` mapping.
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let breakpoints = test_breakpoints();
//! let styles = stock_catalog();
//! let mapping = mapping_one();
//! ```

use std::path::Path;

use crate::breakpoint::{Breakpoint, BreakpointRegistry, Multiplier};
use crate::config::FilesConfig;
use crate::derivative::UrlGenerator;
use crate::file::{FileUri, SourceImage};
use crate::imaging::Dimensions;
use crate::mapping::ResponsiveImageMapping;
use crate::style::{StyleCatalog, stock_styles};

pub const GROUP: &str = "responsive_image_test_module";

/// Secret used by [`url_generator`]; tokens in tests are stable.
pub const SECRET: &str = "test-secret";

// =========================================================================
// Catalogs
// =========================================================================

/// The three-breakpoint test group, declared out of order on purpose.
pub fn test_breakpoints() -> BreakpointRegistry {
    let bp = |name: &str, width: u32| Breakpoint {
        id: format!("{GROUP}.{name}"),
        label: name.to_string(),
        group: GROUP.to_string(),
        media_query: format!("(min-width: {width}px)"),
        weight: 0,
        multipliers: vec![Multiplier::ONE],
    };
    let mut registry = BreakpointRegistry::new();
    registry.insert_group(
        GROUP,
        vec![bp("wide", 851), bp("mobile", 0), bp("narrow", 560)],
    );
    registry
}

pub fn stock_catalog() -> StyleCatalog {
    StyleCatalog::from_config(&stock_styles())
}

/// URL generator over default file settings with [`SECRET`].
pub fn url_generator() -> UrlGenerator {
    UrlGenerator::new(FilesConfig::default(), SECRET, stock_catalog())
}

// =========================================================================
// Images and mappings
// =========================================================================

/// A 40×20 image at `<scheme>://image-test.png`.
pub fn test_image(scheme: &str) -> SourceImage {
    let uri: FileUri = format!("{scheme}://image-test.png").parse().unwrap();
    SourceImage::new(uri, Some(Dimensions::new(40, 20)))
}

/// mobile→thumbnail, narrow→medium, wide→large, added widest first.
pub fn mapping_one() -> ResponsiveImageMapping {
    ResponsiveImageMapping::builder("mapping_one", GROUP)
        .label("Mapping One")
        .add_mapping(format!("{GROUP}.wide"), "1x", "large")
        .add_mapping(format!("{GROUP}.narrow"), "1x", "medium")
        .add_mapping(format!("{GROUP}.mobile"), "1x", "thumbnail")
        .build()
        .unwrap()
}

/// Write a solid-color PNG of the given size, creating parent directories.
pub fn write_test_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 5) as u8, (y * 11) as u8, 128])
    });
    img.save(path).unwrap();
}
