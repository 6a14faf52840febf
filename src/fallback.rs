//! The `<img>` every render carries, whatever the sources resolve to.

use crate::derivative::{DerivativeError, DerivativeService};
use crate::file::SourceImage;
use crate::imaging::Dimensions;
use crate::render::FieldDisplaySettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub src: String,
    /// Style of the derivative in `src`, or `None` for the original.
    pub style: Option<String>,
    pub dimensions: Option<Dimensions>,
}

/// Pick the fallback image: the `fallback_image_style` derivative when one
/// is configured, the original otherwise.
pub fn select_fallback(
    settings: &FieldDisplaySettings,
    image: &SourceImage,
    derivatives: &dyn DerivativeService,
) -> Result<Fallback, DerivativeError> {
    match settings.fallback_style() {
        Some(style) => {
            let src = derivatives.derivative_url(image, style)?;
            let dimensions = image
                .dimensions
                .map(|dims| derivatives.transform_dimensions(style, dims))
                .transpose()?;
            Ok(Fallback {
                src,
                style: Some(style.to_string()),
                dimensions,
            })
        }
        None => Ok(Fallback {
            src: derivatives.original_url(image),
            style: None,
            dimensions: image.dimensions,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{test_image, url_generator};

    fn settings(style: &str) -> FieldDisplaySettings {
        FieldDisplaySettings {
            fallback_image_style: Some(style.to_string()),
            ..FieldDisplaySettings::default()
        }
    }

    #[test]
    fn styled_fallback_uses_derivative() {
        let fb = select_fallback(&settings("large"), &test_image("public"), &url_generator())
            .unwrap();
        assert!(fb.src.contains("/styles/large/public/image-test.png"));
        assert_eq!(fb.style.as_deref(), Some("large"));
        // 40×20 is under 480×480; large never upscales.
        assert_eq!(fb.dimensions, Some(Dimensions::new(40, 20)));
    }

    #[test]
    fn styled_fallback_reports_transformed_size() {
        let mut image = test_image("public");
        image.dimensions = Some(Dimensions::new(1000, 500));
        let fb = select_fallback(&settings("thumbnail"), &image, &url_generator()).unwrap();
        assert_eq!(fb.dimensions, Some(Dimensions::new(100, 50)));
    }

    #[test]
    fn unset_or_empty_style_uses_original() {
        for s in [FieldDisplaySettings::default(), settings("")] {
            let fb = select_fallback(&s, &test_image("public"), &url_generator()).unwrap();
            assert_eq!(fb.src, "/files/image-test.png");
            assert_eq!(fb.style, None);
        }
    }

    #[test]
    fn unknown_dimensions_stay_unknown() {
        let mut image = test_image("public");
        image.dimensions = None;
        let fb = select_fallback(&settings("large"), &image, &url_generator()).unwrap();
        assert_eq!(fb.dimensions, None);
    }

    #[test]
    fn unknown_style_is_error() {
        assert!(
            select_fallback(&settings("poster"), &test_image("public"), &url_generator())
                .is_err()
        );
    }
}
