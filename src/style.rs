//! Image styles: named recipes that turn a source image into a derivative.
//!
//! A style is an ordered list of effects. The stock styles match what most
//! sites expect out of the box:
//!
//! | Style | Effect |
//! |---|---|
//! | `thumbnail` | scale to fit 100×100, no upscale |
//! | `medium` | scale to fit 220×220, no upscale |
//! | `large` | scale to fit 480×480, no upscale |
//!
//! The crate never decides *how* pixels move beyond planning the op chain;
//! the [`imaging`](crate::imaging) backend does the work.
//!
//! A responsive image mapping refers to styles through [`StyleRef`], which
//! makes "serve the original file" an explicit variant instead of an empty
//! style name.

use crate::cache_tags;
use crate::config::StyleConfig;
use crate::imaging::{
    Dimensions, ImageOp, Quality, calculate_fill_dimensions, center_crop_offset, scale_dimensions,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// One step of an image style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StyleEffect {
    /// Fit inside the box, preserving aspect ratio. Either bound may be omitted.
    Scale {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<u32>,
        #[serde(default)]
        upscale: bool,
    },
    /// Cover the box, then center-crop to exactly `width` x `height`.
    ScaleAndCrop { width: u32, height: u32 },
    /// Resample to exactly `width` x `height`, ignoring aspect ratio.
    Resize { width: u32, height: u32 },
}

impl StyleEffect {
    fn transform(&self, dims: Dimensions) -> Dimensions {
        match *self {
            StyleEffect::Scale {
                width,
                height,
                upscale,
            } => {
                let (w, h) = scale_dimensions((dims.width, dims.height), width, height, upscale);
                Dimensions::new(w, h)
            }
            StyleEffect::ScaleAndCrop { width, height } | StyleEffect::Resize { width, height } => {
                Dimensions::new(width, height)
            }
        }
    }

    fn plan(&self, dims: Dimensions, ops: &mut Vec<ImageOp>) {
        match *self {
            StyleEffect::Scale { .. } => {
                let out = self.transform(dims);
                if out != dims {
                    ops.push(ImageOp::Resize {
                        width: out.width,
                        height: out.height,
                    });
                }
            }
            StyleEffect::ScaleAndCrop { width, height } => {
                let filled = calculate_fill_dimensions((dims.width, dims.height), (width, height));
                let (x, y) = center_crop_offset(filled, (width, height));
                ops.push(ImageOp::Resize {
                    width: filled.0,
                    height: filled.1,
                });
                ops.push(ImageOp::Crop {
                    x,
                    y,
                    width,
                    height,
                });
            }
            StyleEffect::Resize { width, height } => ops.push(ImageOp::Resize { width, height }),
        }
    }

    /// Dimensions the effect always produces, if any, regardless of input.
    pub(crate) fn fixed_box(&self) -> Option<(u32, u32)> {
        match *self {
            StyleEffect::ScaleAndCrop { width, height } | StyleEffect::Resize { width, height } => {
                Some((width, height))
            }
            StyleEffect::Scale { .. } => None,
        }
    }
}

/// A named derivative recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStyle {
    pub id: String,
    pub label: String,
    pub effects: Vec<StyleEffect>,
}

impl ImageStyle {
    pub fn new(id: impl Into<String>, label: impl Into<String>, effects: Vec<StyleEffect>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            effects,
        }
    }

    pub fn cache_tag(&self) -> String {
        cache_tags::style_tag(&self.id)
    }

    /// Size of the derivative this style produces from an image of `dims`.
    pub fn transform_dimensions(&self, dims: Dimensions) -> Dimensions {
        self.effects.iter().fold(dims, |d, effect| effect.transform(d))
    }

    /// Op chain producing the derivative from an image of `dims`.
    pub fn plan(&self, dims: Dimensions) -> Vec<ImageOp> {
        let mut ops = Vec::new();
        let mut current = dims;
        for effect in &self.effects {
            effect.plan(current, &mut ops);
            current = effect.transform(current);
        }
        ops
    }

    /// SHA-256 of everything that changes the derivative's pixels.
    ///
    /// Stored in the derivative cache; editing a style or the encode quality
    /// changes the hash and forces regeneration.
    pub fn params_hash(&self, quality: Quality) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"style\0");
        hasher.update(self.id.as_bytes());
        hasher.update(b"\0");
        for effect in &self.effects {
            match *effect {
                StyleEffect::Scale {
                    width,
                    height,
                    upscale,
                } => {
                    hasher.update(b"scale\0");
                    hasher.update(width.unwrap_or(0).to_le_bytes());
                    hasher.update(height.unwrap_or(0).to_le_bytes());
                    hasher.update([upscale as u8]);
                }
                StyleEffect::ScaleAndCrop { width, height } => {
                    hasher.update(b"scale_and_crop\0");
                    hasher.update(width.to_le_bytes());
                    hasher.update(height.to_le_bytes());
                }
                StyleEffect::Resize { width, height } => {
                    hasher.update(b"resize\0");
                    hasher.update(width.to_le_bytes());
                    hasher.update(height.to_le_bytes());
                }
            }
        }
        hasher.update(quality.value().to_le_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Reference from a mapping entry to the image it should serve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StyleRef {
    /// Serve the derivative of this style.
    Style(String),
    /// Serve the original file; no derivative is requested.
    UseOriginal,
}

impl StyleRef {
    pub fn style_id(&self) -> Option<&str> {
        match self {
            StyleRef::Style(id) => Some(id),
            StyleRef::UseOriginal => None,
        }
    }
}

impl From<&str> for StyleRef {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            StyleRef::UseOriginal
        } else {
            StyleRef::Style(trimmed.to_string())
        }
    }
}

impl From<String> for StyleRef {
    fn from(value: String) -> Self {
        StyleRef::from(value.as_str())
    }
}

impl From<StyleRef> for String {
    fn from(value: StyleRef) -> Self {
        match value {
            StyleRef::Style(id) => id,
            StyleRef::UseOriginal => String::new(),
        }
    }
}

impl fmt::Display for StyleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleRef::Style(id) => f.write_str(id),
            StyleRef::UseOriginal => f.write_str("(original)"),
        }
    }
}

/// All configured image styles, by id.
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    styles: BTreeMap<String, ImageStyle>,
}

impl StyleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BTreeMap<String, StyleConfig>) -> Self {
        let mut catalog = Self::new();
        for (id, style) in config {
            let label = style.label.clone().unwrap_or_else(|| id.clone());
            catalog.insert(ImageStyle::new(id.clone(), label, style.effects.clone()));
        }
        catalog
    }

    pub fn insert(&mut self, style: ImageStyle) {
        self.styles.insert(style.id.clone(), style);
    }

    pub fn get(&self, id: &str) -> Option<&ImageStyle> {
        self.styles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.styles.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageStyle> {
        self.styles.values()
    }
}

/// The stock `thumbnail`/`medium`/`large` styles.
pub fn stock_styles() -> BTreeMap<String, StyleConfig> {
    [
        ("thumbnail", "Thumbnail (100×100)", 100),
        ("medium", "Medium (220×220)", 220),
        ("large", "Large (480×480)", 480),
    ]
    .into_iter()
    .map(|(id, label, edge)| {
        (
            id.to_string(),
            StyleConfig {
                label: Some(label.to_string()),
                effects: vec![StyleEffect::Scale {
                    width: Some(edge),
                    height: Some(edge),
                    upscale: false,
                }],
            },
        )
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock() -> StyleCatalog {
        StyleCatalog::from_config(&stock_styles())
    }

    #[test]
    fn stock_catalog_has_three_styles() {
        let catalog = stock();
        for id in ["thumbnail", "medium", "large"] {
            assert!(catalog.contains(id), "missing {id}");
        }
        assert_eq!(catalog.get("large").unwrap().label, "Large (480×480)");
    }

    #[test]
    fn small_source_is_not_upscaled() {
        let large = stock().get("large").unwrap().clone();
        assert_eq!(
            large.transform_dimensions(Dimensions::new(40, 20)),
            Dimensions::new(40, 20)
        );
        assert!(large.plan(Dimensions::new(40, 20)).is_empty());
    }

    #[test]
    fn big_source_is_scaled_to_fit() {
        let medium = stock().get("medium").unwrap().clone();
        assert_eq!(
            medium.transform_dimensions(Dimensions::new(1000, 500)),
            Dimensions::new(220, 110)
        );
        assert_eq!(
            medium.plan(Dimensions::new(1000, 500)),
            vec![ImageOp::Resize {
                width: 220,
                height: 110
            }]
        );
    }

    #[test]
    fn scale_and_crop_plans_fill_then_center_crop() {
        let style = ImageStyle::new(
            "square",
            "Square",
            vec![StyleEffect::ScaleAndCrop {
                width: 400,
                height: 400,
            }],
        );
        assert_eq!(
            style.plan(Dimensions::new(1600, 900)),
            vec![
                ImageOp::Resize {
                    width: 711,
                    height: 400
                },
                ImageOp::Crop {
                    x: 155,
                    y: 0,
                    width: 400,
                    height: 400
                },
            ]
        );
        assert_eq!(
            style.transform_dimensions(Dimensions::new(1600, 900)),
            Dimensions::new(400, 400)
        );
    }

    #[test]
    fn effects_chain_in_order() {
        let style = ImageStyle::new(
            "chain",
            "Chain",
            vec![
                StyleEffect::Resize {
                    width: 1000,
                    height: 1000,
                },
                StyleEffect::Scale {
                    width: Some(100),
                    height: None,
                    upscale: false,
                },
            ],
        );
        assert_eq!(
            style.transform_dimensions(Dimensions::new(3, 7)),
            Dimensions::new(100, 100)
        );
        assert_eq!(style.plan(Dimensions::new(3, 7)).len(), 2);
    }

    #[test]
    fn params_hash_tracks_effects_and_quality() {
        let large = stock().get("large").unwrap().clone();
        let mut edited = large.clone();
        edited.effects = vec![StyleEffect::Scale {
            width: Some(481),
            height: Some(480),
            upscale: false,
        }];
        assert_eq!(
            large.params_hash(Quality::new(90)),
            large.params_hash(Quality::new(90))
        );
        assert_ne!(
            large.params_hash(Quality::new(90)),
            large.params_hash(Quality::new(80))
        );
        assert_ne!(
            large.params_hash(Quality::new(90)),
            edited.params_hash(Quality::new(90))
        );
    }

    #[test]
    fn style_ref_empty_string_means_original() {
        assert_eq!(StyleRef::from(""), StyleRef::UseOriginal);
        assert_eq!(StyleRef::from("  "), StyleRef::UseOriginal);
        assert_eq!(StyleRef::from("large"), StyleRef::Style("large".into()));
        assert_eq!(String::from(StyleRef::UseOriginal), "");
        assert_eq!(StyleRef::UseOriginal.style_id(), None);
    }

    #[test]
    fn style_effect_toml_shape() {
        let effect: StyleEffect =
            toml::from_str("op = \"scale\"\nwidth = 220\nheight = 220\n").unwrap();
        assert_eq!(
            effect,
            StyleEffect::Scale {
                width: Some(220),
                height: Some(220),
                upscale: false
            }
        );
        let crop: StyleEffect =
            toml::from_str("op = \"scale_and_crop\"\nwidth = 10\nheight = 20\n").unwrap();
        assert_eq!(crop.fixed_box(), Some((10, 20)));
    }

    #[test]
    fn cache_tag_names_style_config() {
        assert_eq!(
            stock().get("thumbnail").unwrap().cache_tag(),
            "config:image.style.thumbnail"
        );
    }
}
