//! Render an image field as `<picture>` markup plus its cache tags.
//!
//! [`ResponsiveImageRenderer::render`] ties the pieces together:
//!
//! ```text
//! FieldDisplaySettings ──► MappingStore::load ──► resolver::resolve ──► sources
//!                      └─────────────────────► select_fallback ─────► <img>
//! ```
//!
//! The cache-tag set names the mapping, every style in the sources and the
//! fallback style. Invalidating any of those configs must invalidate the page,
//! so the set travels with the render result to the response headers.
//!
//! With no mapping configured the renderer runs as a plain image formatter:
//! a single `<img>` of the original (or the fallback style), optionally linked.
//!
//! Markup is produced with maud, so alt text, titles and URLs are escaped.

use crate::breakpoint::BreakpointCatalog;
use crate::cache_tags::{self, CacheTags};
use crate::derivative::{DerivativeError, DerivativeService};
use crate::fallback::{Fallback, select_fallback};
use crate::file::ImageItem;
use crate::resolver::{Source, resolve};
use crate::storage::{MappingStore, StoreError};
use maud::{Markup, html};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("responsive image mapping not found: {0}")]
    MappingNotFound(String),
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Derivative(#[from] DerivativeError),
}

impl From<StoreError> for RenderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => RenderError::MappingNotFound(id),
            other => RenderError::Store(other),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid image link {0:?} (expected none, file or content)")]
pub struct ImageLinkError(String);

/// What the rendered image links to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageLink {
    #[default]
    None,
    /// The original file, never a derivative.
    File,
    /// The entity the field belongs to.
    Content,
}

impl ImageLink {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageLink::None => "none",
            ImageLink::File => "file",
            ImageLink::Content => "content",
        }
    }
}

impl FromStr for ImageLink {
    type Err = ImageLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(ImageLink::None),
            "file" => Ok(ImageLink::File),
            "content" => Ok(ImageLink::Content),
            other => Err(ImageLinkError(other.to_string())),
        }
    }
}

impl TryFrom<String> for ImageLink {
    type Error = ImageLinkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImageLink> for String {
    fn from(value: ImageLink) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ImageLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formatter settings of an image field display. Empty strings mean unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldDisplaySettings {
    pub responsive_image_mapping: Option<String>,
    pub fallback_image_style: Option<String>,
    pub image_link: ImageLink,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl FieldDisplaySettings {
    pub fn mapping_id(&self) -> Option<&str> {
        non_empty(&self.responsive_image_mapping)
    }

    pub fn fallback_style(&self) -> Option<&str> {
        non_empty(&self.fallback_image_style)
    }
}

/// Everything needed to emit one rendered image field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    /// `None` in plain image mode.
    pub mapping_id: Option<String>,
    /// Ascending `min-width`.
    pub sources: Vec<Source>,
    pub fallback: Fallback,
    pub link: Option<String>,
    pub alt: String,
    pub title: Option<String>,
    pub cache_tags: CacheTags,
}

impl RenderResult {
    pub fn markup(&self) -> Markup {
        let image = html! {
            img src=(self.fallback.src)
                width=[self.fallback.dimensions.map(|d| d.width)]
                height=[self.fallback.dimensions.map(|d| d.height)]
                alt=(self.alt)
                title=[self.title.as_deref()];
        };
        let body = if self.mapping_id.is_some() {
            html! {
                picture {
                    @for source in &self.sources {
                        source srcset=(source.srcset()) media=(source.media_query);
                    }
                    (image)
                }
            }
        } else {
            image
        };
        match &self.link {
            Some(href) => html! { a href=(href) { (body) } },
            None => body,
        }
    }
}

/// Renders image fields through a mapping store, breakpoint catalog and
/// derivative service.
pub struct ResponsiveImageRenderer<'a> {
    mappings: &'a dyn MappingStore,
    breakpoints: &'a dyn BreakpointCatalog,
    derivatives: &'a dyn DerivativeService,
}

impl<'a> ResponsiveImageRenderer<'a> {
    pub fn new(
        mappings: &'a dyn MappingStore,
        breakpoints: &'a dyn BreakpointCatalog,
        derivatives: &'a dyn DerivativeService,
    ) -> Self {
        Self {
            mappings,
            breakpoints,
            derivatives,
        }
    }

    /// Render `item` with `settings`.
    ///
    /// `entity_url` is the hosting entity's canonical URL, used when
    /// `image_link` is `content`. Fails with [`RenderError::MappingNotFound`]
    /// when the configured mapping does not exist; see
    /// [`render_or_empty`](Self::render_or_empty).
    pub fn render(
        &self,
        settings: &FieldDisplaySettings,
        item: &ImageItem,
        entity_url: Option<&str>,
    ) -> Result<RenderResult, RenderError> {
        let mut tags = CacheTags::new();
        let mut sources = Vec::new();

        let mapping_id = match settings.mapping_id() {
            Some(id) => {
                let mapping = self.mappings.load(id)?;
                let resolution =
                    resolve(&mapping, self.breakpoints, &item.image, self.derivatives)?;
                tags.insert(mapping.cache_tag());
                tags.extend(resolution.used_styles.iter().map(|s| cache_tags::style_tag(s)));
                sources = resolution.sources;
                Some(mapping.id().to_string())
            }
            None => None,
        };

        let fallback = select_fallback(settings, &item.image, self.derivatives)?;
        if let Some(style) = &fallback.style {
            tags.insert(cache_tags::style_tag(style));
        }

        let link = match settings.image_link {
            ImageLink::None => None,
            ImageLink::File => Some(self.derivatives.original_url(&item.image)),
            ImageLink::Content => {
                if entity_url.is_none() {
                    log::debug!("image_link = content but no entity URL given; not linking");
                }
                entity_url.map(str::to_string)
            }
        };

        Ok(RenderResult {
            mapping_id,
            sources,
            fallback,
            link,
            alt: item.alt.clone(),
            title: item.title.clone(),
            cache_tags: tags,
        })
    }

    /// Like [`render`](Self::render), but a missing mapping renders nothing.
    pub fn render_or_empty(
        &self,
        settings: &FieldDisplaySettings,
        item: &ImageItem,
        entity_url: Option<&str>,
    ) -> Result<Option<RenderResult>, RenderError> {
        match self.render(settings, item, entity_url) {
            Ok(result) => Ok(Some(result)),
            Err(RenderError::MappingNotFound(id)) => {
                log::warn!("responsive image mapping '{id}' not found; field not rendered");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
