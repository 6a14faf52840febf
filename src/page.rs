//! Render an entity view as an HTML page response.
//!
//! The response's cache tags are the entity's own tags plus the tags of
//! every rendered image, so saving a mapping or style invalidates each page
//! that displays it.

use crate::cache_tags::CacheTags;
use crate::file::ImageItem;
use crate::render::{FieldDisplaySettings, RenderError, ResponsiveImageRenderer};
use crate::response::Response;
use maud::{DOCTYPE, Markup, html};

/// An entity as a page shows it: its URL, label, own cache tags and the
/// items of one image field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityView {
    pub url: String,
    pub label: String,
    pub cache_tags: CacheTags,
    pub images: Vec<ImageItem>,
}

fn document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { (title) }
            }
            body {
                (content)
            }
        }
    }
}

/// Render `view` with its image field displayed per `settings`.
///
/// A missing mapping renders the page without the field.
pub fn render_page(
    renderer: &ResponsiveImageRenderer<'_>,
    view: &EntityView,
    settings: &FieldDisplaySettings,
) -> Result<Response, RenderError> {
    let mut tags = view.cache_tags.clone();
    let mut fields = Vec::with_capacity(view.images.len());
    for item in &view.images {
        if let Some(result) = renderer.render_or_empty(settings, item, Some(&view.url))? {
            tags.merge(&result.cache_tags);
            fields.push(result.markup());
        }
    }

    let content = html! {
        article {
            h1 { (view.label) }
            @if !fields.is_empty() {
                div.field-image {
                    @for field in &fields {
                        div.field-item { (field) }
                    }
                }
            }
        }
    };

    Ok(Response::ok(document(&view.label, content).into_string().into_bytes())
        .with_header("Content-Type", "text/html; charset=utf-8")
        .with_cache_tags(tags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::BreakpointRegistry;
    use crate::derivative::UrlGenerator;
    use crate::render::ImageLink;
    use crate::storage::{MappingStore, MemoryMappingStore};
    use crate::test_helpers::{mapping_one, test_breakpoints, test_image, url_generator};

    fn view() -> EntityView {
        EntityView {
            url: "/node/1".into(),
            label: "Dawn & dusk".into(),
            cache_tags: ["node:1"].into_iter().collect(),
            images: vec![ImageItem::new(test_image("public"), "dawn")],
        }
    }

    fn deps() -> (MemoryMappingStore, BreakpointRegistry, UrlGenerator) {
        let store = MemoryMappingStore::new();
        store.save(&mapping_one()).unwrap();
        (store, test_breakpoints(), url_generator())
    }

    #[test]
    fn page_header_unions_entity_and_image_tags() {
        let (store, bps, urls) = deps();
        let renderer = ResponsiveImageRenderer::new(&store, &bps, &urls);
        let settings = FieldDisplaySettings {
            responsive_image_mapping: Some("mapping_one".into()),
            fallback_image_style: Some("large".into()),
            image_link: ImageLink::Content,
        };
        let resp = render_page(&renderer, &view(), &settings).unwrap();
        let header = resp.header("X-Cache-Tags").unwrap();
        assert!(header.contains("node:1"));
        assert!(header.contains("config:responsive_image.mappings.mapping_one"));
        assert!(header.contains("config:image.style.thumbnail"));

        let body = resp.body_text();
        assert!(body.starts_with("<!DOCTYPE html>"));
        assert!(body.contains("<h1>Dawn &amp; dusk</h1>"));
        assert!(body.contains(r#"<a href="/node/1"><picture>"#));
    }

    #[test]
    fn missing_mapping_renders_page_without_field() {
        let (store, bps, urls) = deps();
        let renderer = ResponsiveImageRenderer::new(&store, &bps, &urls);
        let settings = FieldDisplaySettings {
            responsive_image_mapping: Some("ghost".into()),
            ..FieldDisplaySettings::default()
        };
        let resp = render_page(&renderer, &view(), &settings).unwrap();
        assert_eq!(resp.header("X-Cache-Tags"), Some("node:1"));
        assert!(!resp.body_text().contains("<img"));
    }
}
