//! Resolve a mapping against a breakpoint group into `<source>` lines.
//!
//! Resolution walks the group in cascade order (ascending `min-width`,
//! zero-width first) and emits one [`Source`] per breakpoint that has at
//! least one mapping entry. The order of the result is the order browsers
//! evaluate `<source>` elements in, so it never depends on the order entries
//! were added to the mapping.
//!
//! Tolerated misconfiguration:
//!
//! - an unknown breakpoint group resolves to no sources (the render degrades
//!   to its fallback image),
//! - entries naming a breakpoint outside the group are skipped.
//!
//! [`mapping::lint`](crate::mapping::lint) reports both.

use crate::breakpoint::{BreakpointCatalog, Multiplier, cascade_order};
use crate::derivative::{DerivativeError, DerivativeService};
use crate::file::SourceImage;
use crate::mapping::ResponsiveImageMapping;
use crate::style::StyleRef;
use std::collections::{BTreeSet, HashSet};

/// One `srcset` candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub multiplier: Multiplier,
    pub url: String,
}

/// One `<source>` element: a breakpoint's media query and its candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub breakpoint_id: String,
    pub media_query: String,
    pub min_width: u32,
    /// Ascending multiplier.
    pub candidates: Vec<Candidate>,
}

impl Source {
    /// `srcset` attribute value, e.g. `/a.png 1x, /b.png 2x`.
    pub fn srcset(&self) -> String {
        self.candidates
            .iter()
            .map(|c| format!("{} {}", c.url, c.multiplier))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub sources: Vec<Source>,
    /// Ids of styles whose derivatives appear in `sources`.
    pub used_styles: BTreeSet<String>,
}

/// Resolve `mapping` for `image`.
///
/// Derivative URL failures propagate unchanged.
pub fn resolve(
    mapping: &ResponsiveImageMapping,
    catalog: &dyn BreakpointCatalog,
    image: &SourceImage,
    derivatives: &dyn DerivativeService,
) -> Result<Resolution, DerivativeError> {
    let Some(mut breakpoints) = catalog.group(mapping.breakpoint_group()) else {
        log::warn!(
            "mapping {}: breakpoint group '{}' not found, rendering fallback only",
            mapping.id(),
            mapping.breakpoint_group()
        );
        return Ok(Resolution::default());
    };
    breakpoints.sort_by(cascade_order);

    let known: HashSet<&str> = breakpoints.iter().map(|bp| bp.id.as_str()).collect();
    for entry in mapping.entries() {
        if !known.contains(entry.breakpoint_id.as_str()) {
            log::debug!(
                "mapping {}: skipping {} (breakpoint not in group '{}')",
                mapping.id(),
                entry.key(),
                mapping.breakpoint_group()
            );
        }
    }

    let mut resolution = Resolution::default();
    for bp in &breakpoints {
        let entries = mapping.entries_for(&bp.id);
        if entries.is_empty() {
            continue;
        }
        let mut candidates = Vec::with_capacity(entries.len());
        for entry in entries {
            let url = match &entry.image_style {
                StyleRef::UseOriginal => derivatives.original_url(image),
                StyleRef::Style(style) => {
                    let url = derivatives.derivative_url(image, style)?;
                    resolution.used_styles.insert(style.clone());
                    url
                }
            };
            candidates.push(Candidate {
                multiplier: entry.multiplier,
                url,
            });
        }
        resolution.sources.push(Source {
            breakpoint_id: bp.id.clone(),
            media_query: bp.media_query.clone(),
            min_width: bp.min_width(),
            candidates,
        });
    }
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::Breakpoint;
    use crate::test_helpers::{GROUP, mapping_one, test_breakpoints, test_image, url_generator};

    #[test]
    fn sources_follow_ascending_min_width() {
        let res = resolve(
            &mapping_one(),
            &test_breakpoints(),
            &test_image("public"),
            &url_generator(),
        )
        .unwrap();
        let widths: Vec<u32> = res.sources.iter().map(|s| s.min_width).collect();
        assert_eq!(widths, [0, 560, 851]);
        assert_eq!(res.sources[1].media_query, "(min-width: 560px)");
        assert!(res.sources[0].candidates[0].url.contains("/styles/thumbnail/"));
        assert!(res.sources[2].candidates[0].url.contains("/styles/large/"));
    }

    /// Hands groups back in whatever order they were given.
    struct UnsortedCatalog(Vec<Breakpoint>);

    impl BreakpointCatalog for UnsortedCatalog {
        fn group(&self, group: &str) -> Option<Vec<Breakpoint>> {
            (group == GROUP).then(|| self.0.clone())
        }
    }

    #[test]
    fn sources_are_ordered_whatever_the_catalog_returns() {
        let registry = test_breakpoints();
        let mut shuffled = registry.group(GROUP).unwrap();
        shuffled.sort_by_key(|bp| match bp.min_width() {
            851 => 0,
            0 => 1,
            _ => 2,
        });
        let widths: Vec<u32> = shuffled.iter().map(|bp| bp.min_width()).collect();
        assert_eq!(widths, [851, 0, 560]);

        let res = resolve(
            &mapping_one(),
            &UnsortedCatalog(shuffled),
            &test_image("public"),
            &url_generator(),
        )
        .unwrap();
        let widths: Vec<u32> = res.sources.iter().map(|s| s.min_width).collect();
        assert_eq!(widths, [0, 560, 851]);
    }

    #[test]
    fn used_styles_collects_every_derivative() {
        let res = resolve(
            &mapping_one(),
            &test_breakpoints(),
            &test_image("public"),
            &url_generator(),
        )
        .unwrap();
        assert_eq!(
            res.used_styles.into_iter().collect::<Vec<_>>(),
            ["large", "medium", "thumbnail"]
        );
    }

    #[test]
    fn use_original_requests_no_derivative() {
        let mapping = ResponsiveImageMapping::builder("empty", GROUP)
            .add_mapping(format!("{GROUP}.mobile"), "1x", "")
            .add_mapping(format!("{GROUP}.wide"), "1x", "")
            .build()
            .unwrap();
        let res = resolve(
            &mapping,
            &test_breakpoints(),
            &test_image("public"),
            &url_generator(),
        )
        .unwrap();
        assert!(res.used_styles.is_empty());
        assert_eq!(res.sources.len(), 2);
        for source in &res.sources {
            assert_eq!(source.candidates[0].url, "/files/image-test.png");
        }
    }

    #[test]
    fn breakpoints_without_entries_are_omitted() {
        let mapping = ResponsiveImageMapping::builder("partial", GROUP)
            .add_mapping(format!("{GROUP}.narrow"), "1x", "medium")
            .build()
            .unwrap();
        let res = resolve(
            &mapping,
            &test_breakpoints(),
            &test_image("public"),
            &url_generator(),
        )
        .unwrap();
        assert_eq!(res.sources.len(), 1);
        assert_eq!(res.sources[0].breakpoint_id, format!("{GROUP}.narrow"));
    }

    #[test]
    fn unknown_group_resolves_to_nothing() {
        let mapping = ResponsiveImageMapping::builder("lost", "nowhere")
            .add_mapping("nowhere.mobile", "1x", "thumbnail")
            .build()
            .unwrap();
        let res = resolve(
            &mapping,
            &test_breakpoints(),
            &test_image("public"),
            &url_generator(),
        )
        .unwrap();
        assert_eq!(res, Resolution::default());
    }

    #[test]
    fn entries_outside_group_are_skipped() {
        let mapping = ResponsiveImageMapping::builder("stray", GROUP)
            .add_mapping(format!("{GROUP}.tablet"), "1x", "medium")
            .add_mapping(format!("{GROUP}.mobile"), "1x", "thumbnail")
            .build()
            .unwrap();
        let res = resolve(
            &mapping,
            &test_breakpoints(),
            &test_image("public"),
            &url_generator(),
        )
        .unwrap();
        assert_eq!(res.sources.len(), 1);
        assert!(!res.used_styles.contains("medium"));
    }

    #[test]
    fn multipliers_sorted_within_source() {
        let mapping = ResponsiveImageMapping::builder("hd", GROUP)
            .add_mapping(format!("{GROUP}.mobile"), "2x", "medium")
            .add_mapping(format!("{GROUP}.mobile"), "1x", "thumbnail")
            .build()
            .unwrap();
        let res = resolve(
            &mapping,
            &test_breakpoints(),
            &test_image("public"),
            &url_generator(),
        )
        .unwrap();
        let srcset = res.sources[0].srcset();
        let thumb = srcset.find("/styles/thumbnail/").unwrap();
        let medium = srcset.find("/styles/medium/").unwrap();
        assert!(thumb < medium);
        assert!(srcset.ends_with(" 2x"));
    }

    #[test]
    fn unknown_style_propagates() {
        let mapping = ResponsiveImageMapping::builder("bad", GROUP)
            .add_mapping(format!("{GROUP}.mobile"), "1x", "poster")
            .build()
            .unwrap();
        let err = resolve(
            &mapping,
            &test_breakpoints(),
            &test_image("public"),
            &url_generator(),
        )
        .unwrap_err();
        assert!(matches!(err, DerivativeError::UnknownStyle(_)));
    }
}
