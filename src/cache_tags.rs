//! Cache-invalidation tags attached to rendered output and file responses.
//!
//! A tag names a configuration object the output depends on. Invalidating a
//! mapping or an image style invalidates every response that carried its tag:
//!
//! ```text
//! config:responsive_image.mappings.<mapping id>
//! config:image.style.<style id>
//! ```
//!
//! Tags travel to clients in the [`CACHE_TAGS_HEADER`] header as one
//! space-separated string.

use std::collections::BTreeSet;
use std::fmt;

/// Response header carrying the accumulated tag set.
pub const CACHE_TAGS_HEADER: &str = "X-Cache-Tags";

/// Tag for a responsive image mapping config entity.
pub fn mapping_tag(mapping_id: &str) -> String {
    format!("config:responsive_image.mappings.{mapping_id}")
}

/// Tag for an image style config entity.
pub fn style_tag(style_id: &str) -> String {
    format!("config:image.style.{style_id}")
}

/// An ordered, duplicate-free set of cache tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheTags(BTreeSet<String>);

impl CacheTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>) {
        self.0.insert(tag.into());
    }

    /// Union `other` into `self`.
    pub fn merge(&mut self, other: &CacheTags) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Value for the [`CACHE_TAGS_HEADER`] header.
    pub fn header_value(&self) -> String {
        self.iter().collect::<Vec<_>>().join(" ")
    }
}

impl<S: Into<String>> FromIterator<S> for CacheTags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for CacheTags {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl fmt::Display for CacheTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_formats() {
        assert_eq!(
            mapping_tag("mapping_one"),
            "config:responsive_image.mappings.mapping_one"
        );
        assert_eq!(style_tag("large"), "config:image.style.large");
    }

    #[test]
    fn insert_deduplicates() {
        let mut tags = CacheTags::new();
        tags.insert(style_tag("large"));
        tags.insert(style_tag("large"));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn header_value_is_sorted_and_space_joined() {
        let tags: CacheTags = ["config:image.style.medium", "config:image.style.large"]
            .into_iter()
            .collect();
        assert_eq!(
            tags.header_value(),
            "config:image.style.large config:image.style.medium"
        );
    }

    #[test]
    fn merge_unions_sets() {
        let mut a: CacheTags = ["node:1"].into_iter().collect();
        let b: CacheTags = ["node:1", "config:image.style.large"].into_iter().collect();
        a.merge(&b);
        assert_eq!(a.len(), 2);
        assert!(a.contains("config:image.style.large"));
    }

    #[test]
    fn empty_header_value() {
        assert_eq!(CacheTags::new().header_value(), "");
        assert!(CacheTags::new().is_empty());
    }
}
