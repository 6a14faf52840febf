//! Responsive image mappings.
//!
//! A mapping ties a breakpoint group to image styles: for every
//! `(breakpoint, multiplier)` pair it names the style to serve, or
//! [`StyleRef::UseOriginal`] to serve the untouched file.
//!
//! Mappings are immutable once built. Edits go through [`MappingBuilder`]
//! (usually via [`ResponsiveImageMapping::to_builder`]) and produce a new
//! value, so a mapping shared with concurrent renders never changes under
//! them.
//!
//! ```
//! # use responsive_image::mapping::ResponsiveImageMapping;
//! let mapping = ResponsiveImageMapping::builder("mapping_one", "theme")
//!     .label("Mapping One")
//!     .add_mapping("theme.mobile", "1x", "thumbnail")
//!     .add_mapping("theme.wide", "1x", "large")
//!     .build()
//!     .unwrap();
//! assert_eq!(mapping.entries().len(), 2);
//! ```

use crate::breakpoint::{BreakpointCatalog, Multiplier, MultiplierError};
use crate::cache_tags;
use crate::style::{StyleCatalog, StyleRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("mapping field `{0}` must not be empty")]
    MissingField(&'static str),
    #[error("duplicate mapping for breakpoint {breakpoint_id} at {multiplier}")]
    DuplicateKey {
        breakpoint_id: String,
        multiplier: Multiplier,
    },
    #[error(transparent)]
    Multiplier(#[from] MultiplierError),
}

/// Identifies one slot of a mapping: a breakpoint at a pixel density.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappingKey {
    pub breakpoint_id: String,
    pub multiplier: Multiplier,
}

impl MappingKey {
    pub fn new(breakpoint_id: impl Into<String>, multiplier: Multiplier) -> Self {
        Self {
            breakpoint_id: breakpoint_id.into(),
            multiplier,
        }
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.breakpoint_id, self.multiplier)
    }
}

/// One row of a mapping, in the shape it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingEntry {
    pub breakpoint_id: String,
    pub multiplier: Multiplier,
    /// Empty string in storage means "use the original image".
    pub image_style: StyleRef,
}

impl MappingEntry {
    pub fn key(&self) -> MappingKey {
        MappingKey::new(self.breakpoint_id.clone(), self.multiplier)
    }
}

/// An immutable breakpoint-group-to-styles mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MappingBuilder", into = "MappingBuilder")]
pub struct ResponsiveImageMapping {
    id: String,
    label: String,
    breakpoint_group: String,
    entries: Vec<MappingEntry>,
}

impl ResponsiveImageMapping {
    pub fn builder(id: impl Into<String>, breakpoint_group: impl Into<String>) -> MappingBuilder {
        MappingBuilder::new(id, breakpoint_group)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn breakpoint_group(&self) -> &str {
        &self.breakpoint_group
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn has_mappings(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Entries for one breakpoint, lowest multiplier first.
    pub fn entries_for(&self, breakpoint_id: &str) -> Vec<&MappingEntry> {
        let mut found: Vec<&MappingEntry> = self
            .entries
            .iter()
            .filter(|e| e.breakpoint_id == breakpoint_id)
            .collect();
        found.sort_by_key(|e| e.multiplier);
        found
    }

    pub fn style_for(&self, key: &MappingKey) -> Option<&StyleRef> {
        self.entries
            .iter()
            .find(|e| e.breakpoint_id == key.breakpoint_id && e.multiplier == key.multiplier)
            .map(|e| &e.image_style)
    }

    /// Config object name, also the storage file stem.
    pub fn config_name(&self) -> String {
        format!("responsive_image.mappings.{}", self.id)
    }

    pub fn cache_tag(&self) -> String {
        cache_tags::mapping_tag(&self.id)
    }

    /// Image styles this mapping refers to; deleting one breaks the mapping.
    pub fn style_dependencies(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .filter_map(|e| e.image_style.style_id())
            .collect()
    }

    /// Start an edit from this mapping's current state.
    pub fn to_builder(&self) -> MappingBuilder {
        MappingBuilder {
            id: self.id.clone(),
            label: self.label.clone(),
            breakpoint_group: self.breakpoint_group.clone(),
            mappings: self.entries.clone(),
            pending: Vec::new(),
        }
    }
}

/// Accumulates entries, validating everything at [`build`](Self::build).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingBuilder {
    id: String,
    #[serde(default)]
    label: String,
    breakpoint_group: String,
    #[serde(default)]
    mappings: Vec<MappingEntry>,
    /// Raw (breakpoint, multiplier) pairs that failed to parse, reported at build.
    #[serde(skip)]
    pending: Vec<MappingError>,
}

impl MappingBuilder {
    pub fn new(id: impl Into<String>, breakpoint_group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            breakpoint_group: breakpoint_group.into(),
            mappings: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Map a breakpoint at `multiplier` (e.g. `"1x"`) to a style; `""` maps
    /// to the original image.
    pub fn add_mapping(
        mut self,
        breakpoint_id: impl Into<String>,
        multiplier: &str,
        style: impl Into<StyleRef>,
    ) -> Self {
        match multiplier.parse::<Multiplier>() {
            Ok(m) => self.mappings.push(MappingEntry {
                breakpoint_id: breakpoint_id.into(),
                multiplier: m,
                image_style: style.into(),
            }),
            Err(e) => self.pending.push(e.into()),
        }
        self
    }

    /// Typed variant of [`add_mapping`](Self::add_mapping).
    pub fn add_entry(mut self, key: MappingKey, style: StyleRef) -> Self {
        self.mappings.push(MappingEntry {
            breakpoint_id: key.breakpoint_id,
            multiplier: key.multiplier,
            image_style: style,
        });
        self
    }

    /// Replace the style of an existing key, or add it.
    pub fn set_mapping(mut self, key: MappingKey, style: StyleRef) -> Self {
        if let Some(entry) = self
            .mappings
            .iter_mut()
            .find(|e| e.breakpoint_id == key.breakpoint_id && e.multiplier == key.multiplier)
        {
            entry.image_style = style;
            return self;
        }
        self.add_entry(key, style)
    }

    pub fn build(self) -> Result<ResponsiveImageMapping, MappingError> {
        if let Some(err) = self.pending.into_iter().next() {
            return Err(err);
        }
        if self.id.trim().is_empty() {
            return Err(MappingError::MissingField("id"));
        }
        if self.breakpoint_group.trim().is_empty() {
            return Err(MappingError::MissingField("breakpoint_group"));
        }
        let mut seen = HashSet::new();
        for entry in &self.mappings {
            if !seen.insert(entry.key()) {
                return Err(MappingError::DuplicateKey {
                    breakpoint_id: entry.breakpoint_id.clone(),
                    multiplier: entry.multiplier,
                });
            }
        }
        let label = if self.label.is_empty() {
            self.id.clone()
        } else {
            self.label
        };
        Ok(ResponsiveImageMapping {
            id: self.id,
            label,
            breakpoint_group: self.breakpoint_group,
            entries: self.mappings,
        })
    }
}

impl TryFrom<MappingBuilder> for ResponsiveImageMapping {
    type Error = MappingError;

    fn try_from(builder: MappingBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

impl From<ResponsiveImageMapping> for MappingBuilder {
    fn from(mapping: ResponsiveImageMapping) -> Self {
        mapping.to_builder()
    }
}

/// A configuration problem that rendering silently tolerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingIssue {
    UnknownGroup(String),
    UnknownBreakpoint(String),
    UnknownStyle { key: MappingKey, style: String },
    UndeclaredMultiplier(MappingKey),
}

impl fmt::Display for MappingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingIssue::UnknownGroup(group) => {
                write!(f, "breakpoint group '{group}' does not exist; renders fall back to the fallback image only")
            }
            MappingIssue::UnknownBreakpoint(id) => {
                write!(f, "breakpoint '{id}' is not in the group; its entries are skipped")
            }
            MappingIssue::UnknownStyle { key, style } => {
                write!(f, "{key} uses unknown image style '{style}'")
            }
            MappingIssue::UndeclaredMultiplier(key) => {
                write!(f, "{key} uses a multiplier the breakpoint does not declare")
            }
        }
    }
}

/// Report entries that rendering would skip or fail on.
pub fn lint(
    mapping: &ResponsiveImageMapping,
    catalog: &dyn BreakpointCatalog,
    styles: &StyleCatalog,
) -> Vec<MappingIssue> {
    let mut issues = Vec::new();
    let breakpoints = catalog.group(mapping.breakpoint_group());
    if breakpoints.is_none() {
        issues.push(MappingIssue::UnknownGroup(
            mapping.breakpoint_group().to_string(),
        ));
    }
    let mut reported = BTreeSet::new();
    for entry in mapping.entries() {
        if let Some(group) = &breakpoints {
            match group.iter().find(|bp| bp.id == entry.breakpoint_id) {
                None => {
                    if reported.insert(entry.breakpoint_id.clone()) {
                        issues.push(MappingIssue::UnknownBreakpoint(entry.breakpoint_id.clone()));
                    }
                }
                Some(bp) if !bp.supports(entry.multiplier) => {
                    issues.push(MappingIssue::UndeclaredMultiplier(entry.key()));
                }
                Some(_) => {}
            }
        }
        if let StyleRef::Style(style) = &entry.image_style
            && !styles.contains(style)
        {
            issues.push(MappingIssue::UnknownStyle {
                key: entry.key(),
                style: style.clone(),
            });
        }
    }
    issues
}
