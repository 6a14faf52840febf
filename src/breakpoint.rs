//! Breakpoints: named viewport thresholds grouped for responsive images.
//!
//! Breakpoints are declared in config under a group, and addressed by the
//! fully-qualified id `<group>.<name>`:
//!
//! ```toml
//! [breakpoints.theme.mobile]
//! media_query = "(min-width: 0px)"
//! multipliers = ["1x"]
//!
//! [breakpoints.theme.wide]
//! media_query = "(min-width: 851px)"
//! multipliers = ["1x", "2x"]
//! ```
//!
//! A group is always returned in cascade order: ascending `min-width`, with a
//! zero-width (mobile-first default) breakpoint first. `<picture>` source
//! selection depends on this order.

use crate::config::BreakpointConfig;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid resolution multiplier {0:?} (expected e.g. \"1x\", \"1.5x\")")]
pub struct MultiplierError(pub String);

/// Pixel-density multiplier such as `1x` or `1.5x`.
///
/// Stored in thousandths so it orders and hashes exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Multiplier(u32);

impl Multiplier {
    pub const ONE: Multiplier = Multiplier(1000);

    pub fn per_mille(self) -> u32 {
        self.0
    }
}

impl FromStr for Multiplier {
    type Err = MultiplierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MultiplierError(s.to_string());
        let number = s.trim().strip_suffix('x').ok_or_else(err)?;
        let value: f64 = number.parse().map_err(|_| err())?;
        if !value.is_finite() || value <= 0.0 {
            return Err(err());
        }
        let per_mille = (value * 1000.0).round();
        if per_mille < 1.0 || per_mille > u32::MAX as f64 {
            return Err(err());
        }
        Ok(Multiplier(per_mille as u32))
    }
}

impl TryFrom<String> for Multiplier {
    type Error = MultiplierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Multiplier> for String {
    fn from(value: Multiplier) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 1000;
        let frac = self.0 % 1000;
        if frac == 0 {
            write!(f, "{whole}x")
        } else {
            let digits = format!("{frac:03}");
            write!(f, "{whole}.{}x", digits.trim_end_matches('0'))
        }
    }
}

/// A named viewport threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    /// Fully-qualified id: `<group>.<name>`.
    pub id: String,
    pub label: String,
    pub group: String,
    pub media_query: String,
    pub weight: i32,
    pub multipliers: Vec<Multiplier>,
}

impl Breakpoint {
    /// Lower viewport bound in CSS pixels, parsed from the media query.
    pub fn min_width(&self) -> u32 {
        parse_min_width(&self.media_query)
    }

    pub fn supports(&self, multiplier: Multiplier) -> bool {
        self.multipliers.contains(&multiplier)
    }
}

/// Extract the first `min-width` bound from a media query.
///
/// `px` values are taken as-is, `em`/`rem` at 16px each. A query with no
/// `min-width` (or one that doesn't parse) counts as 0: it applies from the
/// narrowest viewport up.
pub fn parse_min_width(media_query: &str) -> u32 {
    let lower = media_query.to_ascii_lowercase();
    let Some(pos) = lower.find("min-width") else {
        return 0;
    };
    let rest = lower[pos + "min-width".len()..]
        .trim_start()
        .trim_start_matches(':')
        .trim_start();
    let number_len = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let Ok(value) = rest[..number_len].parse::<f64>() else {
        return 0;
    };
    let unit = rest[number_len..].trim_start();
    let px = if unit.starts_with("em") || unit.starts_with("rem") {
        value * 16.0
    } else {
        value
    };
    px.round() as u32
}

/// Cascade order: ascending min-width, then weight, then id.
pub fn cascade_order(a: &Breakpoint, b: &Breakpoint) -> Ordering {
    a.min_width()
        .cmp(&b.min_width())
        .then(a.weight.cmp(&b.weight))
        .then_with(|| a.id.cmp(&b.id))
}

/// Read-only source of breakpoint groups.
pub trait BreakpointCatalog: Sync {
    /// All breakpoints of `group` in cascade order, or `None` for an unknown group.
    fn group(&self, group: &str) -> Option<Vec<Breakpoint>>;
}

/// Breakpoint groups held in memory, usually built from config.
#[derive(Debug, Clone, Default)]
pub struct BreakpointRegistry {
    groups: BTreeMap<String, Vec<Breakpoint>>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every group declared under `[breakpoints.<group>.<name>]`.
    pub fn from_config(
        config: &BTreeMap<String, BTreeMap<String, BreakpointConfig>>,
    ) -> Result<Self, MultiplierError> {
        let mut registry = Self::new();
        for (group, entries) in config {
            let mut breakpoints = Vec::with_capacity(entries.len());
            for (name, bp) in entries {
                let multipliers = bp
                    .multipliers
                    .iter()
                    .map(|m| m.parse())
                    .collect::<Result<Vec<Multiplier>, _>>()?;
                breakpoints.push(Breakpoint {
                    id: format!("{group}.{name}"),
                    label: bp.label.clone().unwrap_or_else(|| name.clone()),
                    group: group.clone(),
                    media_query: bp.media_query.clone(),
                    weight: bp.weight,
                    multipliers,
                });
            }
            registry.insert_group(group, breakpoints);
        }
        Ok(registry)
    }

    /// Add or replace a group. Breakpoints are stored in cascade order.
    pub fn insert_group(&mut self, group: &str, mut breakpoints: Vec<Breakpoint>) {
        breakpoints.sort_by(cascade_order);
        self.groups.insert(group.to_string(), breakpoints);
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

impl BreakpointCatalog for BreakpointRegistry {
    fn group(&self, group: &str) -> Option<Vec<Breakpoint>> {
        self.groups.get(group).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bp(group: &str, name: &str, query: &str, weight: i32) -> Breakpoint {
        Breakpoint {
            id: format!("{group}.{name}"),
            label: name.to_string(),
            group: group.to_string(),
            media_query: query.to_string(),
            weight,
            multipliers: vec![Multiplier::ONE],
        }
    }

    #[test]
    fn multiplier_parses_and_displays_canonically() {
        let m: Multiplier = "1.5x".parse().unwrap();
        assert_eq!(m.per_mille(), 1500);
        assert_eq!(m.to_string(), "1.5x");
        assert_eq!("2.0x".parse::<Multiplier>().unwrap().to_string(), "2x");
        assert_eq!("1x".parse::<Multiplier>().unwrap(), Multiplier::ONE);
        assert_eq!("1.25x".parse::<Multiplier>().unwrap().to_string(), "1.25x");
    }

    #[test]
    fn multiplier_rejects_garbage() {
        for bad in ["", "x", "1", "0x", "-1x", "abcx", "NaNx"] {
            assert!(bad.parse::<Multiplier>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn multiplier_orders_numerically() {
        let mut ms: Vec<Multiplier> = ["2x", "1x", "1.5x"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        ms.sort();
        let shown: Vec<String> = ms.iter().map(|m| m.to_string()).collect();
        assert_eq!(shown, ["1x", "1.5x", "2x"]);
    }

    #[test]
    fn min_width_from_px_query() {
        assert_eq!(parse_min_width("(min-width: 560px)"), 560);
        assert_eq!(parse_min_width("all and (min-width:851px)"), 851);
        assert_eq!(parse_min_width("(min-width: 0px)"), 0);
    }

    #[test]
    fn min_width_from_em_query() {
        assert_eq!(parse_min_width("(min-width: 40em)"), 640);
    }

    #[test]
    fn min_width_missing_is_zero() {
        assert_eq!(parse_min_width("(orientation: landscape)"), 0);
        assert_eq!(parse_min_width(""), 0);
        assert_eq!(parse_min_width("(min-width: wide)"), 0);
    }

    #[test]
    fn registry_sorts_by_min_width_regardless_of_declaration_order() {
        let mut registry = BreakpointRegistry::new();
        registry.insert_group(
            "g",
            vec![
                bp("g", "wide", "(min-width: 851px)", 0),
                bp("g", "mobile", "(min-width: 0px)", 2),
                bp("g", "narrow", "(min-width: 560px)", 1),
            ],
        );
        let ids: Vec<String> = registry.group("g").unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, ["g.mobile", "g.narrow", "g.wide"]);
    }

    #[test]
    fn registry_breaks_width_ties_by_weight() {
        let mut registry = BreakpointRegistry::new();
        registry.insert_group(
            "g",
            vec![
                bp("g", "b", "(min-width: 500px)", 5),
                bp("g", "a", "(min-width: 500px)", 1),
            ],
        );
        let ids: Vec<String> = registry.group("g").unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, ["g.a", "g.b"]);
    }

    #[test]
    fn unknown_group_is_none() {
        assert!(BreakpointRegistry::new().group("missing").is_none());
    }

    #[test]
    fn from_config_qualifies_ids_and_parses_multipliers() {
        let mut group = BTreeMap::new();
        group.insert(
            "wide".to_string(),
            BreakpointConfig {
                label: None,
                media_query: "(min-width: 851px)".into(),
                weight: 2,
                multipliers: vec!["1x".into(), "2x".into()],
            },
        );
        let mut config = BTreeMap::new();
        config.insert("theme".to_string(), group);

        let registry = BreakpointRegistry::from_config(&config).unwrap();
        let wide = &registry.group("theme").unwrap()[0];
        assert_eq!(wide.id, "theme.wide");
        assert_eq!(wide.label, "wide");
        assert_eq!(wide.min_width(), 851);
        assert!(wide.supports("2x".parse().unwrap()));
    }

    #[test]
    fn from_config_rejects_bad_multiplier() {
        let mut group = BTreeMap::new();
        group.insert(
            "x".to_string(),
            BreakpointConfig {
                label: None,
                media_query: "(min-width: 1px)".into(),
                weight: 0,
                multipliers: vec!["double".into()],
            },
        );
        let mut config = BTreeMap::new();
        config.insert("g".to_string(), group);
        assert_eq!(
            BreakpointRegistry::from_config(&config).unwrap_err(),
            MultiplierError("double".into())
        );
    }
}
