//! Configuration module.
//!
//! Handles loading, validating, and merging `responsive_image.toml`. Stock
//! defaults (including the `thumbnail`, `medium` and `large` styles) are the
//! base layer; the file in the config directory overrides them key by key.
//!
//! ## Config File Location
//!
//! ```text
//! config/
//! ├── responsive_image.toml                        # Site config (this module)
//! ├── responsive_image.mappings.mapping_one.toml   # Stored mappings (see storage)
//! └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [files]
//! public_path = "files"              # On-disk root of public://
//! private_path = "private"           # On-disk root of private://
//! base_url = ""                      # Prefix for generated URLs ("" = root-relative)
//! public_url_path = "/files"         # URL path serving public://
//! private_url_path = "/system/files" # URL path serving private://
//! private_permission = "access content"
//!
//! [derivatives]
//! quality = 90                       # JPEG quality for derivatives (0-100)
//! token_secret = "change-me"         # Mixed into itok tokens; required with require_token
//! require_token = true               # Reject derivative requests without a valid itok
//! cache_dir = ".responsive-image-cache"
//!
//! [processing]
//! max_processes = 4                  # Max parallel workers (omit for auto = CPU cores)
//!
//! [styles.large]
//! label = "Large (480×480)"
//! effects = [{ op = "scale", width = 480, height = 480 }]
//!
//! [breakpoints.theme.narrow]
//! media_query = "(min-width: 560px)"
//! weight = 1
//! multipliers = ["1x", "2x"]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::breakpoint::BreakpointRegistry;
use crate::style::{StyleCatalog, StyleEffect, stock_styles};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of the site config inside the config directory.
pub const CONFIG_FILENAME: &str = "responsive_image.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Complete configuration loaded from `responsive_image.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResponsiveConfig {
    /// Storage roots and URL layout per scheme.
    pub files: FilesConfig,
    /// Derivative encoding, tokens and cache location.
    pub derivatives: DerivativesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Image styles by id.
    pub styles: BTreeMap<String, StyleConfig>,
    /// Breakpoint groups: `breakpoints.<group>.<name>`.
    pub breakpoints: BTreeMap<String, BTreeMap<String, BreakpointConfig>>,
}

impl Default for ResponsiveConfig {
    fn default() -> Self {
        Self {
            files: FilesConfig::default(),
            derivatives: DerivativesConfig::default(),
            processing: ProcessingConfig::default(),
            styles: stock_styles(),
            breakpoints: BTreeMap::new(),
        }
    }
}

impl ResponsiveConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.derivatives.quality > 100 {
            return Err(ConfigError::Validation(
                "derivatives.quality must be 0-100".into(),
            ));
        }
        if self.derivatives.require_token && self.derivatives.token_secret.trim().is_empty() {
            return Err(ConfigError::Validation(
                "derivatives.token_secret must be set when require_token is on".into(),
            ));
        }
        if self.files.public_path.is_empty() || self.files.private_path.is_empty() {
            return Err(ConfigError::Validation(
                "files.public_path and files.private_path must not be empty".into(),
            ));
        }
        for (key, path) in [
            ("public_url_path", &self.files.public_url_path),
            ("private_url_path", &self.files.private_url_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "files.{key} must start with '/'"
                )));
            }
        }
        if self.files.public_url_path == self.files.private_url_path {
            return Err(ConfigError::Validation(
                "files.public_url_path and files.private_url_path must differ".into(),
            ));
        }
        for (id, style) in &self.styles {
            validate_style(id, style)?;
        }
        for (group, entries) in &self.breakpoints {
            for (name, bp) in entries {
                if bp.media_query.trim().is_empty() {
                    return Err(ConfigError::Validation(format!(
                        "breakpoints.{group}.{name}.media_query must not be empty"
                    )));
                }
            }
        }
        self.breakpoint_registry()?;
        Ok(())
    }

    pub fn style_catalog(&self) -> StyleCatalog {
        StyleCatalog::from_config(&self.styles)
    }

    pub fn breakpoint_registry(&self) -> Result<BreakpointRegistry, ConfigError> {
        BreakpointRegistry::from_config(&self.breakpoints)
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }
}

fn validate_style(id: &str, style: &StyleConfig) -> Result<(), ConfigError> {
    if id.is_empty() || id.contains(['/', '\\', '.']) {
        return Err(ConfigError::Validation(format!(
            "style id {id:?} must be non-empty and contain no '/', '\\' or '.'"
        )));
    }
    for effect in &style.effects {
        let zero = match *effect {
            StyleEffect::Scale { width, height, .. } => width == Some(0) || height == Some(0),
            _ => effect.fixed_box().is_some_and(|(w, h)| w == 0 || h == 0),
        };
        if zero {
            return Err(ConfigError::Validation(format!(
                "styles.{id}: effect dimensions must be non-zero"
            )));
        }
    }
    Ok(())
}

/// Storage roots and URL layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    /// Directory holding `public://` files.
    pub public_path: String,
    /// Directory holding `private://` files.
    pub private_path: String,
    /// Scheme and host prepended to every URL, without a trailing slash.
    pub base_url: String,
    /// URL path under which `public://` files are served.
    pub public_url_path: String,
    /// URL path under which `private://` files are served.
    pub private_url_path: String,
    /// Permission an account needs to read `private://` files.
    pub private_permission: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            public_path: "files".to_string(),
            private_path: "private".to_string(),
            base_url: String::new(),
            public_url_path: "/files".to_string(),
            private_url_path: "/system/files".to_string(),
            private_permission: "access content".to_string(),
        }
    }
}

/// Derivative generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivativesConfig {
    /// Lossy encoding quality (0 = worst, 100 = best).
    pub quality: u32,
    /// Secret mixed into derivative URL tokens.
    pub token_secret: String,
    /// Whether derivative requests must carry a valid `itok`.
    pub require_token: bool,
    /// Directory for the derivative cache manifest.
    pub cache_dir: String,
}

impl Default for DerivativesConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            token_secret: String::new(),
            require_token: true,
            cache_dir: ".responsive-image-cache".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel derivative workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// An image style as written in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub effects: Vec<StyleEffect>,
}

/// A breakpoint as written in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakpointConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub media_query: String,
    #[serde(default)]
    pub weight: i32,
    #[serde(default = "default_multipliers")]
    pub multipliers: Vec<String>,
}

fn default_multipliers() -> Vec<String> {
    vec!["1x".to_string()]
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ResponsiveConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut merged), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                let next = match merged.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            toml::Value::Table(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Load `responsive_image.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let path = dir.join(CONFIG_FILENAME);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ResponsiveConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ResponsiveConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `dir`, falling back to stock defaults when absent.
pub fn load_config(dir: &Path) -> Result<ResponsiveConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// A documented stock config file, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r#"# responsive-image configuration
# Place this file at <config-dir>/responsive_image.toml.
# All options are optional; values shown are the defaults.
# Unknown keys will cause an error.

[files]
# On-disk roots for each storage scheme.
public_path = "files"
private_path = "private"
# Prepended to every generated URL, e.g. "https://example.com".
base_url = ""
# URL paths serving each scheme. Derivatives live below <path>/styles/.
public_url_path = "/files"
private_url_path = "/system/files"
# Permission required to read private:// files and their derivatives.
private_permission = "access content"

[derivatives]
# Encoding quality for lossy derivatives (0-100).
quality = 90
# Secret mixed into the itok query token of derivative URLs. Required while
# require_token is on: an empty secret lets anyone compute valid tokens.
token_secret = ""
# Reject derivative requests whose itok is missing or wrong.
require_token = true
# Where the derivative cache manifest is kept.
cache_dir = ".responsive-image-cache"

[processing]
# Maximum parallel derivative workers (omit for one per CPU core).
# max_processes = 4

# Image styles. Effects run in order:
#   { op = "scale", width = W, height = H, upscale = false }  fit inside box
#   { op = "scale_and_crop", width = W, height = H }          cover, center-crop
#   { op = "resize", width = W, height = H }                  exact size
[styles.large]
label = "Large (480×480)"
effects = [{ op = "scale", width = 480, height = 480 }]

[styles.medium]
label = "Medium (220×220)"
effects = [{ op = "scale", width = 220, height = 220 }]

[styles.thumbnail]
label = "Thumbnail (100×100)"
effects = [{ op = "scale", width = 100, height = 100 }]

# Breakpoint groups. Ids are "<group>.<name>"; sources render in
# ascending min-width order regardless of declaration order.
# [breakpoints.theme.mobile]
# media_query = "(min-width: 0px)"
# weight = 0
# multipliers = ["1x"]
#
# [breakpoints.theme.narrow]
# media_query = "(min-width: 560px)"
# weight = 1
# multipliers = ["1x", "2x"]
"#
}
