//! Persistence for responsive image mappings.
//!
//! [`MappingStore`] is the seam the renderer loads mappings through. Two
//! implementations ship:
//!
//! - [`MemoryMappingStore`]: a locked map, for tests and embedding.
//! - [`TomlMappingStore`]: one TOML file per mapping in a directory, named
//!   after the mapping's config name:
//!
//! ```text
//! config/
//! ├── responsive_image.mappings.mapping_one.toml
//! └── responsive_image.mappings.hero.toml
//! ```
//!
//! ```toml
//! id = "mapping_one"
//! label = "Mapping One"
//! breakpoint_group = "theme"
//!
//! [[mappings]]
//! breakpoint_id = "theme.mobile"
//! multiplier = "1x"
//! image_style = "thumbnail"   # "" serves the original image
//! ```
//!
//! Saving replaces the whole file via write-then-rename, so a concurrent
//! `load` sees either the old or the new mapping.

use crate::mapping::ResponsiveImageMapping;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

const FILE_PREFIX: &str = "responsive_image.mappings.";
const FILE_SUFFIX: &str = ".toml";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("responsive image mapping not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid mapping id: {0:?}")]
    InvalidId(String),
}

/// Load/save access to mappings by id.
pub trait MappingStore: Send + Sync {
    fn load(&self, id: &str) -> Result<ResponsiveImageMapping, StoreError>;

    /// Insert or replace the mapping with the same id.
    fn save(&self, mapping: &ResponsiveImageMapping) -> Result<(), StoreError>;

    /// Ids of every stored mapping, sorted.
    fn ids(&self) -> Result<Vec<String>, StoreError>;
}

/// Mapping ids become file names; keep them to a safe alphabet.
fn validate_id(id: &str) -> Result<(), StoreError> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryMappingStore {
    mappings: RwLock<BTreeMap<String, ResponsiveImageMapping>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MappingStore for MemoryMappingStore {
    fn load(&self, id: &str) -> Result<ResponsiveImageMapping, StoreError> {
        self.mappings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn save(&self, mapping: &ResponsiveImageMapping) -> Result<(), StoreError> {
        validate_id(mapping.id())?;
        self.mappings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(mapping.id().to_string(), mapping.clone());
        Ok(())
    }

    fn ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .mappings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect())
    }
}

/// Directory of `responsive_image.mappings.<id>.toml` files.
#[derive(Debug, Clone)]
pub struct TomlMappingStore {
    dir: PathBuf,
}

impl TomlMappingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}"))
    }
}

impl MappingStore for TomlMappingStore {
    fn load(&self, id: &str) -> Result<ResponsiveImageMapping, StoreError> {
        validate_id(id).map_err(|_| StoreError::NotFound(id.to_string()))?;
        let path = self.path_for(id);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let mapping: ResponsiveImageMapping =
            toml::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?;
        // The file name is the identity; a mismatched id inside is a broken file.
        if mapping.id() != id {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(mapping)
    }

    fn save(&self, mapping: &ResponsiveImageMapping) -> Result<(), StoreError> {
        validate_id(mapping.id())?;
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(mapping.id());
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", mapping.id(), std::process::id()));
        fs::write(&tmp, toml::to_string_pretty(mapping)?)?;
        fs::rename(&tmp, &path)?;
        log::debug!("saved mapping {} to {}", mapping.id(), path.display());
        Ok(())
    }

    fn ids(&self) -> Result<Vec<String>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name
                .strip_prefix(FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
                && validate_id(id).is_ok()
            {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}
