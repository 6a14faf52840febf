//! Derivative cache manifest.
//!
//! Generating a derivative means decoding, resampling and re-encoding the
//! source. The manifest lets [`DerivativeStore`](crate::store::DerivativeStore)
//! skip that when the derivative on disk is still current.
//!
//! ## Cache keys
//!
//! Entries are keyed by derivative URI, e.g.
//! `public://styles/large/public/photos/dawn.png`, and record two hashes:
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives copies and checkouts.
//! - **`params_hash`**: [`ImageStyle::params_hash`](crate::style::ImageStyle::params_hash)
//!   of the style and quality that produced the file. Editing a style's
//!   effects or the configured quality changes it.
//!
//! A cache hit requires a matching entry **and** the derivative file still
//! on disk.
//!
//! ## Storage
//!
//! The manifest is JSON at `<cache_dir>/derivative-manifest.json`. A missing,
//! corrupt or older-version manifest loads as empty, which only costs
//! regeneration.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

const MANIFEST_FILENAME: &str = "derivative-manifest.json";

/// Bump to invalidate every existing manifest when the key scheme changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// Derivative URI → hashes of what produced it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DerivativeManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
}

impl DerivativeManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from `cache_dir`, or an empty manifest if absent or unreadable.
    pub fn load(cache_dir: &Path) -> Self {
        let path = manifest_path(cache_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            Ok(_) => {
                log::info!("derivative manifest version changed; starting empty");
                Self::empty()
            }
            Err(e) => {
                log::warn!("ignoring corrupt derivative manifest {}: {e}", path.display());
                Self::empty()
            }
        }
    }

    pub fn save(&self, cache_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(cache_dir)?;
        let path = manifest_path(cache_dir);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(tmp, path)
    }

    /// Whether `key` was produced from these hashes and `file` still exists.
    pub fn is_fresh(&self, key: &str, source_hash: &str, params_hash: &str, file: &Path) -> bool {
        self.entries.get(key).is_some_and(|entry| {
            entry.source_hash == source_hash && entry.params_hash == params_hash
        }) && file.exists()
    }

    pub fn insert(&mut self, key: String, source_hash: String, params_hash: String) {
        self.entries.insert(
            key,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }

    /// Forget every derivative of `style`. Returns how many were dropped.
    pub fn remove_style(&mut self, style: &str) -> usize {
        let marker = format!("://styles/{style}/");
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.contains(&marker));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SHA-256 of a file's contents as lowercase hex.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

pub fn manifest_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(MANIFEST_FILENAME)
}

/// Hit/miss counts for a batch of derivative requests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.misses)
        }
    }
}
