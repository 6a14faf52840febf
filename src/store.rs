//! On-disk derivative generation.
//!
//! Derivatives live next to the originals of their scheme, under
//! `styles/<style>/<scheme>/<target>`:
//!
//! ```text
//! files/                                  ← [files] public_path
//! ├── image-test.png
//! └── styles/
//!     ├── large/public/image-test.png
//!     └── thumbnail/public/image-test.png
//! private/                                ← [files] private_path
//! └── styles/large/private/image-test.png
//! ```
//!
//! [`DerivativeStore::ensure`] is idempotent and safe to call from many
//! threads at once for the same `(style, image)`:
//!
//! 1. A per-derivative lock serializes generation of one output path. Its
//!    table entry is dropped when the last caller for that path leaves.
//! 2. Under the lock, the cache manifest is consulted; a fresh entry with the
//!    file on disk is a hit and nothing is written.
//! 3. Otherwise the backend writes to a hidden temp file in the target
//!    directory, which is renamed over the final path. Readers never see a
//!    partially written derivative.

use crate::cache::{CacheStats, DerivativeManifest, hash_file};
use crate::config::{FilesConfig, ResponsiveConfig};
use crate::derivative::{DerivativeError, derivative_relative_path};
use crate::file::{FileUri, StorageScheme};
use crate::imaging::{ImageBackend, Quality, create_derivative, get_dimensions};
use crate::style::{ImageStyle, StyleCatalog};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use walkdir::WalkDir;

/// A derivative present on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivative {
    /// e.g. `public://styles/large/public/image-test.png`
    pub uri: String,
    pub path: PathBuf,
    /// False when the existing file was reused.
    pub generated: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct DerivativeStore<B: ImageBackend> {
    backend: B,
    files: FilesConfig,
    styles: StyleCatalog,
    quality: Quality,
    cache_dir: PathBuf,
    manifest: Mutex<DerivativeManifest>,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
    stats: Mutex<CacheStats>,
    tmp_counter: AtomicU64,
}

impl<B: ImageBackend> DerivativeStore<B> {
    pub fn new(
        backend: B,
        files: FilesConfig,
        styles: StyleCatalog,
        quality: Quality,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        let cache_dir = cache_dir.into();
        let manifest = DerivativeManifest::load(&cache_dir);
        Self {
            backend,
            files,
            styles,
            quality,
            cache_dir,
            manifest: Mutex::new(manifest),
            locks: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
            tmp_counter: AtomicU64::new(0),
        }
    }

    pub fn from_config(backend: B, config: &ResponsiveConfig) -> Self {
        Self::new(
            backend,
            config.files.clone(),
            config.style_catalog(),
            Quality::new(config.derivatives.quality),
            &config.derivatives.cache_dir,
        )
    }

    pub fn styles(&self) -> &StyleCatalog {
        &self.styles
    }

    pub fn stats(&self) -> CacheStats {
        *lock(&self.stats)
    }

    /// Directory holding the originals of `scheme`.
    pub fn scheme_root(&self, scheme: StorageScheme) -> &Path {
        Path::new(match scheme {
            StorageScheme::Public => &self.files.public_path,
            StorageScheme::Private => &self.files.private_path,
        })
    }

    pub fn source_path(&self, uri: &FileUri) -> PathBuf {
        self.scheme_root(uri.scheme()).join(uri.target())
    }

    pub fn derivative_path(&self, style: &str, uri: &FileUri) -> PathBuf {
        self.scheme_root(uri.scheme())
            .join(derivative_relative_path(style, uri))
    }

    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        lock(&self.locks)
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }

    /// Drop the table entry for `path` once no other caller holds or waits on
    /// it. Clones are only handed out under the table lock, so the count
    /// cannot rise while it is held here.
    fn release_path_lock(&self, path: &Path, path_lock: Arc<Mutex<()>>) {
        let mut locks = lock(&self.locks);
        // One reference in the table, one here.
        if Arc::strong_count(&path_lock) == 2 {
            locks.remove(path);
        }
    }

    fn temp_path(&self, output: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        output.with_file_name(format!(".tmp-{}-{n}-{name}", std::process::id()))
    }

    /// Make sure the `style` derivative of `uri` exists and is current.
    pub fn ensure(&self, style_id: &str, uri: &FileUri) -> Result<Derivative, DerivativeError> {
        let style = self
            .styles
            .get(style_id)
            .ok_or_else(|| DerivativeError::UnknownStyle(style_id.to_string()))?;
        let source = self.source_path(uri);
        if !source.is_file() {
            return Err(DerivativeError::SourceNotFound(uri.clone()));
        }
        let output = self.derivative_path(style_id, uri);
        let key = format!("{}://{}", uri.scheme(), derivative_relative_path(style_id, uri));

        let path_lock = self.path_lock(&output);
        let result = {
            let _guard = lock(&path_lock);
            self.ensure_locked(style, &source, &output, key)
        };
        self.release_path_lock(&output, path_lock);
        result
    }

    /// Generate or reuse one derivative. The caller holds its path lock.
    fn ensure_locked(
        &self,
        style: &ImageStyle,
        source: &Path,
        output: &Path,
        key: String,
    ) -> Result<Derivative, DerivativeError> {
        let source_hash = hash_file(source)?;
        let params_hash = style.params_hash(self.quality);
        if lock(&self.manifest).is_fresh(&key, &source_hash, &params_hash, output) {
            log::debug!("derivative {key} is current");
            lock(&self.stats).hit();
            return Ok(Derivative {
                uri: key,
                path: output.to_path_buf(),
                generated: false,
            });
        }

        let dims = get_dimensions(&self.backend, source)?;
        let ops = style.plan(dims);
        let tmp = self.temp_path(output);
        if let Err(e) = create_derivative(&self.backend, source, &tmp, ops, self.quality) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, output) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        lock(&self.manifest).insert(key.clone(), source_hash, params_hash);
        lock(&self.stats).miss();
        log::info!("generated {key}");
        Ok(Derivative {
            uri: key,
            path: output.to_path_buf(),
            generated: true,
        })
    }

    /// [`ensure`](Self::ensure) every `(style, uri)` job on the rayon pool.
    ///
    /// Results come back in job order.
    pub fn ensure_many(
        &self,
        jobs: &[(String, FileUri)],
    ) -> Vec<Result<Derivative, DerivativeError>> {
        jobs.par_iter()
            .map(|(style, uri)| self.ensure(style, uri))
            .collect()
    }

    /// Delete every derivative of `style` in both schemes. Returns the
    /// number of files removed.
    pub fn flush_style(&self, style: &str) -> Result<usize, DerivativeError> {
        let mut removed = 0;
        for scheme in StorageScheme::ALL {
            let dir = self.scheme_root(scheme).join("styles").join(style);
            if !dir.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&dir) {
                let entry = entry.map_err(std::io::Error::from)?;
                if entry.file_type().is_file() {
                    removed += 1;
                }
            }
            fs::remove_dir_all(&dir)?;
        }
        let forgotten = lock(&self.manifest).remove_style(style);
        log::info!("flushed style {style}: {removed} files, {forgotten} cache entries");
        Ok(removed)
    }

    /// Write the cache manifest to the cache directory.
    pub fn persist(&self) -> std::io::Result<()> {
        lock(&self.manifest).save(&self.cache_dir)
    }
}
