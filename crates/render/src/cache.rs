//! Filesystem-backed artifact cache.
//!
//! An artifact for signature `s` lives at `<cache_dir>/<s>.<ext>`. The
//! cache only answers existence queries; artifacts are written directly by
//! the renderer process, which is pointed at the cache path as its output.
//! Entries are never evicted.

use std::path::{Path, PathBuf};

use evalmodel_core::Signature;

use crate::error::CacheIoError;

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
    extension: String,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), CacheIoError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| CacheIoError {
            path: self.dir.clone(),
            source,
        })
    }

    /// Deterministic artifact path for `signature`, whether or not it exists.
    pub fn artifact_path(&self, signature: &Signature) -> PathBuf {
        self.dir
            .join(format!("{}.{}", signature.as_str(), self.extension))
    }

    /// Whether an artifact for `signature` is present, plus its path.
    ///
    /// Only regular files count. Never consults the job table, so a render
    /// that is still writing its output can already show up here.
    pub fn exists(&self, signature: &Signature) -> (bool, PathBuf) {
        let path = self.artifact_path(signature);
        let found = path.is_file();
        (found, path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
