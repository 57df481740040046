//! Content-addressed cache for section indexes.
//!
//! The cache is an explicit handle passed into the pipeline, never a
//! module-level singleton. Indexes are stored as JSON files named by the
//! SHA-256 of the input extraction, so an unchanged document always hits
//! the same file and re-indexing is idempotent. Rebuilds write to a
//! temporary sibling and rename into place so readers never observe a
//! partially written index.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use dsr_model::{ExtractedDocument, SectionIndex};

use crate::error::{IndexError, Result};
use crate::hash::sha256_hex;
use crate::indexer::build_index;

/// Content hash of an extraction, used as the cache key.
///
/// Hashes the canonical JSON serialization, so any changed, added, or
/// reordered block produces a different key.
#[must_use]
pub fn content_hash(doc: &ExtractedDocument) -> String {
    let bytes = serde_json::to_vec(doc).expect("extracted document serializes");
    sha256_hex(&bytes)
}

/// Directory-backed store for section indexes.
#[derive(Debug, Clone)]
pub struct IndexCache {
    dir: PathBuf,
}

impl IndexCache {
    /// Opens (and creates if needed) a cache directory.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::CacheIo`] when the directory cannot be
    /// created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| IndexError::CacheIo {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file path for a content hash.
    #[must_use]
    pub fn path_for(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.json"))
    }

    /// Loads the cached index for a content hash.
    ///
    /// A missing file returns `None`. A corrupt or mismatched file is
    /// recovered by pretending it does not exist, which forces a rebuild.
    #[must_use]
    pub fn load(&self, hash: &str) -> Option<SectionIndex> {
        let path = self.path_for(hash);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<SectionIndex>(&contents) {
            Ok(index) if index.source_hash == hash => Some(index),
            Ok(index) => {
                warn!(
                    path = %path.display(),
                    expected = hash,
                    found = %index.source_hash,
                    "cache entry hash mismatch, forcing rebuild"
                );
                None
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "corrupt index cache, forcing rebuild");
                None
            }
        }
    }

    /// Persists an index under its content hash, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Serialize`] or [`IndexError::CacheIo`].
    pub fn store(&self, index: &SectionIndex) -> Result<PathBuf> {
        let path = self.path_for(&index.source_hash);
        let tmp = self.dir.join(format!("{}.json.tmp", index.source_hash));
        let json = serde_json::to_string_pretty(index)?;
        fs::write(&tmp, json).map_err(|source| IndexError::CacheIo {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| IndexError::CacheIo {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Returns the cached index for `doc` or builds, stores, and returns
    /// a fresh one. The flag reports whether a rebuild happened.
    ///
    /// # Errors
    ///
    /// Propagates indexing and cache-write failures; a corrupt cache
    /// entry is not an error.
    pub fn load_or_build(
        &self,
        doc: &ExtractedDocument,
        force_rebuild: bool,
    ) -> Result<(SectionIndex, bool)> {
        let hash = content_hash(doc);
        if !force_rebuild
            && let Some(index) = self.load(&hash)
        {
            debug!(hash = %hash, "section index cache hit");
            return Ok((index, false));
        }
        let index = build_index(doc, hash)?;
        self.store(&index)?;
        Ok((index, true))
    }
}
