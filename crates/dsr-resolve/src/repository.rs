//! Side-channel cache for synthesized field text.
//!
//! Completions are expensive and rate-limited, so finished synthesis
//! output is persisted keyed by `(field_id, bundle content hash)`. An
//! unchanged source bundle for the same field skips the service call on
//! the next run. The cache is advisory: it never holds authoritative
//! state and deleting it only costs re-synthesis.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use tracing::debug;

/// Hex SHA-256 of a source bundle, the second half of the cache key.
#[must_use]
pub fn bundle_hash(bundle: &str) -> String {
    hex::encode(sha2::Sha256::digest(bundle.as_bytes()))
}

/// One cached completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedSynthesis {
    field_id: String,
    bundle_hash: String,
    text: String,
    saved_at: String,
}

/// Directory-backed store for synthesized completions.
#[derive(Debug, Clone)]
pub struct SynthesisCache {
    base_dir: PathBuf,
}

impl SynthesisCache {
    /// Opens (and creates if needed) a cache directory.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).with_context(|| {
            format!("failed to create synthesis cache: {}", base_dir.display())
        })?;
        Ok(Self { base_dir })
    }

    /// The cache directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Looks up a completion for the field and bundle hash.
    #[must_use]
    pub fn load(&self, field_id: &str, bundle_hash: &str) -> Option<String> {
        let path = self.entry_path(field_id, bundle_hash);
        let contents = fs::read_to_string(&path).ok()?;
        let entry: CachedSynthesis = serde_json::from_str(&contents).ok()?;
        if entry.bundle_hash == bundle_hash {
            debug!(field = field_id, "synthesis cache hit");
            Some(entry.text)
        } else {
            None
        }
    }

    /// Persists a completion under the field and bundle hash.
    ///
    /// # Errors
    ///
    /// Fails when the entry cannot be serialized or written.
    pub fn store(&self, field_id: &str, bundle_hash: &str, text: &str) -> Result<PathBuf> {
        let entry = CachedSynthesis {
            field_id: field_id.to_string(),
            bundle_hash: bundle_hash.to_string(),
            text: text.to_string(),
            saved_at: chrono::Utc::now().to_rfc3339(),
        };
        let path = self.entry_path(field_id, bundle_hash);
        let json = serde_json::to_string_pretty(&entry)
            .with_context(|| format!("failed to serialize synthesis cache entry for {field_id}"))?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write synthesis cache to {}", path.display()))?;
        Ok(path)
    }

    fn entry_path(&self, field_id: &str, bundle_hash: &str) -> PathBuf {
        let short_hash = &bundle_hash[..bundle_hash.len().min(16)];
        self.base_dir
            .join(format!("{}_{short_hash}.json", normalize_id(field_id)))
    }
}

/// Normalizes a field id for use in filenames.
fn normalize_id(id: &str) -> String {
    id.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
