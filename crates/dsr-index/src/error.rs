//! Error types for indexing operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from building or caching a section index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The extraction carried no text blocks at all; nothing downstream
    /// can run without them.
    #[error("document contains no text blocks")]
    EmptyDocument,

    /// Cache file could not be read or written.
    #[error("cache io error at {path}: {source}")]
    CacheIo {
        /// Path of the offending cache file.
        path: PathBuf,
        /// Underlying io error.
        source: std::io::Error,
    },

    /// The index could not be serialized for the cache.
    #[error("index serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for indexing operations.
pub type Result<T> = std::result::Result<T, IndexError>;
