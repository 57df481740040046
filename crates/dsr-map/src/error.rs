//! Error types for mapping operations.

use thiserror::Error;

/// Errors from loading a mapping specification.
///
/// A malformed mapping is fatal to the whole run: resolution is
/// meaningless without valid rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    /// No parsable rule rows were found in the mapping source.
    #[error("mapping source contains no field rules")]
    NoRules,
}

/// Result type alias for mapping operations.
pub type Result<T> = std::result::Result<T, MappingError>;
