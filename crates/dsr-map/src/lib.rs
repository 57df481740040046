//! Mapping specification loading.
//!
//! Turns the hand-maintained mapping table into ordered [`FieldRule`]s
//! for the resolver. Classification is deterministic: the same mapping
//! source always yields the same rules and strategies.
//!
//! [`FieldRule`]: dsr_model::FieldRule

pub mod error;
pub mod loader;

pub use error::{MappingError, Result};
pub use loader::load_rules;
