//! Document structuring: heading detection, section indexing, and the
//! content-addressed index cache.

pub mod cache;
pub mod error;
pub mod hash;
pub mod heading;
pub mod indexer;

pub use cache::{IndexCache, content_hash};
pub use error::{IndexError, Result};
pub use heading::{HeadingCandidate, HeadingDetector, HeadingKind, LineClass, classify_line};
pub use indexer::build_index;
