//! Field resolution: routes every mapping rule to a direct copy, a
//! synthesis call, or an explicit unavailable outcome, and assembles the
//! evidence for each.

pub mod bundle;
pub mod engine;
pub mod error;
pub mod repository;
pub mod synthesis;

pub use bundle::{SourceBundle, build_bundle};
pub use engine::{CancelFlag, Resolver, ResolverConfig};
pub use error::SynthesisError;
pub use repository::{SynthesisCache, bundle_hash};
pub use synthesis::{
    DisabledSynthesis, FixedSynthesis, HttpSynthesisClient, SynthesisConfig, SynthesisRequest,
    SynthesisService,
};
