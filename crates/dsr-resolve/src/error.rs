//! Error types for the synthesis boundary.

use thiserror::Error;

/// Failures from the external completion service.
///
/// These never abort a run: the resolver converts them into
/// `unavailable` records carrying the cause.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SynthesisError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider-side throttling; surfaced immediately, never retried.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the provider accepts requests again.
        retry_after_secs: u64,
    },

    /// The service returned an empty or whitespace-only completion.
    #[error("completion was empty")]
    EmptyCompletion,

    /// The service refused the request (content policy).
    #[error("completion rejected: {0}")]
    Rejected(String),

    /// Any other API failure.
    #[error("api error (status {status}): {message}")]
    Api {
        /// HTTP status returned by the service.
        status: u16,
        /// Response body or status text.
        message: String,
    },
}

impl SynthesisError {
    /// Returns whether this failure is transient and worth one more
    /// attempt. Rate limits and policy rejections are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::RateLimited { .. } | Self::EmptyCompletion | Self::Rejected(_) => false,
        }
    }
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result type alias for synthesis calls.
pub type Result<T> = std::result::Result<T, SynthesisError>;
