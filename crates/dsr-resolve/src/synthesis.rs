//! Synthesis service boundary.
//!
//! The completion service is a black box behind [`SynthesisService`]: the
//! resolver hands it a source bundle plus instructions and takes back
//! prose or a typed failure. The HTTP implementation speaks the
//! chat-completions wire format; stubs back the tests and the
//! synthesis-disabled pipeline mode.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Result, SynthesisError};

/// HTTP request timeout for one completion call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default chat-completions endpoint.
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default completion model.
const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

/// Sampling temperature; low for deterministic regulatory prose.
const TEMPERATURE: f64 = 0.3;

/// System role given to the completion service.
const SYSTEM_PROMPT: &str = "You are a medical writer preparing a drug safety report. \
     Extract and synthesize content accurately from the provided source document sections. \
     Output the synthesized content only, with no preamble.";

/// One synthesis call: assembled source passages plus field instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    /// Concatenated source passages, already truncated to budget.
    pub bundle: String,
    /// Field-specific instructions derived from the mapping row.
    pub instructions: String,
    /// Completion token budget.
    pub max_tokens: u32,
}

/// Boundary to the external text-completion service.
pub trait SynthesisService: Send + Sync {
    /// Produces synthesized prose for the request, or a typed failure.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError`] on transport failure, throttling,
    /// rejection, or an empty completion. Implementations do not retry;
    /// the retry budget belongs to the caller.
    fn synthesize(&self, request: &SynthesisRequest) -> Result<String>;
}

/// Connection settings for the HTTP synthesis client.
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Chat-completions endpoint URL.
    pub endpoint: String,
    /// Bearer token for the service.
    pub api_key: String,
    /// Model identifier sent with each request.
    pub model: String,
}

impl SynthesisConfig {
    /// Settings for the default endpoint and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Blocking HTTP client for a chat-completions style service.
pub struct HttpSynthesisClient {
    client: Client,
    config: SynthesisConfig,
}

impl HttpSynthesisClient {
    /// Builds a client with the standard request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::Transport`] when the underlying HTTP
    /// client cannot be constructed.
    pub fn new(config: SynthesisConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }
}

impl SynthesisService for HttpSynthesisClient {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<String> {
        debug!(
            bundle_chars = request.bundle.len(),
            max_tokens = request.max_tokens,
            "issuing synthesis request"
        );
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("{}\n\nSource content:\n{}", request.instructions, request.bundle),
                },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": request.max_tokens,
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(SynthesisError::RateLimited { retry_after_secs });
        }
        if !(200..300).contains(&status) {
            let message = response
                .text()
                .unwrap_or_else(|_| "unreadable response body".to_string());
            return Err(SynthesisError::Api { status, message });
        }

        let payload: Value = response.json()?;
        let choice = &payload["choices"][0];
        if choice["finish_reason"].as_str() == Some("content_filter") {
            return Err(SynthesisError::Rejected(
                "content filtered by provider".to_string(),
            ));
        }
        let text = choice["message"]["content"].as_str().unwrap_or("").trim();
        if text.is_empty() {
            return Err(SynthesisError::EmptyCompletion);
        }
        Ok(text.to_string())
    }
}

/// Stub service returning a fixed completion; used in tests and dry runs.
#[derive(Debug, Clone)]
pub struct FixedSynthesis {
    text: String,
}

impl FixedSynthesis {
    /// A stub that always completes with `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl SynthesisService for FixedSynthesis {
    fn synthesize(&self, _request: &SynthesisRequest) -> Result<String> {
        Ok(self.text.clone())
    }
}

/// Service used when synthesis is turned off for a run: every synthesize
/// field resolves to `unavailable` with an explicit reason instead of
/// silently passing source text through.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSynthesis;

impl SynthesisService for DisabledSynthesis {
    fn synthesize(&self, _request: &SynthesisRequest) -> Result<String> {
        Err(SynthesisError::Rejected(
            "synthesis disabled for this run".to_string(),
        ))
    }
}
