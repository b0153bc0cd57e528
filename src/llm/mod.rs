//! Text generation capability used by the note generator and reducer.
//!
//! Providers implement [`TextGenerator`] for free-text completion. Structured generation is
//! layered on top: the raw completion is unwrapped from any Markdown fence and parsed into the
//! caller's type. Remote providers are reached with `reqwest` directly; timeouts live on the
//! HTTP client, not in the pipelines.

mod anthropic;
mod ollama;
mod parse;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaGenerationClient;
pub use parse::extract_json_payload;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::{Config, LlmProvider};

/// Output budget for structured section generation.
pub const STRUCTURED_MAX_TOKENS: u32 = 4000;

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors surfaced by text generation providers.
#[derive(Debug, Error)]
pub enum LlmClientError {
    /// Provider is misconfigured or unreachable.
    #[error("LLM provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be decoded.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Completion did not contain the expected JSON document.
    #[error("Structured response was not valid JSON: {0}")]
    MalformedJson(String),
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// System instruction.
    pub system: String,
    /// User prompt.
    pub prompt: String,
    /// Output token budget.
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Build a request.
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// Free-text generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `request`, returning the model's text.
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmClientError>;
}

/// Run a completion and parse its JSON payload into `T`.
///
/// A fenced ```` ```json ```` block is preferred, then any fenced block, then the raw text.
pub async fn generate_structured<T>(
    client: &dyn TextGenerator,
    system: &str,
    prompt: &str,
) -> Result<T, LlmClientError>
where
    T: DeserializeOwned,
{
    let raw = client
        .generate(GenerationRequest::new(system, prompt, STRUCTURED_MAX_TOKENS))
        .await?;
    let payload = extract_json_payload(&raw);
    serde_json::from_str(payload).map_err(|error| LlmClientError::MalformedJson(error.to_string()))
}

/// Build the text generator selected by configuration.
pub fn build_text_generator(config: &Config) -> Result<Arc<dyn TextGenerator>, LlmClientError> {
    match config.llm_provider {
        LlmProvider::Anthropic => {
            let api_key = config.anthropic_api_key.clone().ok_or_else(|| {
                LlmClientError::ProviderUnavailable("ANTHROPIC_API_KEY is not set".into())
            })?;
            Ok(Arc::new(AnthropicClient::new(
                config.anthropic_base_url.clone(),
                api_key,
                config.llm_model.clone(),
            )?))
        }
        LlmProvider::Ollama => Ok(Arc::new(OllamaGenerationClient::new(
            config.ollama_url.clone(),
            config.llm_model.clone(),
        )?)),
    }
}
