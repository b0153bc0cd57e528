//! Embedding capability consumed by the ingestion pipeline.
//!
//! Every backend returns vectors of one fixed length; responses of any other length are rejected
//! here instead of surfacing later as vector store errors.

mod hashed;
mod ollama;
mod openai;

pub use hashed::HashedEmbeddingClient;
pub use ollama::OllamaEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, EmbeddingProvider};

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider is misconfigured or unreachable.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider returned vectors of an unexpected length.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Length actually returned.
        actual: usize,
    },
    /// Provider returned a different number of vectors than inputs.
    #[error("Embedding count mismatch: sent {expected} texts, received {actual} vectors")]
    CountMismatch {
        /// Inputs sent.
        expected: usize,
        /// Vectors received.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Length of every vector this client produces.
    fn dimension(&self) -> usize;

    /// Embed each text, preserving input order.
    async fn embed_batch(&self, texts: Vec<String>)
    -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let mut vectors = self.embed_batch(vec![text.to_string()]).await?;
        let count = vectors.len();
        match (count, vectors.pop()) {
            (1, Some(vector)) => Ok(vector),
            _ => Err(EmbeddingClientError::CountMismatch {
                expected: 1,
                actual: count,
            }),
        }
    }
}

/// Reject responses whose shape does not match the request.
pub(crate) fn validate_vectors(
    vectors: &[Vec<f32>],
    inputs: usize,
    dimension: usize,
) -> Result<(), EmbeddingClientError> {
    if vectors.len() != inputs {
        return Err(EmbeddingClientError::CountMismatch {
            expected: inputs,
            actual: vectors.len(),
        });
    }
    if let Some(vector) = vectors.iter().find(|vector| vector.len() != dimension) {
        return Err(EmbeddingClientError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Build the embedding client selected by configuration.
pub fn build_embedding_client(
    config: &Config,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    tracing::debug!(
        provider = ?config.embedding_provider,
        model = %config.embedding_model,
        dimension = config.embedding_dimension,
        "Building embedding client"
    );
    match config.embedding_provider {
        EmbeddingProvider::OpenAI => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                EmbeddingClientError::ProviderUnavailable("OPENAI_API_KEY is not set".into())
            })?;
            Ok(Arc::new(OpenAiEmbeddingClient::new(
                &config.openai_base_url,
                &api_key,
                config.embedding_model.clone(),
                config.embedding_dimension,
            )?))
        }
        EmbeddingProvider::Ollama => Ok(Arc::new(OllamaEmbeddingClient::new(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
            config.embedding_dimension,
        )?)),
        EmbeddingProvider::Hashed => Ok(Arc::new(HashedEmbeddingClient::new(
            config.embedding_dimension,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_wrong_shapes() {
        let vectors = vec![vec![0.0; 3], vec![0.0; 2]];
        assert!(matches!(
            validate_vectors(&vectors, 2, 3),
            Err(EmbeddingClientError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            validate_vectors(&vectors, 3, 3),
            Err(EmbeddingClientError::CountMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert!(validate_vectors(&vectors[..1], 1, 3).is_ok());
    }

    #[test]
    fn hashed_provider_needs_no_credentials() {
        let config = Config {
            embedding_provider: EmbeddingProvider::Hashed,
            embedding_dimension: 8,
            ..Config::default()
        };
        let client = build_embedding_client(&config).expect("client");
        assert_eq!(client.dimension(), 8);

        let config = Config {
            embedding_provider: EmbeddingProvider::OpenAI,
            openai_api_key: None,
            ..Config::default()
        };
        assert!(matches!(
            build_embedding_client(&config),
            Err(EmbeddingClientError::ProviderUnavailable(_))
        ));
    }
}
