use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::processing::chunking::WordWindow;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the study notes service.
///
/// Built once at process start and handed to every component as an `Arc<Config>`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend holding chunk vectors.
    pub vector_store: VectorStoreBackend,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection shared by every document namespace.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// API key for the OpenAI embeddings endpoint.
    pub openai_api_key: Option<String>,
    /// Base URL for OpenAI-compatible endpoints.
    pub openai_base_url: String,
    /// Base URL of the local Ollama runtime.
    pub ollama_url: String,
    /// Provider used for note and summary generation.
    pub llm_provider: LlmProvider,
    /// Model identifier passed to the generation provider.
    pub llm_model: String,
    /// API key for the Anthropic messages endpoint.
    pub anthropic_api_key: Option<String>,
    /// Base URL for the Anthropic API.
    pub anthropic_base_url: String,
    /// Content policy applied to every section note.
    pub notes_profile: NotesProfile,
    /// Token budget per chunk before word approximation.
    pub chunk_max_tokens: usize,
    /// Token overlap between consecutive chunks of a page.
    pub chunk_overlap: usize,
    /// Chunk cap for sections without a detected heading.
    pub section_max_chunks: usize,
    /// Records sent per vector store write.
    pub upsert_batch_size: usize,
    /// Characters of chunk text kept in vector metadata.
    pub metadata_text_limit: usize,
    /// Attempts per external call or generation unit.
    pub retry_max_attempts: usize,
    /// Base delay for exponential retry backoff, in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Directory receiving uploaded PDFs.
    pub upload_dir: String,
    /// Upload size limit in megabytes.
    pub max_file_size_mb: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported vector store backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreBackend {
    /// Remote Qdrant collection.
    Qdrant,
    /// Process-local store; contents vanish on restart.
    Memory,
}

/// Supported embedding backends for the ingestion pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Hosted OpenAI embeddings API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic byte-hashing vectors, useful offline.
    Hashed,
}

/// Supported text generation backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Anthropic messages API.
    Anthropic,
    /// Local Ollama runtime.
    Ollama,
}

/// Content policy profile for section notes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotesProfile {
    /// Capped points per subsection and a short key-term list.
    #[default]
    Concise,
    /// Near-complete detail preserved from the source.
    Comprehensive,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vector_store: VectorStoreBackend::Qdrant,
            qdrant_url: "http://127.0.0.1:6333".into(),
            qdrant_collection_name: "study-notes".into(),
            qdrant_api_key: None,
            embedding_provider: EmbeddingProvider::OpenAI,
            embedding_model: "text-embedding-3-small".into(),
            embedding_dimension: 1536,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".into(),
            ollama_url: "http://127.0.0.1:11434".into(),
            llm_provider: LlmProvider::Anthropic,
            llm_model: "claude-sonnet-4-5-20250929".into(),
            anthropic_api_key: None,
            anthropic_base_url: "https://api.anthropic.com".into(),
            notes_profile: NotesProfile::Concise,
            chunk_max_tokens: 800,
            chunk_overlap: 200,
            section_max_chunks: 10,
            upsert_batch_size: 100,
            metadata_text_limit: 1000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
            upload_dir: "./uploads".into(),
            max_file_size_mb: 50,
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from `.env` and the process environment, validating along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        let config = Self {
            vector_store: parse_or("VECTOR_STORE", defaults.vector_store)?,
            qdrant_url: load_env_optional("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            qdrant_collection_name: load_env_optional("QDRANT_COLLECTION_NAME")
                .unwrap_or(defaults.qdrant_collection_name),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider: parse_or("EMBEDDING_PROVIDER", defaults.embedding_provider)?,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            embedding_dimension: parse_or("EMBEDDING_DIMENSION", defaults.embedding_dimension)?,
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or(defaults.openai_base_url),
            ollama_url: load_env_optional("OLLAMA_URL").unwrap_or(defaults.ollama_url),
            llm_provider: parse_or("LLM_PROVIDER", defaults.llm_provider)?,
            llm_model: load_env_optional("LLM_MODEL").unwrap_or(defaults.llm_model),
            anthropic_api_key: load_env_optional("ANTHROPIC_API_KEY"),
            anthropic_base_url: load_env_optional("ANTHROPIC_BASE_URL")
                .unwrap_or(defaults.anthropic_base_url),
            notes_profile: parse_or("NOTES_PROFILE", defaults.notes_profile)?,
            chunk_max_tokens: parse_or("CHUNK_MAX_TOKENS", defaults.chunk_max_tokens)?,
            chunk_overlap: parse_or("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            section_max_chunks: parse_or("SECTION_MAX_CHUNKS", defaults.section_max_chunks)?,
            upsert_batch_size: parse_or("UPSERT_BATCH_SIZE", defaults.upsert_batch_size)?,
            metadata_text_limit: parse_or("METADATA_TEXT_LIMIT", defaults.metadata_text_limit)?,
            retry_max_attempts: parse_or("RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts)?,
            retry_base_delay_ms: parse_or("RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms)?,
            upload_dir: load_env_optional("UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            max_file_size_mb: parse_or("MAX_FILE_SIZE_MB", defaults.max_file_size_mb)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };
        config.validate()?;
        tracing::debug!(
            vector_store = ?config.vector_store,
            qdrant_url = %config.qdrant_url,
            collection = %config.qdrant_collection_name,
            embedding_provider = ?config.embedding_provider,
            llm_provider = ?config.llm_provider,
            notes_profile = ?config.notes_profile,
            server_port = ?config.server_port,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject settings that would make a pipeline misbehave at run time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if WordWindow::from_tokens(self.chunk_max_tokens, self.chunk_overlap).is_err() {
            return Err(ConfigError::InvalidValue("CHUNK_OVERLAP".into()));
        }
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if self.section_max_chunks == 0 {
            return Err(ConfigError::InvalidValue("SECTION_MAX_CHUNKS".into()));
        }
        if self.upsert_batch_size == 0 {
            return Err(ConfigError::InvalidValue("UPSERT_BATCH_SIZE".into()));
        }
        if self.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue("RETRY_MAX_ATTEMPTS".into()));
        }
        if self.embedding_provider == EmbeddingProvider::OpenAI && self.openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".into()));
        }
        if self.llm_provider == LlmProvider::Anthropic && self.anthropic_api_key.is_none() {
            return Err(ConfigError::MissingVariable("ANTHROPIC_API_KEY".into()));
        }
        Ok(())
    }

    /// Upload size limit expressed in bytes.
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for VectorStoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "hashed" => Ok(Self::Hashed),
            _ => Err(()),
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for NotesProfile {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "concise" => Ok(Self::Concise),
            "comprehensive" => Ok(Self::Comprehensive),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> Config {
        Config {
            embedding_provider: EmbeddingProvider::Hashed,
            llm_provider: LlmProvider::Ollama,
            ..Config::default()
        }
    }

    #[test]
    fn defaults_match_documented_parameters() {
        let config = Config::default();
        assert_eq!(config.chunk_max_tokens, 800);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.section_max_chunks, 10);
        assert_eq!(config.upsert_batch_size, 100);
        assert_eq!(config.metadata_text_limit, 1000);
        assert_eq!(config.max_file_size_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn validate_rejects_non_positive_stride() {
        let config = Config {
            chunk_max_tokens: 100,
            chunk_overlap: 100,
            ..offline()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(key)) if key == "CHUNK_OVERLAP"
        ));
    }

    #[test]
    fn validate_requires_provider_credentials() {
        let config = Config {
            embedding_provider: EmbeddingProvider::OpenAI,
            ..offline()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingVariable(key)) if key == "OPENAI_API_KEY"
        ));
        assert!(offline().validate().is_ok());
    }

    #[test]
    fn providers_parse_case_insensitively() {
        assert_eq!("OpenAI".parse(), Ok(EmbeddingProvider::OpenAI));
        assert_eq!("hashed".parse(), Ok(EmbeddingProvider::Hashed));
        assert_eq!("Anthropic".parse(), Ok(LlmProvider::Anthropic));
        assert_eq!("comprehensive".parse(), Ok(NotesProfile::Comprehensive));
        assert_eq!("memory".parse(), Ok(VectorStoreBackend::Memory));
        assert!("pinecone".parse::<VectorStoreBackend>().is_err());
    }
}
