//! Core data types and error definitions for the processing pipelines.

use crate::{
    documents::DocumentStoreError,
    embedding::EmbeddingClientError,
    extract::ExtractError,
    jobs::{JobError, PipelineStatus},
    llm::LlmClientError,
    vector_store::VectorStoreError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced while turning page text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Overlap consumes the whole window so the slide would never advance.
    #[error(
        "chunk window does not advance: {words_per_chunk} words per chunk with {overlap_words} words of overlap"
    )]
    NonAdvancingWindow {
        /// Words kept per chunk after token approximation.
        words_per_chunk: usize,
        /// Words shared by consecutive chunks after token approximation.
        overlap_words: usize,
    },
}

/// Errors emitted by the ingestion and generation pipelines.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every page of the document was empty.
    #[error("No text extracted from PDF")]
    NoExtractableText,
    /// The vector store returned nothing for the document.
    #[error("No chunks found for this document")]
    NoChunks,
    /// The document id is unknown to the persistence layer.
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),
    /// No notes have been generated for the document yet.
    #[error("Notes not found for document: {0}")]
    NotesNotFound(Uuid),
    /// Note generation was requested before ingestion finished.
    #[error("Document not ready. Current status: {0}")]
    NotReady(PipelineStatus),
    /// Upload was rejected before any processing.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
    /// Upload exceeded the configured size limit.
    #[error("File too large. Maximum size: {max_mb}MB")]
    UploadTooLarge {
        /// Configured limit in megabytes.
        max_mb: usize,
    },
    /// Uploaded file could not be written to disk.
    #[error("Failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
    /// PDF decoding failed.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractError),
    /// Chunking step was misconfigured.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors.
    #[error("Embedding request failed: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Text generation backend could not be constructed.
    #[error("Text generation unavailable: {0}")]
    Generation(#[from] LlmClientError),
    /// Vector store rejected a read or write.
    #[error("Vector store request failed: {0}")]
    VectorStore(#[from] VectorStoreError),
    /// Document, job, or notes persistence failed.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] DocumentStoreError),
    /// Job status update was rejected.
    #[error("Job status update failed: {0}")]
    Job(#[from] JobError),
    /// Background task ended without producing a result.
    #[error("Pipeline task aborted: {0}")]
    TaskAborted(String),
}

/// Text extracted from a single page, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number.
    pub page_number: u32,
    /// Raw extracted text.
    pub text: String,
}

impl PageText {
    /// Number raw page strings from 1 in order.
    pub fn numbered(pages: Vec<String>) -> Vec<Self> {
        pages
            .into_iter()
            .zip(1u32..)
            .map(|(text, page_number)| Self { page_number, text })
            .collect()
    }
}

/// A bounded span of page text, the atomic retrieval unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Identifier derived from page and index, unique within a document.
    pub chunk_id: String,
    /// Chunk text.
    pub text: String,
    /// Page the chunk was cut from.
    pub page: u32,
    /// 0-based position within the page.
    pub chunk_index: u32,
    /// Heading detected on the originating page.
    pub heading: Option<String>,
}

impl Chunk {
    /// Build a chunk, deriving its identifier from `(page, chunk_index)`.
    pub fn new(text: String, page: u32, chunk_index: u32, heading: Option<String>) -> Self {
        Self {
            chunk_id: chunk_id(page, chunk_index),
            text,
            page,
            chunk_index,
            heading,
        }
    }
}

/// Deterministic chunk identifier for a page position.
pub fn chunk_id(page: u32, chunk_index: u32) -> String {
    format!("page{page}_chunk{chunk_index}")
}

/// Chunk paired with its embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    /// Source chunk.
    pub chunk: Chunk,
    /// Fixed-length dense vector.
    pub embedding: Vec<f32>,
}

/// Summary of a completed ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionOutcome {
    /// Pages in the source document, empty ones included.
    pub total_pages: usize,
    /// Chunks embedded and stored.
    pub total_chunks: usize,
}

/// Liveness report served by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    /// Always `"ok"` while the process is serving requests.
    pub status: &'static str,
    /// Whether the vector store answered its health probe.
    pub vector_store_reachable: bool,
    /// Diagnostic captured when the vector store is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where the ingestion pipeline reads page text from.
#[derive(Debug, Clone)]
pub enum PageSource {
    /// PDF previously written to disk.
    PdfFile(std::path::PathBuf),
    /// Page text extracted by the caller.
    Pages(Vec<String>),
}
