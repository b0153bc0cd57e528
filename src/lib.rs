#![deny(missing_docs)]

//! Core library for the study notes service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Document, job status, and notes persistence.
pub mod documents;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// PDF text extraction.
pub mod extract;
/// Job status state machine and tracker.
pub mod jobs;
/// Text generation providers.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Section notes: map and reduce steps.
pub mod notes;
/// Document pipelines and orchestration.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Vector store capability and backends.
pub mod vector_store;
