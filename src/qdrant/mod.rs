//! Qdrant vector store integration.

pub mod client;
pub mod filters;
pub mod payload;
/// Streaming helpers for Qdrant scroll pagination.
pub mod scroller;
pub mod types;

pub use client::QdrantService;
pub use filters::{NAMESPACE_FIELD, namespace_filter};
pub use payload::{ChunkPayload, compute_chunk_hash, point_id};
pub use types::{PointInsert, QdrantError};
