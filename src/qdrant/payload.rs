//! Helpers for constructing and hashing Qdrant payloads.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Payload stored alongside each chunk vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Owning document namespace.
    pub doc_id: String,
    /// Record identifier within the namespace.
    pub chunk_id: String,
    /// Chunk text, possibly truncated.
    pub text: String,
    /// Source page.
    pub page: u32,
    /// Position within the page.
    pub chunk_index: u32,
    /// Detected page heading.
    #[serde(default)]
    pub heading: Option<String>,
    /// SHA-256 of the stored text.
    #[serde(default)]
    pub chunk_hash: String,
    /// RFC 3339 time of the upsert.
    #[serde(default)]
    pub indexed_at: String,
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Deterministic point id for a record, so re-ingestion overwrites instead of duplicating.
pub fn point_id(namespace: &str, record_id: &str) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_URL,
        format!("{namespace}_{record_id}").as_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chunk_hash_is_stable() {
        let text = "Hello world";
        let h1 = compute_chunk_hash(text);
        let h2 = compute_chunk_hash(text);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn point_ids_are_deterministic_per_namespace() {
        assert_eq!(point_id("doc", "page1_chunk0"), point_id("doc", "page1_chunk0"));
        assert_ne!(point_id("doc", "page1_chunk0"), point_id("other", "page1_chunk0"));
    }

    #[test]
    fn payload_tolerates_missing_optional_fields() {
        let payload: ChunkPayload = serde_json::from_value(json!({
            "doc_id": "doc",
            "chunk_id": "page2_chunk1",
            "text": "sample",
            "page": 2,
            "chunk_index": 1
        }))
        .expect("payload");
        assert_eq!(payload.heading, None);
        assert!(payload.chunk_hash.is_empty());
    }
}
