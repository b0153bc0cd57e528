//! Vector store capability: per-document namespaces of chunk vectors and metadata.
//!
//! Metadata text is truncated to a bounded length before storage and retrieval returns the
//! truncated form. `fetch_all` makes no ordering promise; callers sort by `(page, chunk_index)`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{OnceCell, RwLock};

use crate::config::{Config, VectorStoreBackend};
use crate::documents::current_timestamp_rfc3339;
use crate::qdrant::{
    ChunkPayload, PointInsert, QdrantError, QdrantService, compute_chunk_hash, namespace_filter,
    point_id, scroller::stream_payloads,
};

/// Errors raised by vector store backends.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Qdrant transport or status error.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// A stored payload could not be decoded.
    #[error("Invalid stored payload: {0}")]
    InvalidPayload(String),
    /// A record's vector length differs from the store's dimension.
    #[error("Vector for '{id}' has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        /// Offending record.
        id: String,
        /// Store dimension.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
}

/// Chunk metadata kept next to each vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Chunk text, truncated on write.
    pub text: String,
    /// Source page.
    pub page: u32,
    /// Detected page heading.
    pub heading: Option<String>,
    /// Position within the page.
    pub chunk_index: u32,
}

/// Record written by `upsert`.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Identifier unique within the namespace; re-upserting replaces the record.
    pub id: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Associated metadata.
    pub metadata: ChunkMetadata,
}

/// Storage for chunk vectors partitioned by document namespace.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace records in `namespace`, returning how many were written.
    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorStoreError>;

    /// Every record's metadata in `namespace`, in no particular order.
    async fn fetch_all(&self, namespace: &str) -> Result<Vec<ChunkMetadata>, VectorStoreError>;

    /// Remove every record in `namespace`.
    async fn delete_namespace(&self, namespace: &str) -> Result<(), VectorStoreError>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> Result<(), VectorStoreError>;
}

/// Cut `text` to at most `limit` characters on a character boundary.
pub fn truncate_text(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}

/// Build the vector store selected by configuration.
pub fn build_vector_store(config: &Config) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
    match config.vector_store {
        VectorStoreBackend::Qdrant => Ok(Arc::new(QdrantVectorStore::new(
            QdrantService::new(config)?,
            config.qdrant_collection_name.clone(),
            config.embedding_dimension,
            config.metadata_text_limit,
        ))),
        VectorStoreBackend::Memory => Ok(Arc::new(MemoryVectorStore::new(
            config.metadata_text_limit,
        ))),
    }
}

/// Qdrant-backed store; every namespace shares one collection, scoped by a `doc_id` filter.
pub struct QdrantVectorStore {
    service: QdrantService,
    collection: String,
    dimension: usize,
    text_limit: usize,
    collection_ready: OnceCell<()>,
}

impl QdrantVectorStore {
    /// Wrap a Qdrant client; the collection is created on first write.
    pub fn new(
        service: QdrantService,
        collection: String,
        dimension: usize,
        text_limit: usize,
    ) -> Self {
        Self {
            service,
            collection,
            dimension,
            text_limit,
            collection_ready: OnceCell::new(),
        }
    }

    async fn ensure_collection(&self) -> Result<(), QdrantError> {
        self.collection_ready
            .get_or_try_init(|| async {
                self.service
                    .create_collection_if_not_exists(&self.collection, self.dimension as u64)
                    .await?;
                self.service.ensure_payload_indexes(&self.collection).await
            })
            .await
            .map(|_| ())
    }

    fn point(
        &self,
        namespace: &str,
        record: VectorRecord,
        indexed_at: &str,
    ) -> Result<PointInsert, VectorStoreError> {
        let text = truncate_text(&record.metadata.text, self.text_limit);
        let payload = ChunkPayload {
            doc_id: namespace.to_string(),
            chunk_hash: compute_chunk_hash(&text),
            chunk_id: record.id.clone(),
            text,
            page: record.metadata.page,
            chunk_index: record.metadata.chunk_index,
            heading: record.metadata.heading,
            indexed_at: indexed_at.to_string(),
        };
        let payload = serde_json::to_value(payload)
            .map_err(|error| VectorStoreError::InvalidPayload(error.to_string()))?;
        Ok(PointInsert {
            id: point_id(namespace, &record.id),
            vector: record.vector,
            payload,
        })
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorStoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        check_dimensions(&records, self.dimension)?;
        self.ensure_collection().await?;

        let indexed_at = current_timestamp_rfc3339();
        let points = records
            .into_iter()
            .map(|record| self.point(namespace, record, &indexed_at))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.service.upsert_points(&self.collection, points).await?)
    }

    async fn fetch_all(&self, namespace: &str) -> Result<Vec<ChunkMetadata>, VectorStoreError> {
        let payloads: Vec<_> =
            match stream_payloads(&self.service, &self.collection, namespace_filter(namespace))
                .try_collect()
                .await
            {
                Ok(payloads) => payloads,
                Err(error) if error.is_not_found() => {
                    tracing::debug!(collection = %self.collection, namespace, "Collection missing; namespace is empty");
                    return Ok(Vec::new());
                }
                Err(error) => return Err(error.into()),
            };

        payloads
            .into_iter()
            .map(|payload| {
                let stored: ChunkPayload = serde_json::from_value(Value::Object(payload))
                    .map_err(|error| VectorStoreError::InvalidPayload(error.to_string()))?;
                Ok(ChunkMetadata {
                    text: stored.text,
                    page: stored.page,
                    heading: stored.heading.filter(|heading| !heading.is_empty()),
                    chunk_index: stored.chunk_index,
                })
            })
            .collect()
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), VectorStoreError> {
        match self
            .service
            .delete_points(&self.collection, namespace_filter(namespace))
            .await
        {
            Ok(()) => Ok(()),
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    async fn health_check(&self) -> Result<(), VectorStoreError> {
        self.service.list_collections().await?;
        Ok(())
    }
}

/// Process-local store; contents vanish on restart.
pub struct MemoryVectorStore {
    text_limit: usize,
    namespaces: RwLock<HashMap<String, HashMap<String, (Vec<f32>, ChunkMetadata)>>>,
}

impl MemoryVectorStore {
    /// Create an empty store truncating metadata text at `text_limit` characters.
    pub fn new(text_limit: usize) -> Self {
        Self {
            text_limit,
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Number of records held for `namespace`.
    pub async fn record_count(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorStoreError> {
        let count = records.len();
        let mut namespaces = self.namespaces.write().await;
        let entries = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            let mut metadata = record.metadata;
            metadata.text = truncate_text(&metadata.text, self.text_limit);
            entries.insert(record.id, (record.vector, metadata));
        }
        Ok(count)
    }

    async fn fetch_all(&self, namespace: &str) -> Result<Vec<ChunkMetadata>, VectorStoreError> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .map(|entries| entries.values().map(|(_, metadata)| metadata.clone()).collect())
            .unwrap_or_default())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), VectorStoreError> {
        self.namespaces.write().await.remove(namespace);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }
}

fn check_dimensions(records: &[VectorRecord], dimension: usize) -> Result<(), VectorStoreError> {
    match records.iter().find(|record| record.vector.len() != dimension) {
        Some(record) => Err(VectorStoreError::DimensionMismatch {
            id: record.id.clone(),
            expected: dimension,
            actual: record.vector.len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdrant::client::test_service;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };
    use serde_json::json;

    fn record(id: &str, text: &str, page: u32, chunk_index: u32) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            vector: vec![0.5, 0.5],
            metadata: ChunkMetadata {
                text: text.to_string(),
                page,
                heading: None,
                chunk_index,
            },
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_text("héllo", 2), "hé");
        assert_eq!(truncate_text("short", 100), "short");
        assert_eq!(truncate_text(&"x".repeat(1500), 1000).len(), 1000);
    }

    #[tokio::test]
    async fn memory_store_isolates_namespaces_and_truncates() {
        let store = MemoryVectorStore::new(4);
        store
            .upsert("a", vec![record("page1_chunk0", "abcdefgh", 1, 0)])
            .await
            .expect("upsert");
        store
            .upsert("b", vec![record("page1_chunk0", "other", 1, 0)])
            .await
            .expect("upsert");

        let fetched = store.fetch_all("a").await.expect("fetch");
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].text, "abcd");

        store.delete_namespace("a").await.expect("delete");
        assert!(store.fetch_all("a").await.expect("fetch").is_empty());
        assert_eq!(store.record_count("b").await, 1);
    }

    #[tokio::test]
    async fn memory_upsert_replaces_existing_ids() {
        let store = MemoryVectorStore::new(100);
        store
            .upsert("a", vec![record("page1_chunk0", "first", 1, 0)])
            .await
            .expect("upsert");
        store
            .upsert("a", vec![record("page1_chunk0", "second", 1, 0)])
            .await
            .expect("upsert");
        let fetched = store.fetch_all("a").await.expect("fetch");
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].text, "second");
    }

    #[tokio::test]
    async fn qdrant_store_creates_collection_once_and_truncates_payload() {
        let server = MockServer::start_async().await;
        let exists = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/notes");
                then.status(404);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/notes");
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/notes/index");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/notes/points")
                    .body_contains("\"text\":\"abc\"")
                    .body_contains("\"doc_id\":\"doc-1\"");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;

        let store = QdrantVectorStore::new(test_service(server.base_url()), "notes".into(), 2, 3);
        for _ in 0..2 {
            store
                .upsert("doc-1", vec![record("page1_chunk0", "abcdef", 1, 0)])
                .await
                .expect("upsert");
        }

        assert_eq!(exists.hits_async().await, 1);
        assert_eq!(create.hits_async().await, 1);
        assert_eq!(upsert.hits_async().await, 2);
    }

    #[tokio::test]
    async fn qdrant_store_rejects_wrong_dimension_before_network() {
        let store = QdrantVectorStore::new(
            test_service("http://127.0.0.1:9".into()),
            "notes".into(),
            3,
            100,
        );
        let error = store
            .upsert("doc", vec![record("page1_chunk0", "text", 1, 0)])
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn qdrant_fetch_decodes_payloads_and_tolerates_missing_collection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/notes/points/scroll")
                    .body_contains("\"doc-1\"");
                then.status(200).json_body(json!({
                    "result": {
                        "points": [{
                            "id": "x",
                            "payload": {
                                "doc_id": "doc-1",
                                "chunk_id": "page2_chunk0",
                                "text": "Kinetic energy",
                                "page": 2,
                                "chunk_index": 0,
                                "heading": "Energy",
                                "chunk_hash": "h",
                                "indexed_at": "2025-01-01T00:00:00Z"
                            }
                        }],
                        "next_page_offset": null
                    }
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/notes/points/scroll")
                    .body_contains("\"doc-2\"");
                then.status(404).body("missing");
            })
            .await;

        let store = QdrantVectorStore::new(test_service(server.base_url()), "notes".into(), 2, 100);
        let fetched = store.fetch_all("doc-1").await.expect("fetch");
        assert_eq!(
            fetched,
            vec![ChunkMetadata {
                text: "Kinetic energy".into(),
                page: 2,
                heading: Some("Energy".into()),
                chunk_index: 0,
            }]
        );
        assert!(store.fetch_all("doc-2").await.expect("fetch").is_empty());
    }
}
