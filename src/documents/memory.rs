//! In-memory [`DocumentStore`] backed by `tokio::sync::RwLock` maps.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentRecord, DocumentStore, DocumentStoreError, DocumentUpdate, NotesRecord};
use crate::jobs::JobStatusRecord;

/// Process-local document store; contents vanish on restart.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<Uuid, DocumentRecord>>,
    jobs: RwLock<HashMap<Uuid, Vec<JobStatusRecord>>>,
    notes: RwLock<HashMap<Uuid, Vec<NotesRecord>>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_document(&self, record: DocumentRecord) -> Result<(), DocumentStoreError> {
        self.documents.write().await.insert(record.id, record);
        Ok(())
    }

    async fn get_document(
        &self,
        doc_id: Uuid,
    ) -> Result<Option<DocumentRecord>, DocumentStoreError> {
        Ok(self.documents.read().await.get(&doc_id).cloned())
    }

    async fn update_document(
        &self,
        doc_id: Uuid,
        update: DocumentUpdate,
    ) -> Result<DocumentRecord, DocumentStoreError> {
        let mut documents = self.documents.write().await;
        let record = documents
            .get_mut(&doc_id)
            .ok_or(DocumentStoreError::NotFound(doc_id))?;
        update.apply(record);
        Ok(record.clone())
    }

    async fn delete_document(&self, doc_id: Uuid) -> Result<bool, DocumentStoreError> {
        let existed = self.documents.write().await.remove(&doc_id).is_some();
        self.jobs.write().await.remove(&doc_id);
        self.notes.write().await.remove(&doc_id);
        Ok(existed)
    }

    async fn append_job_status(&self, record: JobStatusRecord) -> Result<(), DocumentStoreError> {
        self.jobs
            .write()
            .await
            .entry(record.doc_id)
            .or_default()
            .push(record);
        Ok(())
    }

    async fn latest_job_status(
        &self,
        doc_id: Uuid,
    ) -> Result<Option<JobStatusRecord>, DocumentStoreError> {
        Ok(self
            .jobs
            .read()
            .await
            .get(&doc_id)
            .and_then(|rows| rows.last().cloned()))
    }

    async fn job_history(&self, doc_id: Uuid) -> Result<Vec<JobStatusRecord>, DocumentStoreError> {
        Ok(self
            .jobs
            .read()
            .await
            .get(&doc_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_notes(&self, record: NotesRecord) -> Result<(), DocumentStoreError> {
        self.notes
            .write()
            .await
            .entry(record.doc_id)
            .or_default()
            .push(record);
        Ok(())
    }

    async fn latest_notes(&self, doc_id: Uuid) -> Result<Option<NotesRecord>, DocumentStoreError> {
        Ok(self
            .notes
            .read()
            .await
            .get(&doc_id)
            .and_then(|rows| rows.last().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::PipelineStatus;

    fn job(doc_id: Uuid, status: PipelineStatus, progress: u8) -> JobStatusRecord {
        JobStatusRecord {
            doc_id,
            status,
            progress,
            current_stage: None,
            updated_at: "2025-01-01T00:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn latest_job_status_is_last_write() {
        let store = MemoryDocumentStore::new();
        let doc_id = Uuid::new_v4();
        store
            .append_job_status(job(doc_id, PipelineStatus::Uploaded, 0))
            .await
            .expect("append");
        store
            .append_job_status(job(doc_id, PipelineStatus::Processing, 10))
            .await
            .expect("append");

        let latest = store.latest_job_status(doc_id).await.expect("read");
        assert_eq!(latest.map(|row| row.progress), Some(10));
        assert_eq!(store.job_history(doc_id).await.expect("history").len(), 2);
    }

    #[tokio::test]
    async fn update_of_unknown_document_fails() {
        let store = MemoryDocumentStore::new();
        let doc_id = Uuid::new_v4();
        let error = store
            .update_document(doc_id, DocumentUpdate::status(PipelineStatus::Ready))
            .await
            .unwrap_err();
        assert!(matches!(error, DocumentStoreError::NotFound(id) if id == doc_id));
    }

    #[tokio::test]
    async fn delete_removes_everything_for_document() {
        let store = MemoryDocumentStore::new();
        let doc_id = Uuid::new_v4();
        store
            .insert_document(DocumentRecord::uploaded(doc_id, "a.pdf", 1))
            .await
            .expect("insert");
        store
            .append_job_status(job(doc_id, PipelineStatus::Uploaded, 0))
            .await
            .expect("append");

        assert!(store.delete_document(doc_id).await.expect("delete"));
        assert!(store.get_document(doc_id).await.expect("read").is_none());
        assert!(store.latest_job_status(doc_id).await.expect("read").is_none());
        assert!(!store.delete_document(doc_id).await.expect("delete"));
    }
}
