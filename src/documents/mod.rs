//! Persistence capability for document records, job status rows, and generated notes.

mod memory;
mod types;

pub use memory::MemoryDocumentStore;
pub use types::{
    DocumentRecord, DocumentStoreError, DocumentUpdate, NotesRecord, current_timestamp_rfc3339,
};

use crate::jobs::JobStatusRecord;
use async_trait::async_trait;
use uuid::Uuid;

/// Storage for everything keyed by document id.
///
/// Writes are last-write-wins; two concurrent generation runs for one document may both insert
/// notes and the most recent insert is the one served.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document record.
    async fn insert_document(&self, record: DocumentRecord) -> Result<(), DocumentStoreError>;

    /// Fetch a document record.
    async fn get_document(&self, doc_id: Uuid)
    -> Result<Option<DocumentRecord>, DocumentStoreError>;

    /// Apply a partial update and return the updated record.
    async fn update_document(
        &self,
        doc_id: Uuid,
        update: DocumentUpdate,
    ) -> Result<DocumentRecord, DocumentStoreError>;

    /// Remove a document with its job history and notes. Returns whether it existed.
    async fn delete_document(&self, doc_id: Uuid) -> Result<bool, DocumentStoreError>;

    /// Append a job status row; the newest row is the current status.
    async fn append_job_status(&self, record: JobStatusRecord) -> Result<(), DocumentStoreError>;

    /// Most recent job status row.
    async fn latest_job_status(
        &self,
        doc_id: Uuid,
    ) -> Result<Option<JobStatusRecord>, DocumentStoreError>;

    /// Every job status row in insertion order.
    async fn job_history(&self, doc_id: Uuid) -> Result<Vec<JobStatusRecord>, DocumentStoreError>;

    /// Persist a generated notes artifact.
    async fn insert_notes(&self, record: NotesRecord) -> Result<(), DocumentStoreError>;

    /// Most recently inserted notes artifact.
    async fn latest_notes(&self, doc_id: Uuid) -> Result<Option<NotesRecord>, DocumentStoreError>;
}
