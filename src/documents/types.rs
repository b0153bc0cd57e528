use crate::jobs::PipelineStatus;
use crate::notes::DocumentNotes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Errors raised by document persistence backends.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// No record exists for the id.
    #[error("Document record not found: {0}")]
    NotFound(Uuid),
    /// Backend rejected the operation.
    #[error("Document store backend error: {0}")]
    Backend(String),
}

/// Uploaded document and its pipeline bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document id, also the vector store namespace.
    pub id: Uuid,
    /// Original file name.
    pub filename: String,
    /// Upload size in bytes.
    pub file_size: usize,
    /// Current document status.
    pub status: PipelineStatus,
    /// Pages in the source, set when ingestion finishes.
    pub total_pages: Option<usize>,
    /// Chunks indexed, set when ingestion finishes.
    pub total_chunks: Option<usize>,
    /// Full text of the last failure.
    pub error_message: Option<String>,
    /// RFC 3339 upload time.
    pub uploaded_at: String,
}

impl DocumentRecord {
    /// Fresh record in the `uploaded` state.
    pub fn uploaded(id: Uuid, filename: impl Into<String>, file_size: usize) -> Self {
        Self {
            id,
            filename: filename.into(),
            file_size,
            status: PipelineStatus::Uploaded,
            total_pages: None,
            total_chunks: None,
            error_message: None,
            uploaded_at: current_timestamp_rfc3339(),
        }
    }

    /// Whether ingestion has finished at least once for this document.
    pub fn is_indexed(&self) -> bool {
        self.total_chunks.is_some_and(|count| count > 0)
    }
}

/// Partial update applied to a [`DocumentRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentUpdate {
    /// New status.
    pub status: Option<PipelineStatus>,
    /// New error message; `Some(None)` clears it.
    pub error_message: Option<Option<String>>,
    /// Page count.
    pub total_pages: Option<usize>,
    /// Chunk count.
    pub total_chunks: Option<usize>,
}

impl DocumentUpdate {
    /// Change only the status, clearing any previous error.
    pub fn status(status: PipelineStatus) -> Self {
        Self {
            status: Some(status),
            error_message: Some(None),
            ..Self::default()
        }
    }

    /// Mark failed with the full error text.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(PipelineStatus::Failed),
            error_message: Some(Some(message.into())),
            ..Self::default()
        }
    }

    /// Attach ingestion counts.
    pub fn with_counts(mut self, total_pages: usize, total_chunks: usize) -> Self {
        self.total_pages = Some(total_pages);
        self.total_chunks = Some(total_chunks);
        self
    }

    pub(crate) fn apply(self, record: &mut DocumentRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(error_message) = self.error_message {
            record.error_message = error_message;
        }
        if let Some(total_pages) = self.total_pages {
            record.total_pages = Some(total_pages);
        }
        if let Some(total_chunks) = self.total_chunks {
            record.total_chunks = Some(total_chunks);
        }
    }
}

/// Persisted notes artifact; a regeneration inserts a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesRecord {
    /// Document the notes were generated from.
    pub doc_id: Uuid,
    /// Notes title, duplicated from the content for listing.
    pub title: String,
    /// Generated notes.
    pub content: DocumentNotes,
    /// Wall-clock duration of the generation run.
    pub generation_time_seconds: u64,
    /// RFC 3339 completion time.
    pub generated_at: String,
}

/// Current time formatted for persisted records.
pub fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn failed_update_keeps_counts_and_records_error() {
        let mut record = DocumentRecord::uploaded(Uuid::new_v4(), "lecture.pdf", 10);
        DocumentUpdate::status(PipelineStatus::Ready)
            .with_counts(3, 12)
            .apply(&mut record);
        assert!(record.is_indexed());

        DocumentUpdate::failed("vector store down").apply(&mut record);
        assert_eq!(record.status, PipelineStatus::Failed);
        assert_eq!(record.error_message.as_deref(), Some("vector store down"));
        assert_eq!(record.total_chunks, Some(12));

        DocumentUpdate::status(PipelineStatus::Generating).apply(&mut record);
        assert_eq!(record.error_message, None);
    }
}
