//! Status tracker routing pipeline checkpoints and failures to persistence.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use super::status::{JobStatusRecord, PipelineStatus, truncate_stage};
use crate::documents::{DocumentStore, DocumentStoreError, DocumentUpdate, current_timestamp_rfc3339};

/// Errors raised while recording job status.
#[derive(Debug, Error)]
pub enum JobError {
    /// The requested status change is not in the transition table.
    #[error("invalid status transition for {doc_id}: {from} -> {to}")]
    InvalidTransition {
        /// Document whose status was being changed.
        doc_id: Uuid,
        /// Current status.
        from: PipelineStatus,
        /// Rejected target status.
        to: PipelineStatus,
    },
    /// Persistence rejected the write.
    #[error("job status store failed: {0}")]
    Store(#[from] DocumentStoreError),
}

/// Progress inside a linear band, e.g. `30 + floor(50 * done / total)`.
pub fn interpolate_progress(start: u8, span: u8, done: usize, total: usize) -> u8 {
    if total == 0 {
        return start;
    }
    let step = (span as usize * done.min(total)) / total;
    start.saturating_add(step as u8).min(100)
}

/// Accepts `(status, progress, stage)` updates and serves the latest one.
#[derive(Clone)]
pub struct JobTracker {
    store: Arc<dyn DocumentStore>,
}

impl JobTracker {
    /// Build a tracker writing through `store`.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Record the initial `uploaded` row for a new document.
    pub async fn open(
        &self,
        doc_id: Uuid,
        stage: impl Into<String>,
    ) -> Result<JobStatusRecord, JobError> {
        let record = JobStatusRecord {
            doc_id,
            status: PipelineStatus::Uploaded,
            progress: 0,
            current_stage: Some(stage.into()),
            updated_at: current_timestamp_rfc3339(),
        };
        self.store.append_job_status(record.clone()).await?;
        Ok(record)
    }

    /// Record a checkpoint, validating it against the latest row.
    ///
    /// While the status is unchanged progress never moves backwards.
    pub async fn update(
        &self,
        doc_id: Uuid,
        status: PipelineStatus,
        progress: u8,
        stage: impl Into<String>,
    ) -> Result<JobStatusRecord, JobError> {
        let mut progress = progress.min(100);
        if let Some(previous) = self.store.latest_job_status(doc_id).await? {
            if !previous.status.can_transition_to(status) {
                return Err(JobError::InvalidTransition {
                    doc_id,
                    from: previous.status,
                    to: status,
                });
            }
            if previous.status == status {
                progress = progress.max(previous.progress);
            }
        }

        let record = JobStatusRecord {
            doc_id,
            status,
            progress,
            current_stage: Some(stage.into()),
            updated_at: current_timestamp_rfc3339(),
        };
        self.store.append_job_status(record.clone()).await?;
        tracing::debug!(
            doc_id = %doc_id,
            status = %status,
            progress,
            stage = record.current_stage.as_deref().unwrap_or_default(),
            "Job status updated"
        );
        Ok(record)
    }

    /// Route a run failure: full message on the document, truncated message on the job row.
    ///
    /// Always records, even when the previous status was not a running state.
    pub async fn fail(&self, doc_id: Uuid, message: &str) -> Result<JobStatusRecord, JobError> {
        if let Some(previous) = self.store.latest_job_status(doc_id).await?
            && !previous.status.can_transition_to(PipelineStatus::Failed)
        {
            tracing::warn!(
                doc_id = %doc_id,
                from = %previous.status,
                "Recording failure outside a running state"
            );
        }

        match self
            .store
            .update_document(doc_id, DocumentUpdate::failed(message))
            .await
        {
            Ok(_) => {}
            Err(DocumentStoreError::NotFound(_)) => {
                tracing::warn!(doc_id = %doc_id, "Failed run has no document record");
            }
            Err(error) => return Err(error.into()),
        }

        let record = JobStatusRecord {
            doc_id,
            status: PipelineStatus::Failed,
            progress: 0,
            current_stage: Some(truncate_stage(message)),
            updated_at: current_timestamp_rfc3339(),
        };
        self.store.append_job_status(record.clone()).await?;
        tracing::error!(doc_id = %doc_id, error = message, "Pipeline run failed");
        Ok(record)
    }

    /// Latest recorded status, if any.
    pub async fn latest(&self, doc_id: Uuid) -> Result<Option<JobStatusRecord>, JobError> {
        Ok(self.store.latest_job_status(doc_id).await?)
    }
}
