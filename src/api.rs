//! HTTP surface for the study notes service.
//!
//! - `POST /api/upload?filename=` – Store a raw PDF body and start ingestion in the background.
//! - `POST /api/documents` – Register pre-extracted page text (`{filename, pages}`) and ingest it.
//! - `GET /api/status/:doc_id` – Latest job status for polling.
//! - `POST /api/notes/generate/:doc_id` – Start note generation; responds immediately.
//! - `GET /api/notes/:doc_id` – Latest generated notes.
//! - `DELETE /api/documents/:doc_id` – Remove a document's vectors and records.
//! - `GET /health` – Liveness plus vector store reachability.
//! - `GET /metrics` – Pipeline counters.
//!
//! Both pipelines run outside the request cycle; callers poll the status route for progress.

use crate::documents::NotesRecord;
use crate::jobs::{JobStatusRecord, PipelineStatus};
use crate::metrics::MetricsSnapshot;
use crate::processing::{HealthSnapshot, NotesApi, PipelineError};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Build the HTTP router; request bodies above `max_upload_bytes` are rejected with 413.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: NotesApi + 'static,
{
    Router::new()
        .route("/api/upload", post(upload_pdf::<S>))
        .route("/api/documents", post(submit_pages::<S>))
        .route("/api/documents/:doc_id", delete(delete_document::<S>))
        .route("/api/status/:doc_id", get(get_status::<S>))
        .route("/api/notes/generate/:doc_id", post(generate_notes::<S>))
        .route("/api/notes/:doc_id", get(get_notes::<S>))
        .route("/health", get(get_health::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

/// Query string for `POST /api/upload`.
#[derive(Deserialize)]
struct UploadQuery {
    filename: String,
}

/// Request body for `POST /api/documents`.
#[derive(Deserialize)]
struct SubmitPagesRequest {
    filename: String,
    pages: Vec<String>,
}

/// Acknowledgement returned by routes that start a background run.
#[derive(Serialize)]
struct AcceptedResponse {
    doc_id: Uuid,
    status: PipelineStatus,
    message: &'static str,
}

/// Store an uploaded PDF and start ingestion.
async fn upload_pdf<S>(
    State(service): State<Arc<S>>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<AcceptedResponse>, AppError>
where
    S: NotesApi,
{
    let doc_id = service
        .accept_upload(&query.filename, body.to_vec())
        .await?;
    tracing::info!(doc_id = %doc_id, filename = %query.filename, "Upload accepted");
    Ok(Json(AcceptedResponse {
        doc_id,
        status: PipelineStatus::Uploaded,
        message: "File uploaded successfully. Processing started.",
    }))
}

/// Register page text and start ingestion.
async fn submit_pages<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SubmitPagesRequest>,
) -> Result<Json<AcceptedResponse>, AppError>
where
    S: NotesApi,
{
    let pages = request.pages.len();
    let doc_id = service.accept_pages(&request.filename, request.pages).await?;
    tracing::info!(doc_id = %doc_id, pages, "Page submission accepted");
    Ok(Json(AcceptedResponse {
        doc_id,
        status: PipelineStatus::Uploaded,
        message: "Pages received. Processing started.",
    }))
}

async fn get_status<S>(
    State(service): State<Arc<S>>,
    Path(doc_id): Path<Uuid>,
) -> Result<Json<JobStatusRecord>, AppError>
where
    S: NotesApi,
{
    Ok(Json(service.job_status(doc_id).await?))
}

/// Start note generation; the run continues after the response is sent.
async fn generate_notes<S>(
    State(service): State<Arc<S>>,
    Path(doc_id): Path<Uuid>,
) -> Result<Json<AcceptedResponse>, AppError>
where
    S: NotesApi,
{
    let status = service.request_notes(doc_id).await?;
    Ok(Json(AcceptedResponse {
        doc_id,
        status: status.status,
        message: "Note generation started",
    }))
}

async fn get_notes<S>(
    State(service): State<Arc<S>>,
    Path(doc_id): Path<Uuid>,
) -> Result<Json<NotesRecord>, AppError>
where
    S: NotesApi,
{
    Ok(Json(service.latest_notes(doc_id).await?))
}

async fn delete_document<S>(
    State(service): State<Arc<S>>,
    Path(doc_id): Path<Uuid>,
) -> Result<StatusCode, AppError>
where
    S: NotesApi,
{
    service.delete_document(doc_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_health<S>(State(service): State<Arc<S>>) -> Json<HealthSnapshot>
where
    S: NotesApi,
{
    Json(service.health().await)
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: NotesApi,
{
    Json(service.metrics_snapshot())
}

struct AppError(PipelineError);

impl AppError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            PipelineError::DocumentNotFound(_) | PipelineError::NotesNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            PipelineError::NotReady(_) | PipelineError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            PipelineError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self(inner)
    }
}
