//! Notes service coordinating ingestion, generation, and job status reporting.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    config::{Config, NotesProfile},
    documents::{
        DocumentRecord, DocumentStore, DocumentUpdate, MemoryDocumentStore, NotesRecord,
        current_timestamp_rfc3339,
    },
    embedding::{EmbeddingClient, build_embedding_client},
    extract::extract_pages_from_file,
    jobs::{JobStatusRecord, JobTracker, PipelineStatus, interpolate_progress},
    llm::build_text_generator,
    metrics::{MetricsSnapshot, PipelineMetrics},
    notes::{NoteGenerator, NoteReducer},
    processing::{
        chunking::{WordWindow, chunk_pages},
        policy::ResiliencePolicy,
        segment::{segment, sort_chunks},
        types::{
            Chunk, EmbeddedChunk, HealthSnapshot, IngestionOutcome, PageSource, PageText,
            PipelineError,
        },
    },
    vector_store::{ChunkMetadata, VectorRecord, VectorStore, build_vector_store},
};

const UPLOADED_STAGE: &str = "File uploaded, ready for processing";
const PROGRESS_EVERY_CHUNKS: usize = 10;

/// Runs both pipelines against injected capabilities.
///
/// Every handle is shared, so clones are cheap and each background run owns one. Construct the
/// service once near process start and hand it to the HTTP surface or the CLI.
#[derive(Clone)]
pub struct NotesService {
    config: Arc<Config>,
    embedder: Arc<dyn EmbeddingClient>,
    vectors: Arc<dyn VectorStore>,
    documents: Arc<dyn DocumentStore>,
    generator: NoteGenerator,
    reducer: NoteReducer,
    tracker: JobTracker,
    metrics: Arc<PipelineMetrics>,
    policy: ResiliencePolicy,
}

/// Capabilities the service is assembled from.
pub struct ServiceParts {
    /// Embedding backend used during ingestion.
    pub embedder: Arc<dyn EmbeddingClient>,
    /// Vector store holding one namespace per document.
    pub vectors: Arc<dyn VectorStore>,
    /// Document, job, and notes persistence.
    pub documents: Arc<dyn DocumentStore>,
    /// Map step.
    pub generator: NoteGenerator,
    /// Reduce step.
    pub reducer: NoteReducer,
}

/// Abstraction over the notes pipelines used by the HTTP surface.
#[async_trait]
pub trait NotesApi: Send + Sync {
    /// Store an uploaded PDF and start ingesting it in the background.
    async fn accept_upload(&self, filename: &str, bytes: Vec<u8>) -> Result<Uuid, PipelineError>;

    /// Register pre-extracted page text and start ingesting it in the background.
    async fn accept_pages(&self, filename: &str, pages: Vec<String>)
    -> Result<Uuid, PipelineError>;

    /// Latest job status for a document.
    async fn job_status(&self, doc_id: Uuid) -> Result<JobStatusRecord, PipelineError>;

    /// Validate and start a generation run, returning the acknowledged status.
    async fn request_notes(&self, doc_id: Uuid) -> Result<JobStatusRecord, PipelineError>;

    /// Most recent notes generated for a document.
    async fn latest_notes(&self, doc_id: Uuid) -> Result<NotesRecord, PipelineError>;

    /// Remove a document's vectors and records.
    async fn delete_document(&self, doc_id: Uuid) -> Result<(), PipelineError>;

    /// Report liveness and vector store reachability.
    async fn health(&self) -> HealthSnapshot;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Observable background pipeline run.
///
/// Dropping the handle detaches the task; its failures are still recorded on the job status.
pub struct PipelineHandle<T> {
    doc_id: Uuid,
    task: JoinHandle<Result<T, PipelineError>>,
}

impl<T> PipelineHandle<T> {
    /// Document the run belongs to.
    pub fn doc_id(&self) -> Uuid {
        self.doc_id
    }

    /// Whether the run has ended, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end and return its result.
    pub async fn wait(self) -> Result<T, PipelineError> {
        match self.task.await {
            Ok(result) => result,
            Err(error) => Err(PipelineError::TaskAborted(error.to_string())),
        }
    }
}

impl NotesService {
    /// Assemble a service from explicit capabilities.
    pub fn new(config: Arc<Config>, parts: ServiceParts) -> Self {
        let tracker = JobTracker::new(Arc::clone(&parts.documents));
        Self {
            policy: ResiliencePolicy::from_config(&config),
            config,
            embedder: parts.embedder,
            vectors: parts.vectors,
            documents: parts.documents,
            generator: parts.generator,
            reducer: parts.reducer,
            tracker,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build every backend selected by `config`, keeping documents in memory.
    pub fn from_config(config: Arc<Config>) -> Result<Self, PipelineError> {
        tracing::info!("Initializing embedding client");
        let embedder = build_embedding_client(&config)?;
        let vectors = build_vector_store(&config)?;
        let llm = build_text_generator(&config)?;
        let policy = ResiliencePolicy::from_config(&config);
        tracing::info!(
            vector_store = ?config.vector_store,
            llm_provider = ?config.llm_provider,
            notes_profile = ?config.notes_profile,
            "Notes service backends ready"
        );

        let parts = ServiceParts {
            embedder,
            vectors,
            documents: Arc::new(MemoryDocumentStore::new()),
            generator: NoteGenerator::new(Arc::clone(&llm), config.notes_profile, policy),
            reducer: NoteReducer::new(llm, policy),
        };
        Ok(Self::new(config, parts))
    }

    /// Validate and store an uploaded PDF, then start ingestion.
    pub async fn upload_pdf(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<PipelineHandle<IngestionOutcome>, PipelineError> {
        if !filename.to_ascii_lowercase().ends_with(".pdf") {
            return Err(PipelineError::InvalidUpload(
                "Only PDF files are supported".into(),
            ));
        }
        if bytes.is_empty() {
            return Err(PipelineError::InvalidUpload("Uploaded file is empty".into()));
        }
        if bytes.len() > self.config.max_file_size_bytes() {
            return Err(PipelineError::UploadTooLarge {
                max_mb: self.config.max_file_size_mb,
            });
        }

        let doc_id = Uuid::new_v4();
        let path = self.upload_path(doc_id);
        tokio::fs::create_dir_all(&self.config.upload_dir).await?;
        tokio::fs::write(&path, &bytes).await?;
        tracing::info!(doc_id = %doc_id, filename, bytes = bytes.len(), "Stored uploaded PDF");

        self.register(doc_id, filename, bytes.len(), UPLOADED_STAGE)
            .await?;
        Ok(self.spawn_ingestion(doc_id, PageSource::PdfFile(path)))
    }

    /// Register page text extracted by the caller, then start ingestion.
    pub async fn submit_pages(
        &self,
        filename: &str,
        pages: Vec<String>,
    ) -> Result<PipelineHandle<IngestionOutcome>, PipelineError> {
        if filename.trim().is_empty() {
            return Err(PipelineError::InvalidUpload("Filename is required".into()));
        }
        let doc_id = Uuid::new_v4();
        let size = pages.iter().map(String::len).sum();
        self.register(doc_id, filename, size, "Pages received, ready for processing")
            .await?;
        Ok(self.spawn_ingestion(doc_id, PageSource::Pages(pages)))
    }

    /// Run ingestion for `doc_id` in the background.
    pub fn spawn_ingestion(
        &self,
        doc_id: Uuid,
        source: PageSource,
    ) -> PipelineHandle<IngestionOutcome> {
        self.spawn_guarded(doc_id, move |service| async move {
            service.ingest_document(doc_id, source).await
        })
    }

    /// Chunk, embed, and store a document, reporting progress along the way.
    pub async fn ingest_document(
        &self,
        doc_id: Uuid,
        source: PageSource,
    ) -> Result<IngestionOutcome, PipelineError> {
        tracing::info!(doc_id = %doc_id, "Processing document");
        self.documents
            .update_document(doc_id, DocumentUpdate::status(PipelineStatus::Processing))
            .await?;
        self.tracker
            .update(
                doc_id,
                PipelineStatus::Processing,
                10,
                "Extracting text from PDF...",
            )
            .await?;

        let pages = match source {
            PageSource::PdfFile(path) => extract_pages_from_file(&path).await?,
            PageSource::Pages(pages) => pages,
        };
        let pages = PageText::numbered(pages);
        let window = WordWindow::from_tokens(self.config.chunk_max_tokens, self.config.chunk_overlap)?;
        let chunks = chunk_pages(&pages, window);
        if chunks.is_empty() {
            return Err(PipelineError::NoExtractableText);
        }

        let total = chunks.len();
        tracing::debug!(
            doc_id = %doc_id,
            pages = pages.len(),
            chunks = total,
            words_per_chunk = window.words_per_chunk(),
            overlap_words = window.overlap_words(),
            "Document chunked"
        );
        self.tracker
            .update(
                doc_id,
                PipelineStatus::Processing,
                30,
                format!("Generating embeddings for {total} chunks..."),
            )
            .await?;

        let mut embedded = Vec::with_capacity(total);
        for (index, chunk) in chunks.into_iter().enumerate() {
            let embedding = self
                .policy
                .external(&chunk.chunk_id, || self.embedder.embed(&chunk.text))
                .await?;
            embedded.push(EmbeddedChunk { chunk, embedding });

            let done = index + 1;
            if done % PROGRESS_EVERY_CHUNKS == 0 || done == total {
                self.tracker
                    .update(
                        doc_id,
                        PipelineStatus::Processing,
                        interpolate_progress(30, 50, done, total),
                        format!("Processing chunk {done}/{total}..."),
                    )
                    .await?;
            }
        }

        self.tracker
            .update(
                doc_id,
                PipelineStatus::Processing,
                85,
                "Storing vectors in database...",
            )
            .await?;
        let stored = self.store_vectors(doc_id, embedded).await?;

        let outcome = IngestionOutcome {
            total_pages: pages.len(),
            total_chunks: stored,
        };
        self.documents
            .update_document(
                doc_id,
                DocumentUpdate::status(PipelineStatus::Ready)
                    .with_counts(outcome.total_pages, outcome.total_chunks),
            )
            .await?;
        self.tracker
            .update(
                doc_id,
                PipelineStatus::Ready,
                100,
                "Processing complete. Ready for note generation.",
            )
            .await?;

        self.metrics.record_ingestion(stored as u64);
        tracing::info!(
            doc_id = %doc_id,
            pages = outcome.total_pages,
            chunks = outcome.total_chunks,
            "Document indexed"
        );
        Ok(outcome)
    }

    /// Check that generation may start and mark the document as generating.
    ///
    /// Accepted from `ready`, `completed`, or `failed` once chunks were indexed.
    pub async fn start_generation(&self, doc_id: Uuid) -> Result<JobStatusRecord, PipelineError> {
        let document = self
            .documents
            .get_document(doc_id)
            .await?
            .ok_or(PipelineError::DocumentNotFound(doc_id))?;

        let accepted = match document.status {
            PipelineStatus::Ready | PipelineStatus::Completed => true,
            PipelineStatus::Failed => document.is_indexed(),
            _ => false,
        };
        if !accepted {
            return Err(PipelineError::NotReady(document.status));
        }

        self.documents
            .update_document(doc_id, DocumentUpdate::status(PipelineStatus::Generating))
            .await?;
        Ok(self
            .tracker
            .update(
                doc_id,
                PipelineStatus::Generating,
                0,
                "Starting note generation...",
            )
            .await?)
    }

    /// Start generation after the guard accepts it, running the pipeline in the background.
    pub async fn request_generation(
        &self,
        doc_id: Uuid,
    ) -> Result<(JobStatusRecord, PipelineHandle<NotesRecord>), PipelineError> {
        let status = self.start_generation(doc_id).await?;
        let handle = self.spawn_guarded(doc_id, move |service| async move {
            service.generate_notes(doc_id).await
        });
        Ok((status, handle))
    }

    /// Segment stored chunks, generate per-section notes, and persist the reduced document.
    pub async fn generate_notes(&self, doc_id: Uuid) -> Result<NotesRecord, PipelineError> {
        let started = Instant::now();
        tracing::info!(doc_id = %doc_id, "Generating notes");
        self.tracker
            .update(
                doc_id,
                PipelineStatus::Generating,
                20,
                "Retrieving document chunks...",
            )
            .await?;

        let namespace = doc_id.to_string();
        let stored = self
            .policy
            .external("fetch_all", || self.vectors.fetch_all(&namespace))
            .await?;
        if stored.is_empty() {
            return Err(PipelineError::NoChunks);
        }

        let mut chunks: Vec<Chunk> = stored
            .into_iter()
            .map(|metadata| {
                Chunk::new(
                    metadata.text,
                    metadata.page,
                    metadata.chunk_index,
                    metadata.heading,
                )
            })
            .collect();
        sort_chunks(&mut chunks);
        let title = chunks
            .first()
            .and_then(|chunk| chunk.heading.clone())
            .unwrap_or_default();
        let sections = segment(chunks, self.config.section_max_chunks);
        let total = sections.len();

        self.tracker
            .update(
                doc_id,
                PipelineStatus::Generating,
                40,
                generation_stage(self.config.notes_profile),
            )
            .await?;

        let mut section_notes = Vec::with_capacity(total);
        let mut degraded = 0usize;
        for (index, section) in sections.iter().enumerate() {
            let generated = self.generator.generate(&section.label, &section.chunks).await;
            if generated.degraded {
                degraded += 1;
            }
            section_notes.push(generated.note);

            let done = index + 1;
            tracing::debug!(
                doc_id = %doc_id,
                section = %section.label,
                chunks = section.chunks.len(),
                degraded = generated.degraded,
                "Section processed"
            );
            self.tracker
                .update(
                    doc_id,
                    PipelineStatus::Generating,
                    interpolate_progress(40, 50, done, total),
                    format!("Generated notes for section {done}/{total}..."),
                )
                .await?;
        }

        let notes = self.reducer.reduce(section_notes, &title).await;

        self.tracker
            .update(doc_id, PipelineStatus::Generating, 90, "Saving notes...")
            .await?;
        let record = NotesRecord {
            doc_id,
            title: notes.title.clone(),
            content: notes,
            generation_time_seconds: started.elapsed().as_secs(),
            generated_at: current_timestamp_rfc3339(),
        };
        self.documents.insert_notes(record.clone()).await?;
        self.documents
            .update_document(doc_id, DocumentUpdate::status(PipelineStatus::Completed))
            .await?;

        let stage = if degraded == 0 {
            "Notes generated successfully!".to_string()
        } else {
            tracing::warn!(
                doc_id = %doc_id,
                degraded,
                sections = total,
                "Notes completed with degraded sections"
            );
            format!("Notes generated with {degraded} of {total} sections degraded")
        };
        self.tracker
            .update(doc_id, PipelineStatus::Completed, 100, stage)
            .await?;

        self.metrics
            .record_generation(total as u64, degraded as u64);
        tracing::info!(
            doc_id = %doc_id,
            sections = total,
            degraded,
            seconds = record.generation_time_seconds,
            "Notes generated"
        );
        Ok(record)
    }

    /// Latest job status for a document.
    pub async fn job_status(&self, doc_id: Uuid) -> Result<JobStatusRecord, PipelineError> {
        self.tracker
            .latest(doc_id)
            .await?
            .ok_or(PipelineError::DocumentNotFound(doc_id))
    }

    /// Most recent notes generated for a document.
    pub async fn latest_notes(&self, doc_id: Uuid) -> Result<NotesRecord, PipelineError> {
        self.documents
            .latest_notes(doc_id)
            .await?
            .ok_or(PipelineError::NotesNotFound(doc_id))
    }

    /// Document record, if known.
    pub async fn document(&self, doc_id: Uuid) -> Result<DocumentRecord, PipelineError> {
        self.documents
            .get_document(doc_id)
            .await?
            .ok_or(PipelineError::DocumentNotFound(doc_id))
    }

    /// Remove a document's vectors, records, and uploaded file.
    pub async fn delete_document(&self, doc_id: Uuid) -> Result<(), PipelineError> {
        let namespace = doc_id.to_string();
        self.policy
            .external("delete_namespace", || self.vectors.delete_namespace(&namespace))
            .await?;
        let existed = self.documents.delete_document(doc_id).await?;

        match tokio::fs::remove_file(self.upload_path(doc_id)).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                tracing::warn!(doc_id = %doc_id, error = %error, "Failed to remove uploaded file")
            }
        }

        if !existed {
            return Err(PipelineError::DocumentNotFound(doc_id));
        }
        tracing::info!(doc_id = %doc_id, "Document deleted");
        Ok(())
    }

    /// Report liveness and vector store reachability.
    pub async fn health(&self) -> HealthSnapshot {
        match self.vectors.health_check().await {
            Ok(()) => HealthSnapshot {
                status: "ok",
                vector_store_reachable: true,
                error: None,
            },
            Err(error) => {
                tracing::warn!(error = %error, "Vector store health check failed");
                HealthSnapshot {
                    status: "ok",
                    vector_store_reachable: false,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    /// Retrieve the current metrics snapshot for diagnostics.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn register(
        &self,
        doc_id: Uuid,
        filename: &str,
        file_size: usize,
        stage: &str,
    ) -> Result<(), PipelineError> {
        self.documents
            .insert_document(DocumentRecord::uploaded(doc_id, filename, file_size))
            .await?;
        self.tracker.open(doc_id, stage).await?;
        Ok(())
    }

    async fn store_vectors(
        &self,
        doc_id: Uuid,
        embedded: Vec<EmbeddedChunk>,
    ) -> Result<usize, PipelineError> {
        let namespace = doc_id.to_string();
        let records: Vec<VectorRecord> = embedded
            .into_iter()
            .map(|EmbeddedChunk { chunk, embedding }| VectorRecord {
                id: chunk.chunk_id,
                vector: embedding,
                metadata: ChunkMetadata {
                    text: chunk.text,
                    page: chunk.page,
                    heading: chunk.heading,
                    chunk_index: chunk.chunk_index,
                },
            })
            .collect();

        let mut written = 0usize;
        for batch in records.chunks(self.config.upsert_batch_size.max(1)) {
            written += self
                .policy
                .external("upsert", || self.vectors.upsert(&namespace, batch.to_vec()))
                .await?;
        }
        Ok(written)
    }

    fn upload_path(&self, doc_id: Uuid) -> PathBuf {
        PathBuf::from(&self.config.upload_dir).join(format!("{doc_id}.pdf"))
    }

    /// Spawn a pipeline run whose error or panic is routed through the tracker's failure path.
    fn spawn_guarded<T, F, Fut>(&self, doc_id: Uuid, run: F) -> PipelineHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(NotesService) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
    {
        let service = self.clone();
        let task = tokio::spawn(async move {
            let result = match AssertUnwindSafe(run(service.clone())).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(PipelineError::TaskAborted(panic_message(panic.as_ref()))),
            };
            let failure = result.as_ref().err().map(ToString::to_string);
            if let Some(message) = failure {
                service.record_failure(doc_id, &message).await;
            }
            result
        });
        PipelineHandle { doc_id, task }
    }

    async fn record_failure(&self, doc_id: Uuid, message: &str) {
        self.metrics.record_failure();
        if let Err(track_error) = self.tracker.fail(doc_id, message).await {
            tracing::error!(
                doc_id = %doc_id,
                error = %track_error,
                "Failed to record pipeline failure"
            );
        }
    }
}

fn generation_stage(profile: NotesProfile) -> &'static str {
    match profile {
        NotesProfile::Concise => "Generating concise notes...",
        NotesProfile::Comprehensive => "Generating comprehensive notes...",
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "pipeline task panicked".to_string()
    }
}

#[async_trait]
impl NotesApi for NotesService {
    async fn accept_upload(&self, filename: &str, bytes: Vec<u8>) -> Result<Uuid, PipelineError> {
        Ok(self.upload_pdf(filename, bytes).await?.doc_id())
    }

    async fn accept_pages(
        &self,
        filename: &str,
        pages: Vec<String>,
    ) -> Result<Uuid, PipelineError> {
        Ok(self.submit_pages(filename, pages).await?.doc_id())
    }

    async fn job_status(&self, doc_id: Uuid) -> Result<JobStatusRecord, PipelineError> {
        NotesService::job_status(self, doc_id).await
    }

    async fn request_notes(&self, doc_id: Uuid) -> Result<JobStatusRecord, PipelineError> {
        let (status, _handle) = self.request_generation(doc_id).await?;
        Ok(status)
    }

    async fn latest_notes(&self, doc_id: Uuid) -> Result<NotesRecord, PipelineError> {
        NotesService::latest_notes(self, doc_id).await
    }

    async fn delete_document(&self, doc_id: Uuid) -> Result<(), PipelineError> {
        NotesService::delete_document(self, doc_id).await
    }

    async fn health(&self) -> HealthSnapshot {
        NotesService::health(self).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        NotesService::metrics_snapshot(self)
    }
}
