//! Document pipelines: chunking, segmentation, retry policy, and orchestration.

pub mod chunking;
pub mod policy;
pub mod segment;
mod service;
pub mod types;

pub use chunking::{WordWindow, chunk, detect_heading};
pub use policy::{FailureMode, ResiliencePolicy, UnitKind, UnitOutcome};
pub use segment::{Section, segment};
pub use service::{NotesApi, NotesService, PipelineHandle, ServiceParts};
pub use types::{
    Chunk, ChunkingError, EmbeddedChunk, HealthSnapshot, IngestionOutcome, PageSource, PageText,
    PipelineError,
};
