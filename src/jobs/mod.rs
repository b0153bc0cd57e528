//! Job status state machine and tracker for externally polled pipeline progress.

mod status;
mod tracker;

pub use status::{JobStatusRecord, PipelineStatus, STAGE_MAX_CHARS, UnknownStatus, truncate_stage};
pub use tracker::{JobError, JobTracker, interpolate_progress};
