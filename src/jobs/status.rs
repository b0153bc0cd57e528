//! Pipeline status enumeration and its transition table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Stage text is capped at this many characters.
pub const STAGE_MAX_CHARS: usize = 100;
const ELLIPSIS: &str = "...";

/// Lifecycle of a document across ingestion and generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// File accepted, nothing processed yet.
    Uploaded,
    /// Ingestion pipeline running.
    Processing,
    /// Chunks indexed; notes can be generated.
    Ready,
    /// Generation pipeline running.
    Generating,
    /// Notes persisted.
    Completed,
    /// The last run terminated with an error.
    Failed,
}

impl PipelineStatus {
    /// All variants in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Uploaded,
        Self::Processing,
        Self::Ready,
        Self::Generating,
        Self::Completed,
        Self::Failed,
    ];

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Running states may repeat to report progress; `failed` is reachable only from a running
    /// state; a new run may start from any settled state except a fresh upload going straight
    /// to generation.
    pub const fn can_transition_to(self, next: Self) -> bool {
        use PipelineStatus::*;
        matches!(
            (self, next),
            (Uploaded, Processing)
                | (Processing, Processing | Ready | Failed)
                | (Ready, Processing | Generating)
                | (Generating, Generating | Completed | Failed)
                | (Completed, Processing | Generating)
                | (Failed, Processing | Generating)
        )
    }

    /// Whether a pipeline run is in flight.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Processing | Self::Generating)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted status string did not name a known state.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown pipeline status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for PipelineStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Latest externally polled progress for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusRecord {
    /// Document the run belongs to.
    pub doc_id: Uuid,
    /// Current state.
    pub status: PipelineStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
    /// Human-readable checkpoint description.
    pub current_stage: Option<String>,
    /// RFC 3339 time of the update.
    pub updated_at: String,
}

/// Cap a message at [`STAGE_MAX_CHARS`], marking truncation with a trailing ellipsis.
pub fn truncate_stage(message: &str) -> String {
    if message.chars().count() <= STAGE_MAX_CHARS {
        return message.to_string();
    }
    let keep = STAGE_MAX_CHARS - ELLIPSIS.len();
    let mut truncated: String = message.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineStatus::*;

    #[test]
    fn happy_path_transitions_are_allowed() {
        let path = [Uploaded, Processing, Ready, Generating, Completed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn failed_is_reachable_only_from_running_states() {
        for status in PipelineStatus::ALL {
            assert_eq!(status.can_transition_to(Failed), status.is_running(), "{status}");
        }
    }

    #[test]
    fn settled_states_allow_new_runs() {
        assert!(Failed.can_transition_to(Generating));
        assert!(Failed.can_transition_to(Processing));
        assert!(Completed.can_transition_to(Generating));
        assert!(!Uploaded.can_transition_to(Generating));
        assert!(!Ready.can_transition_to(Completed));
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in PipelineStatus::ALL {
            assert_eq!(status.as_str().parse::<PipelineStatus>(), Ok(status));
        }
        assert_eq!(" READY ".parse::<PipelineStatus>(), Ok(Ready));
        assert_eq!(
            "archived".parse::<PipelineStatus>(),
            Err(UnknownStatus("archived".into()))
        );
        let json = serde_json::to_string(&Generating).expect("serialize");
        assert_eq!(json, "\"generating\"");
    }

    #[test]
    fn long_messages_are_truncated_to_one_hundred_chars() {
        let message = "e".repeat(150);
        let stage = truncate_stage(&message);
        assert_eq!(stage.chars().count(), 100);
        assert!(stage.ends_with("..."));
        assert_eq!(&stage[..97], &message[..97]);
    }

    #[test]
    fn short_messages_are_kept() {
        let exact = "x".repeat(100);
        assert_eq!(truncate_stage(&exact), exact);
        assert_eq!(truncate_stage("boom"), "boom");
    }
}
