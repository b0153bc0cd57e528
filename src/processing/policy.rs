//! Retry-and-degrade policy shared by every unit of pipeline work.
//!
//! Each unit kind declares once what happens when its retries are exhausted: generation of a
//! single section or of the summary degrades to a fallback value, while calls to external
//! capabilities fail the whole run. Call sites only supply the fallback value.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::Config;

const MAX_BACKOFF_EXPONENT: u32 = 5;

/// Unit of work guarded by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Structured note generation for one section.
    Section,
    /// Free-text executive summary for the document.
    Summary,
    /// Embedding, vector store, or persistence round trip.
    External,
}

/// What exhaustion of a unit's retries means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Substitute a fallback and keep going.
    Degrade,
    /// Abort the run.
    Fail,
}

impl UnitKind {
    /// Failure mode declared for this unit kind.
    pub const fn failure_mode(self) -> FailureMode {
        match self {
            Self::Section | Self::Summary => FailureMode::Degrade,
            Self::External => FailureMode::Fail,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Section => "section",
            Self::Summary => "summary",
            Self::External => "external",
        }
    }
}

/// Result of running a unit under the policy.
#[derive(Debug)]
pub enum UnitOutcome<T, E> {
    /// The unit succeeded, possibly after retries.
    Completed(T),
    /// Retries ran out for a unit that degrades.
    Degraded(E),
    /// Retries ran out for a unit that fails the run.
    Failed(E),
}

impl<T, E> UnitOutcome<T, E> {
    /// Resolve to a value, building the fallback only for degraded units.
    pub fn resolve(self, fallback: impl FnOnce(E) -> T) -> Result<T, E> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Degraded(error) => Ok(fallback(error)),
            Self::Failed(error) => Err(error),
        }
    }

    /// Whether the fallback path was taken.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Bounded exponential backoff applied uniformly to pipeline units.
#[derive(Debug, Clone, Copy)]
pub struct ResiliencePolicy {
    max_attempts: usize,
    base_delay: Duration,
}

impl ResiliencePolicy {
    /// Build a policy; at least one attempt is always made.
    pub fn new(max_attempts: usize, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy described by the runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.retry_max_attempts,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    /// Single attempt, no delay.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `op` until it succeeds or attempts run out.
    pub async fn execute<T, E, F, Fut>(
        &self,
        unit: UnitKind,
        label: &str,
        mut op: F,
    ) -> UnitOutcome<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1usize;
        loop {
            match op().await {
                Ok(value) => return UnitOutcome::Completed(value),
                Err(error) if attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::debug!(
                        unit = unit.as_str(),
                        label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying pipeline unit"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    return match unit.failure_mode() {
                        FailureMode::Degrade => {
                            tracing::warn!(
                                unit = unit.as_str(),
                                label,
                                attempts = attempt,
                                error = %error,
                                "Pipeline unit degraded to fallback"
                            );
                            UnitOutcome::Degraded(error)
                        }
                        FailureMode::Fail => {
                            tracing::error!(
                                unit = unit.as_str(),
                                label,
                                attempts = attempt,
                                error = %error,
                                "Pipeline unit failed"
                            );
                            UnitOutcome::Failed(error)
                        }
                    };
                }
            }
        }
    }

    /// Run an external call, surfacing its final error.
    pub async fn external<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.execute(UnitKind::External, label, op).await {
            UnitOutcome::Completed(value) => Ok(value),
            UnitOutcome::Degraded(error) | UnitOutcome::Failed(error) => Err(error),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let exponent = (attempt.saturating_sub(1) as u32).min(MAX_BACKOFF_EXPONENT);
        self.base_delay * (1u32 << exponent)
    }
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
