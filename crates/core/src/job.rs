//! Job record and its lifecycle state machine.
//!
//! ```text
//! queued ──► processing ──► completed
//!                  └──────► failed
//! ```
//!
//! There are no other edges. Terminal states accept no transition and a job
//! is always attempted at least once (no `queued -> completed/failed`).
//! Mutation goes through [`Job::start`], [`Job::complete`], [`Job::fail`] and
//! [`Job::record_progress`], which keep `progress`, `artifact_ref` and
//! `error` consistent with `status`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::generation::GenerationParams;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// `completed` and `failed` accept no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Queued or processing; counted as "active" by the health endpoint.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Whether `self -> next` is an edge of the state machine.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid status '{s}'. Must be one of: queued, processing, completed, failed"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// State errors
// ---------------------------------------------------------------------------

/// A mutation the state machine does not allow.
///
/// Only the dispatcher mutates jobs, so any of these indicates a bug in the
/// caller rather than bad client input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobStateError {
    #[error("invalid job transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("progress can only be reported while processing (job is {0})")]
    ProgressWhileNotProcessing(JobStatus),

    #[error("progress must be a finite number, got {0}")]
    ProgressNotFinite(f64),
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Fraction in `[0.0, 1.0]`.
    pub progress: f64,
    pub parameters: GenerationParams,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Artifact filename; present only when completed.
    pub artifact_ref: Option<String>,
    /// Failure description; present only when failed.
    pub error: Option<String>,
    /// Static estimate of the total generation time, fixed at creation.
    pub estimated_secs: u64,
}

impl Job {
    /// A freshly queued job.
    pub fn new(id: JobId, parameters: GenerationParams, estimated_secs: u64, now: Timestamp) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0.0,
            parameters,
            created_at: now,
            updated_at: now,
            artifact_ref: None,
            error: None,
            estimated_secs,
        }
    }

    fn transition(&mut self, next: JobStatus, now: Timestamp) -> Result<(), JobStateError> {
        if !self.status.can_transition_to(next) {
            return Err(JobStateError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// `queued -> processing`.
    pub fn start(&mut self, now: Timestamp) -> Result<(), JobStateError> {
        self.transition(JobStatus::Processing, now)
    }

    /// `processing -> completed`; pins progress at 1.0.
    pub fn complete(&mut self, artifact_ref: String, now: Timestamp) -> Result<(), JobStateError> {
        self.transition(JobStatus::Completed, now)?;
        self.progress = 1.0;
        self.artifact_ref = Some(artifact_ref);
        Ok(())
    }

    /// `processing -> failed`.
    pub fn fail(&mut self, error: String, now: Timestamp) -> Result<(), JobStateError> {
        self.transition(JobStatus::Failed, now)?;
        self.error = Some(error);
        Ok(())
    }

    /// Record engine progress.
    ///
    /// The value is clamped into `[0.0, 1.0]`. Values below the current
    /// progress are ignored so progress never goes backwards. Returns
    /// whether the stored value changed.
    pub fn record_progress(&mut self, value: f64, now: Timestamp) -> Result<bool, JobStateError> {
        if self.status != JobStatus::Processing {
            return Err(JobStateError::ProgressWhileNotProcessing(self.status));
        }
        if !value.is_finite() {
            return Err(JobStateError::ProgressNotFinite(value));
        }
        let value = value.clamp(0.0, 1.0);
        if value <= self.progress {
            return Ok(false);
        }
        self.progress = value;
        self.updated_at = now;
        Ok(true)
    }
}
