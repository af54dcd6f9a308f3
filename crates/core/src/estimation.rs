//! Static generation-time estimates.
//!
//! Estimates are not measured: a job's total is `step_count` multiplied by a
//! configured per-step cost, fixed when the job is created. The remaining
//! time reported to clients scales that total by unfinished progress.

use crate::job::JobStatus;

/// Rough CPU cost of one denoising step.
pub const DEFAULT_SECONDS_PER_STEP: u64 = 20;

/// Total estimated seconds for a job with `step_count` denoising steps.
pub fn estimate_total_secs(step_count: u32, seconds_per_step: u64) -> u64 {
    u64::from(step_count).saturating_mul(seconds_per_step)
}

/// Remaining seconds to report for a job, or `None` once it is terminal.
pub fn remaining_secs(status: JobStatus, progress: f64, total_secs: u64) -> Option<u64> {
    match status {
        JobStatus::Queued => Some(total_secs),
        JobStatus::Processing => {
            let left = (1.0 - progress.clamp(0.0, 1.0)) * total_secs as f64;
            Some(left.ceil() as u64)
        }
        JobStatus::Completed | JobStatus::Failed => None,
    }
}
