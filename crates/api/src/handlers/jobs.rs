//! Handlers for job status, listing and deletion.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use vidgen_core::error::CoreError;
use vidgen_core::estimation::remaining_secs;
use vidgen_core::job::{Job, JobStatus};
use vidgen_core::types::{JobId, Timestamp};
use vidgen_store::jobs::MAX_LIST_LIMIT;
use vidgen_store::JobFilter;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Client-facing projection of a job.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub video_url: Option<String>,
    pub error: Option<String>,
    /// Remaining seconds; `null` once the job is terminal.
    pub estimated_time: Option<u64>,
}

impl From<&Job> for JobStatusResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress: job.progress,
            created_at: job.created_at,
            updated_at: job.updated_at,
            video_url: job.artifact_ref.as_deref().map(video_url),
            error: job.error.clone(),
            estimated_time: remaining_secs(job.status, job.progress, job.estimated_secs),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteJobResponse {
    pub message: &'static str,
    pub job_id: JobId,
}

/// Query parameters for `GET /api/jobs`.
///
/// Both are taken as strings so malformed values produce the same JSON
/// error body as every other validation failure.
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub limit: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Public URL of a stored artifact.
pub fn video_url(artifact_ref: &str) -> String {
    format!("/api/videos/{artifact_ref}")
}

/// Parse a path segment as a job id. Anything unparsable is simply an
/// unknown job.
fn parse_job_id(raw: &str) -> Result<JobId, AppError> {
    JobId::try_parse(raw).map_err(|_| {
        AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: raw.to_string(),
        })
    })
}

fn parse_filter(query: ListJobsQuery) -> Result<JobFilter, AppError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<JobStatus>)
        .transpose()?;

    let limit = match query.limit.as_deref() {
        None | Some("") => None,
        Some(raw) => {
            let limit: usize = raw.trim().parse().map_err(|_| {
                AppError::BadRequest(format!("limit must be an integer between 1 and {MAX_LIST_LIMIT}"))
            })?;
            if !(1..=MAX_LIST_LIMIT).contains(&limit) {
                return Err(AppError::BadRequest(format!(
                    "limit must be an integer between 1 and {MAX_LIST_LIMIT}"
                )));
            }
            Some(limit)
        }
    };

    Ok(JobFilter { status, limit })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/status/{job_id}
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<JobStatusResponse>> {
    let id = parse_job_id(&job_id)?;
    let job = state.jobs.get(id)?;
    Ok(Json(JobStatusResponse::from(&job)))
}

/// GET /api/jobs?status=&limit=
///
/// Jobs in submission order, optionally filtered by status.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> AppResult<Json<Vec<JobStatusResponse>>> {
    let filter = parse_filter(query)?;
    let jobs = state.jobs.list(filter);
    Ok(Json(jobs.iter().map(JobStatusResponse::from).collect()))
}

/// DELETE /api/jobs/{job_id}
///
/// Removes the record and its video. Rejected with 409 while the job is
/// processing.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<DeleteJobResponse>> {
    let id = parse_job_id(&job_id)?;
    let job = state.jobs.delete(id)?;

    // Failed jobs may still own a partial file from an interrupted store.
    if let Err(e) = state.artifacts.remove(id).await {
        tracing::warn!(job_id = %id, error = %e, "Failed to delete video file");
    }

    tracing::info!(job_id = %id, status = %job.status, "Deleted job");

    Ok(Json(DeleteJobResponse {
        message: "Job deleted successfully",
        job_id: id,
    }))
}
