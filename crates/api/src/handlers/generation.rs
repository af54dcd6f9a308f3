//! Handler for `POST /api/generate`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use vidgen_core::error::CoreError;
use vidgen_core::estimation::estimate_total_secs;
use vidgen_core::generation::GenerateRequest;
use vidgen_core::job::JobStatus;
use vidgen_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Acknowledgement of an accepted submission.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub message: &'static str,
    pub check_status_url: String,
}

/// POST /api/generate
///
/// Validates the request, records a queued job and hands it to the
/// dispatcher. Never waits for generation.
pub async fn submit(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> AppResult<Json<JobResponse>> {
    if !state.engine.is_loaded() {
        return Err(AppError::Core(CoreError::ServiceUnavailable(
            "Model not initialized yet. Please try again in a few moments.".to_string(),
        )));
    }

    let Json(request) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let params = request.resolve()?;

    let estimate = estimate_total_secs(params.step_count, state.config.seconds_per_step);
    let job = state.jobs.create(params, estimate);

    if let Err(e) = state.dispatcher.enqueue(job.id) {
        // Nothing will ever run it; do not leave a phantom queued job.
        if let Err(rollback) = state.jobs.delete(job.id) {
            tracing::warn!(job_id = %job.id, error = %rollback, "Failed to roll back unqueued job");
        }
        return Err(AppError::Core(CoreError::ServiceUnavailable(e.to_string())));
    }

    tracing::info!(
        job_id = %job.id,
        width = job.parameters.width,
        height = job.parameters.height,
        frames = job.parameters.frame_count,
        steps = job.parameters.step_count,
        preset = request.preset.as_deref().unwrap_or("none"),
        "Video generation job created",
    );

    Ok(Json(JobResponse {
        job_id: job.id,
        status: job.status,
        message: "Video generation job submitted successfully",
        check_status_url: format!("/api/status/{}", job.id),
    }))
}
