//! Route definitions for job submission and the job resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{generation, jobs};
use crate::state::AppState;

/// ```text
/// POST   /generate          -> generation::submit
/// GET    /status/{job_id}   -> jobs::get_status
/// GET    /jobs              -> jobs::list_jobs
/// DELETE /jobs/{job_id}     -> jobs::delete_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generation::submit))
        .route("/status/{job_id}", get(jobs::get_status))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{job_id}", delete(jobs::delete_job))
}
