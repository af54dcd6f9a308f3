pub mod health;
pub mod info;
pub mod jobs;
pub mod videos;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// POST   /generate              submit a job
/// GET    /status/{job_id}       job status
/// GET    /jobs                  list jobs (?status=&limit=)
/// DELETE /jobs/{job_id}         delete a job and its video
/// GET    /videos/{filename}     stream a finished video
/// GET    /info                  parameter ranges, presets, estimates
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(jobs::router())
        .nest("/videos", videos::router())
        .merge(info::router())
}
