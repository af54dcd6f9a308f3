use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` once the engine is loaded, `initializing` before.
    pub status: &'static str,
    pub model_loaded: bool,
    /// Jobs that are queued or processing.
    pub active_jobs: usize,
    pub total_jobs: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.engine.is_loaded();
    let counts = state.jobs.counts();

    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "initializing" },
        model_loaded,
        active_jobs: counts.active,
        total_jobs: counts.total,
    })
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "vidgen API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "description": "Asynchronous text-to-video job service",
        "endpoints": {
            "health": "/health",
            "info": "/api/info",
            "generate": "/api/generate",
            "status": "/api/status/{job_id}",
            "video": "/api/videos/{filename}",
            "jobs": "/api/jobs",
        },
    }))
}
