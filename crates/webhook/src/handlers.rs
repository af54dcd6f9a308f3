//! Webhook endpoints.
//!
//! Every response carries `success` and a `timestamp` so automation tools can
//! branch and log without inspecting status codes.

use std::sync::LazyLock;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::Json;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vidgen_core::error::CoreError;
use vidgen_core::generation::GenerateRequest;
use vidgen_core::job::JobStatus;
use vidgen_core::preset::Preset;
use vidgen_core::types::{now, Timestamp};

use crate::error::{AppError, AppResult};
use crate::state::WebhookState;

/// Lowercase hyphenated job id.
static JOB_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9-]{36}$").expect("valid regex"));

/// The only video URL shape the API hands out.
static VIDEO_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/api/videos/([a-f0-9-]{36})\.mp4$").expect("valid regex"));

const SERVICE_NAME: &str = "vidgen webhook gateway";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

fn default_preset() -> Option<String> {
    Some(Preset::Portrait60s.name().to_string())
}

/// Body of `POST /webhook/generate`.
#[derive(Debug, Deserialize)]
pub struct WebhookGenerateRequest {
    #[serde(default)]
    pub prompt: String,
    /// Defaults to `portrait_60s`; an explicit `null` disables presets.
    #[serde(default = "default_preset")]
    pub preset: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub video_length: Option<i64>,
    pub fps: Option<i64>,
    pub seed: Option<i64>,
    pub num_inference_steps: Option<i64>,
    /// Accepted for compatibility; no completion callback is sent.
    pub webhook_url: Option<String>,
}

impl WebhookGenerateRequest {
    /// The API request this webhook body stands for, preset expanded.
    pub fn into_api_request(self) -> Result<GenerateRequest, CoreError> {
        GenerateRequest {
            prompt: self.prompt,
            width: self.width,
            height: self.height,
            video_length: self.video_length,
            fps: self.fps,
            seed: self.seed,
            num_inference_steps: self.num_inference_steps,
            preset: self.preset,
            ..Default::default()
        }
        .expand_preset()
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookGenerateResponse {
    pub success: bool,
    pub job_id: String,
    pub status: JobStatus,
    pub message: &'static str,
    pub status_url: String,
    pub estimated_time_seconds: u64,
    pub timestamp: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct WebhookStatusResponse {
    pub success: bool,
    pub job_id: String,
    pub status: JobStatus,
    pub progress_percent: f64,
    pub video_url: Option<String>,
    /// Present only once the job is completed.
    pub download_url: Option<String>,
    pub error: Option<String>,
    pub timestamp: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct WebhookDownloadResponse {
    pub success: bool,
    pub job_id: String,
    pub download_url: String,
    pub message: &'static str,
    pub instructions: &'static str,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_valid_job_id(job_id: &str) -> bool {
    JOB_ID_RE.is_match(job_id)
}

/// Check that `video_url` is exactly the API path for `job_id`'s video.
fn validate_video_path(video_url: &str, job_id: &str) -> bool {
    VIDEO_PATH_RE
        .captures(video_url)
        .and_then(|caps| caps.get(1))
        .is_some_and(|m| m.as_str() == job_id)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /
pub async fn root(State(state): State<WebhookState>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "api_base_url": state.api.base_url(),
        "endpoints": {
            "generate": "/webhook/generate (POST)",
            "status": "/webhook/status/{job_id} (GET)",
            "download": "/webhook/download/{job_id} (GET)",
            "info": "/webhook/info (GET)",
            "test": "/webhook/test (POST)",
        },
        "presets": Preset::ALL.iter().map(|p| p.name()).collect::<Vec<_>>(),
    }))
}

/// POST /webhook/generate
///
/// Expands the preset, validates locally and forwards to the API.
pub async fn generate(
    State(state): State<WebhookState>,
    body: Result<Json<WebhookGenerateRequest>, JsonRejection>,
) -> AppResult<Json<WebhookGenerateResponse>> {
    let Json(body) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let request = body.into_api_request()?;
    // Reject locally what the API would reject anyway.
    request.resolve()?;

    let accepted = state.api.submit(&request).await?;

    tracing::info!(
        job_id = %accepted.job_id,
        width = ?request.width,
        height = ?request.height,
        "Forwarded webhook generation request",
    );

    Ok(Json(WebhookGenerateResponse {
        success: true,
        status_url: format!("/webhook/status/{}", accepted.job_id),
        job_id: accepted.job_id,
        status: accepted.status,
        message: "Video generation started successfully",
        estimated_time_seconds: state.config.estimated_secs,
        timestamp: now(),
    }))
}

/// GET /webhook/status/{job_id}
pub async fn status(
    State(state): State<WebhookState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<WebhookStatusResponse>> {
    if !is_valid_job_id(&job_id) {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: job_id,
        }));
    }

    let upstream = state.api.status(&job_id).await?;

    let download_url = (upstream.status == JobStatus::Completed && upstream.video_url.is_some())
        .then(|| format!("/webhook/download/{job_id}"));

    Ok(Json(WebhookStatusResponse {
        success: true,
        job_id: upstream.job_id,
        status: upstream.status,
        progress_percent: upstream.progress * 100.0,
        video_url: upstream.video_url,
        download_url,
        error: upstream.error,
        timestamp: now(),
    }))
}

/// GET /webhook/download/{job_id}
///
/// Returns an absolute URL on the API for a completed video. The id is
/// checked before the API is contacted, and the API's `video_url` is
/// checked again before it is echoed back.
pub async fn download(
    State(state): State<WebhookState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<WebhookDownloadResponse>> {
    if !is_valid_job_id(&job_id) {
        return Err(AppError::BadRequest("Invalid job ID format".to_string()));
    }

    let upstream = state.api.status(&job_id).await?;

    if upstream.status != JobStatus::Completed {
        return Err(AppError::BadRequest(format!(
            "Video not ready. Current status: {}",
            upstream.status
        )));
    }

    let Some(video_path) = upstream.video_url else {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Video",
            id: job_id,
        }));
    };

    if !validate_video_path(&video_path, &job_id) {
        tracing::warn!(%job_id, video_url = %video_path, "API returned an unexpected video URL");
        return Err(AppError::BadRequest("Invalid video path format".to_string()));
    }

    Ok(Json(WebhookDownloadResponse {
        success: true,
        download_url: format!("{}{video_path}", state.api.base_url()),
        job_id,
        message: "Video is ready for download",
        instructions: "Download the video from the download_url provided",
    }))
}

/// GET /webhook/info
pub async fn info(State(state): State<WebhookState>) -> AppResult<Json<Value>> {
    match state.api.info().await {
        Ok(info) => Ok(Json(info)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get API info");
            Err(AppError::Core(CoreError::ServiceUnavailable(
                "Backend API not available".to_string(),
            )))
        }
    }
}

/// POST /webhook/test
///
/// Echoes a JSON body back; anything that is not JSON is treated as empty.
pub async fn test_webhook(headers: HeaderMap, body: Bytes) -> AppResult<Json<Value>> {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let received = if is_json && !body.is_empty() {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?
    } else {
        json!({})
    };

    Ok(Json(json!({
        "success": true,
        "message": "Webhook test successful!",
        "received": received,
        "timestamp": now(),
        "service": SERVICE_NAME,
    })))
}
