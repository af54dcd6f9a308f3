//! Streaming of finished videos.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio_util::io::ReaderStream;
use vidgen_store::artifacts::ARTIFACT_CONTENT_TYPE;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/videos/{filename}
///
/// The filename must be exactly `<job id>.mp4` for a completed job; anything
/// else is rejected before the filesystem is consulted.
pub async fn get_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let artifact = state.artifacts.open_for_read(&filename).await?;

    tracing::debug!(job_id = %artifact.id, bytes = artifact.len, "Streaming video");

    let stream = ReaderStream::new(artifact.file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ARTIFACT_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, artifact.len.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.name),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
