use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vidgen_core::error::CoreError;

use crate::upstream::UpstreamError;

/// Error type for webhook handlers.
///
/// Renders as `{ "success": false, "error": message, "code": CODE }` so
/// automation tools can branch on `success` uniformly.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error (validation of the webhook body).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The API rejected the forwarded request with a client error.
    #[error("Upstream rejected request ({status}): {message}")]
    Upstream { status: StatusCode, message: String },

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Request(e) if e.is_decode() => {
                tracing::error!(error = %e, "API gateway returned an unreadable response");
                AppError::Core(CoreError::ServiceUnavailable(
                    "Backend API error: unreadable response".to_string(),
                ))
            }
            UpstreamError::Request(e) => {
                tracing::error!(error = %e, "API gateway unreachable");
                AppError::Core(CoreError::ServiceUnavailable(
                    "Backend API not available".to_string(),
                ))
            }
            UpstreamError::Api { status: 404, .. } => AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: String::new(),
            }),
            UpstreamError::Api { status, message } => {
                match StatusCode::from_u16(status) {
                    Ok(code) if code.is_client_error() => AppError::Upstream {
                        status: code,
                        message,
                    },
                    _ => {
                        tracing::error!(status, error = %message, "API gateway returned an error");
                        AppError::Core(CoreError::ServiceUnavailable(format!(
                            "Backend API error: {message}"
                        )))
                    }
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, .. } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::ServiceUnavailable(msg) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    msg.clone(),
                ),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Upstream { status, message } => (*status, "UPSTREAM_REJECTED", message.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn upstream_not_found_stays_not_found() {
        let err: AppError = UpstreamError::Api {
            status: 404,
            message: "Job not found".into(),
        }
        .into();
        assert_matches!(err, AppError::Core(CoreError::NotFound { .. }));
    }

    #[test]
    fn upstream_client_errors_pass_through() {
        let err: AppError = UpstreamError::Api {
            status: 400,
            message: "width must be divisible by 16".into(),
        }
        .into();
        assert_matches!(
            err,
            AppError::Upstream { status, message }
                if status == StatusCode::BAD_REQUEST && message.contains("divisible")
        );
    }

    #[test]
    fn upstream_server_errors_become_unavailable() {
        for status in [500, 503] {
            let err: AppError = UpstreamError::Api {
                status,
                message: "Model not initialized yet".into(),
            }
            .into();
            assert_matches!(err, AppError::Core(CoreError::ServiceUnavailable(_)));
        }
    }
}
