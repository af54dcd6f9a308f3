//! REST client for the API gateway.
//!
//! Wraps the handful of API endpoints the webhook gateway forwards to,
//! using [`reqwest`].

use std::time::Duration;

use serde::Deserialize;
use vidgen_core::generation::GenerateRequest;
use vidgen_core::job::JobStatus;

/// Errors from the upstream API layer.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The HTTP request itself failed (connect, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The API's `error` message, or the raw body when absent.
        message: String,
    },
}

/// Accepted submission as returned by `POST /api/generate`.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
}

/// Job projection as returned by `GET /api/status/{job_id}`.
#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: f64,
    pub video_url: Option<String>,
    pub error: Option<String>,
}

/// HTTP client for one API gateway.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` (no trailing slash).
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a generation request.
    pub async fn submit(&self, request: &GenerateRequest) -> Result<SubmitResponse, UpstreamError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch one job's status.
    ///
    /// `job_id` is inserted into the path as-is; callers validate it first
    /// when it comes from a client.
    pub async fn status(&self, job_id: &str) -> Result<StatusResponse, UpstreamError> {
        let response = self
            .client
            .get(format!("{}/api/status/{job_id}", self.base_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the API's capability table.
    pub async fn info(&self) -> Result<serde_json::Value, UpstreamError> {
        let response = self
            .client
            .get(format!("{}/api/info", self.base_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Deserialize a 2xx body, or turn anything else into
    /// [`UpstreamError::Api`] carrying the API's error message.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or(body);
        Err(UpstreamError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
