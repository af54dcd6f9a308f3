use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use vidgen_core::generation::GenerationParams;

/// Progress callback handed to the engine. Receives a fraction in `[0, 1]`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Failure raised by the engine. Never surfaced synchronously to API
/// callers; the dispatcher stores the message on the failed job.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    #[error("engine is not loaded")]
    NotLoaded,

    #[error("engine failed to load: {0}")]
    Load(String),

    #[error("generation failed: {0}")]
    Failed(String),

    #[error("engine I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for GenerationError {
    fn from(err: std::io::Error) -> Self {
        GenerationError::Io(err.to_string())
    }
}

/// A long-running generation backend.
///
/// Implementations must tolerate being invoked from several workers at once
/// only up to the concurrency the dispatcher is configured with; the
/// dispatcher guards invocations with a semaphore sized from configuration.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Short identifier used in logs and `/api/info`.
    fn name(&self) -> &str;

    /// One-time initialization (model weights, scratch space).
    async fn load(&self) -> Result<(), GenerationError>;

    /// Produce a video for `params`, returning the path of the output file.
    async fn invoke(
        &self,
        params: &GenerationParams,
        on_progress: ProgressFn,
    ) -> Result<PathBuf, GenerationError>;
}
