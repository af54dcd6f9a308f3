use std::sync::Arc;

use vidgen_engine::EngineHandle;
use vidgen_store::{ArtifactStore, JobStore};
use vidgen_worker::Dispatcher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (every field is behind an `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// In-memory job table.
    pub jobs: Arc<JobStore>,
    /// Finished videos on disk.
    pub artifacts: Arc<ArtifactStore>,
    /// Worker pool that runs queued jobs.
    pub dispatcher: Arc<Dispatcher>,
    /// Generation engine; its readiness gates submissions and `/health`.
    pub engine: Arc<EngineHandle>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
