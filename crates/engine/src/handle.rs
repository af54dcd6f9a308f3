//! Shared engine handle with a readiness flag.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use vidgen_core::generation::GenerationParams;

use crate::engine::{GenerationEngine, GenerationError, ProgressFn};

/// Wraps a [`GenerationEngine`] and remembers whether it finished loading.
///
/// Created once at startup; the returned `Arc` is cloned into the API state
/// (for `/health` and submission gating) and into the dispatcher.
pub struct EngineHandle {
    engine: Arc<dyn GenerationEngine>,
    loaded: AtomicBool,
}

impl EngineHandle {
    pub fn new(engine: Arc<dyn GenerationEngine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            loaded: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// Whether [`EngineHandle::load`] has completed successfully.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Load the engine. A no-op once loaded.
    pub async fn load(&self) -> Result<(), GenerationError> {
        if self.is_loaded() {
            return Ok(());
        }
        tracing::info!(engine = self.name(), "Initializing generation engine");
        self.engine.load().await?;
        self.loaded.store(true, Ordering::Release);
        tracing::info!(engine = self.name(), "Generation engine initialized");
        Ok(())
    }

    /// Load in the background. A failed load is logged and leaves the
    /// service running in the `initializing` state.
    pub fn spawn_load(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let handle = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = handle.load().await {
                tracing::error!(engine = handle.name(), error = %e, "Failed to initialize engine");
            }
        })
    }

    pub async fn invoke(
        &self,
        params: &GenerationParams,
        on_progress: ProgressFn,
    ) -> Result<PathBuf, GenerationError> {
        if !self.is_loaded() {
            return Err(GenerationError::NotLoaded);
        }
        self.engine.invoke(params, on_progress).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use vidgen_core::generation::GenerateRequest;

    use super::*;

    struct CountingEngine {
        loads: AtomicUsize,
        fail_load: bool,
    }

    #[async_trait]
    impl GenerationEngine for CountingEngine {
        fn name(&self) -> &str {
            "counting"
        }

        async fn load(&self) -> Result<(), GenerationError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_load {
                return Err(GenerationError::Load("weights missing".into()));
            }
            Ok(())
        }

        async fn invoke(
            &self,
            _params: &GenerationParams,
            on_progress: ProgressFn,
        ) -> Result<PathBuf, GenerationError> {
            on_progress(1.0);
            Ok(PathBuf::from("/tmp/out.mp4"))
        }
    }

    fn params() -> GenerationParams {
        GenerateRequest {
            prompt: "test".into(),
            ..Default::default()
        }
        .resolve()
        .unwrap()
    }

    fn handle(fail_load: bool) -> (Arc<CountingEngine>, Arc<EngineHandle>) {
        let engine = Arc::new(CountingEngine {
            loads: AtomicUsize::new(0),
            fail_load,
        });
        let handle = EngineHandle::new(engine.clone());
        (engine, handle)
    }

    #[tokio::test]
    async fn invoke_before_load_is_rejected() {
        let (_, handle) = handle(false);
        assert!(!handle.is_loaded());
        let result = handle.invoke(&params(), Arc::new(|_| {})).await;
        assert_matches!(result, Err(GenerationError::NotLoaded));
    }

    #[tokio::test]
    async fn load_runs_once() {
        let (engine, handle) = handle(false);
        handle.load().await.unwrap();
        handle.load().await.unwrap();
        assert!(handle.is_loaded());
        assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
        assert!(handle.invoke(&params(), Arc::new(|_| {})).await.is_ok());
    }

    #[tokio::test]
    async fn failed_background_load_leaves_handle_unloaded() {
        let (_, handle) = handle(true);
        handle.spawn_load().await.unwrap();
        assert!(!handle.is_loaded());
    }
}
