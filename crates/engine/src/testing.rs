//! In-process engine double for dispatcher and gateway test suites.
//!
//! [`ScriptedEngine`] decides the outcome of a run from the prompt:
//!
//! | prompt contains | outcome                               |
//! |-----------------|---------------------------------------|
//! | `fail`          | `GenerationError::Failed`             |
//! | `panic`         | the invocation panics                 |
//! | anything else   | writes a small file and returns it    |
//!
//! A gated engine parks every invocation until [`ScriptedEngine::release`]
//! hands out a permit, which lets tests observe jobs mid-flight.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use vidgen_core::generation::GenerationParams;

use crate::engine::{GenerationEngine, GenerationError, ProgressFn};

/// Bytes written for every successful scripted run.
pub const SCRIPTED_VIDEO_BYTES: &[u8] = b"scripted video bytes";

pub struct ScriptedEngine {
    output_dir: PathBuf,
    gate: Option<Semaphore>,
    fail_load: bool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    invoked: Mutex<Vec<String>>,
}

/// Decrements the in-flight counter even if the run panics.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedEngine {
    /// Runs complete immediately.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            gate: None,
            fail_load: false,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            invoked: Mutex::new(Vec::new()),
        }
    }

    /// Runs wait for [`ScriptedEngine::release`] before finishing.
    pub fn gated(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(output_dir)
        }
    }

    /// `load` always fails.
    pub fn failing_load(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fail_load: true,
            ..Self::new(output_dir)
        }
    }

    /// Let `n` parked runs finish.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous runs observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Prompts in the order the engine was invoked.
    pub fn invoked_prompts(&self) -> Vec<String> {
        self.invoked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl GenerationEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn load(&self) -> Result<(), GenerationError> {
        if self.fail_load {
            return Err(GenerationError::Load("scripted load failure".into()));
        }
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    async fn invoke(
        &self,
        params: &GenerationParams,
        on_progress: ProgressFn,
    ) -> Result<PathBuf, GenerationError> {
        self.invoked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(params.prompt.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        on_progress(0.25);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| GenerationError::Failed(e.to_string()))?
                .forget();
        }
        on_progress(0.75);

        if params.prompt.contains("panic") {
            panic!("scripted engine panic");
        }
        if params.prompt.contains("fail") {
            return Err(GenerationError::Failed("scripted failure".into()));
        }

        let path = self
            .output_dir
            .join(format!("{}.out.mp4", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&path, SCRIPTED_VIDEO_BYTES).await?;
        Ok(path)
    }
}
