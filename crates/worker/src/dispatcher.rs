//! Background job dispatcher.
//!
//! [`Dispatcher::start`] spawns `workers` long-lived Tokio tasks that share
//! one FIFO queue of job ids. The queue receiver sits behind a fair mutex,
//! so whichever idle worker has waited longest claims the oldest queued job.
//!
//! Engine invocations are additionally gated by a semaphore sized
//! `min(workers, engine_concurrency)`. A worker acquires an engine permit
//! *before* moving its job to `processing`, so the number of processing jobs
//! never exceeds either bound.
//!
//! Failures are local to the job: an engine error, an artifact-store error or
//! a panic inside the engine marks that job `failed` and the worker moves on.
//! No automatic retry is performed and claimed jobs cannot be cancelled.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vidgen_core::types::JobId;
use vidgen_engine::{EngineHandle, ProgressFn};
use vidgen_store::{ArtifactStore, JobStore, StoreError};

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Number of long-lived worker tasks.
    pub workers: usize,
    /// How many invocations the engine can safely run at once.
    pub engine_concurrency: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            engine_concurrency: DEFAULT_WORKERS,
        }
    }
}

impl DispatcherConfig {
    /// Number of engine invocations that may run simultaneously.
    pub fn effective_concurrency(&self) -> usize {
        self.workers.min(self.engine_concurrency).max(1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("dispatcher has shut down")]
    Closed,
}

type SharedQueue = Arc<Mutex<mpsc::UnboundedReceiver<JobId>>>;

/// Handle to the running worker pool.
pub struct Dispatcher {
    queue: mpsc::UnboundedSender<JobId>,
    config: DispatcherConfig,
    cancel: CancellationToken,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawn the worker pool.
    pub fn start(
        config: DispatcherConfig,
        jobs: Arc<JobStore>,
        artifacts: Arc<ArtifactStore>,
        engine: Arc<EngineHandle>,
    ) -> Arc<Self> {
        let workers = config.workers.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let queue: SharedQueue = Arc::new(Mutex::new(rx));
        let engine_permits = Arc::new(Semaphore::new(config.effective_concurrency()));
        let cancel = CancellationToken::new();

        if config.engine_concurrency < workers {
            tracing::warn!(
                workers,
                engine_concurrency = config.engine_concurrency,
                "Engine concurrency is below the worker count; extra workers will wait for the engine",
            );
        }

        let handles = (0..workers)
            .map(|index| {
                let worker = Worker {
                    index,
                    queue: Arc::clone(&queue),
                    jobs: Arc::clone(&jobs),
                    artifacts: Arc::clone(&artifacts),
                    engine: Arc::clone(&engine),
                    engine_permits: Arc::clone(&engine_permits),
                    cancel: cancel.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        tracing::info!(
            workers,
            engine_concurrency = config.effective_concurrency(),
            "Job dispatcher started",
        );

        Arc::new(Self {
            queue: tx,
            config,
            cancel,
            handles: std::sync::Mutex::new(handles),
        })
    }

    /// Queue a job for processing. Never blocks.
    pub fn enqueue(&self, id: JobId) -> Result<(), DispatchError> {
        self.queue.send(id).map_err(|_| DispatchError::Closed)
    }

    pub fn config(&self) -> DispatcherConfig {
        self.config
    }

    /// Stop idle workers and wait for in-flight jobs to finish.
    ///
    /// Jobs still queued stay `queued`; there is no durable queue to hand
    /// them to.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles = std::mem::take(
            &mut *self
                .handles
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task ended abnormally");
            }
        }
        tracing::info!("Job dispatcher shut down");
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker {
    index: usize,
    queue: SharedQueue,
    jobs: Arc<JobStore>,
    artifacts: Arc<ArtifactStore>,
    engine: Arc<EngineHandle>,
    engine_permits: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        tracing::debug!(worker = self.index, "Worker started");
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = self.next_job() => next,
            };
            let Some(job_id) = next else {
                break;
            };
            self.process(job_id).await;
        }
        tracing::debug!(worker = self.index, "Worker stopped");
    }

    async fn next_job(&self) -> Option<JobId> {
        self.queue.lock().await.recv().await
    }

    async fn process(&self, job_id: JobId) {
        let Ok(_permit) = Arc::clone(&self.engine_permits).acquire_owned().await else {
            return;
        };

        let job = match self.jobs.start(job_id) {
            Ok(job) => job,
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(%job_id, "Job deleted before pickup, skipping");
                return;
            }
            Err(e) => {
                tracing::error!(%job_id, error = %e, "Failed to claim job");
                return;
            }
        };

        tracing::info!(
            %job_id,
            worker = self.index,
            width = job.parameters.width,
            height = job.parameters.height,
            frames = job.parameters.frame_count,
            steps = job.parameters.step_count,
            "Job claimed by worker",
        );

        let on_progress: ProgressFn = {
            let jobs = Arc::clone(&self.jobs);
            Arc::new(move |fraction| {
                if let Err(e) = jobs.update_progress(job_id, fraction) {
                    tracing::warn!(%job_id, error = %e, "Dropped progress update");
                }
            })
        };

        // Run the engine on its own task so a panic becomes a failed job
        // instead of taking down the worker.
        let engine = Arc::clone(&self.engine);
        let params = job.parameters;
        let outcome = tokio::spawn(async move { engine.invoke(&params, on_progress).await }).await;

        let result = match outcome {
            Ok(Ok(output)) => self
                .artifacts
                .put(job_id, &output)
                .await
                .map_err(|e| format!("Failed to store generated video: {e}")),
            Ok(Err(e)) => Err(e.to_string()),
            Err(join_err) => Err(format!("Generation task aborted: {join_err}")),
        };

        match result {
            Ok(artifact_ref) => match self.jobs.complete(job_id, artifact_ref) {
                Ok(_) => tracing::info!(%job_id, worker = self.index, "Video generation completed"),
                Err(e) => tracing::error!(%job_id, error = %e, "Failed to mark job completed"),
            },
            Err(message) => {
                // No automatic retry.
                tracing::error!(%job_id, worker = self.index, error = %message, "Video generation failed");
                if let Err(e) = self.jobs.fail(job_id, message) {
                    tracing::error!(%job_id, error = %e, "Failed to mark job as failed");
                }
            }
        }
    }
}
