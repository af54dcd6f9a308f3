//! In-memory job record store.
//!
//! [`JobStore`] is the single mutable structure shared by the HTTP handlers
//! (readers, plus create/delete) and the dispatcher workers (progress and
//! status writes). Every operation takes the lock exactly once, so a progress
//! write can never interleave with a concurrent status read of the same job.
//! Records are kept in insertion order.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use vidgen_core::error::CoreError;
use vidgen_core::generation::GenerationParams;
use vidgen_core::job::{Job, JobStateError, JobStatus};
use vidgen_core::types::{now, JobId};

/// Default number of jobs returned by [`JobStore::list`].
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Upper bound on the number of jobs returned by [`JobStore::list`].
pub const MAX_LIST_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {0} is currently processing")]
    Processing(JobId),

    #[error("job {id}: {source}")]
    State {
        id: JobId,
        #[source]
        source: JobStateError,
    },
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::NotFound {
                entity: "Job",
                id: id.to_string(),
            },
            StoreError::Processing(_) => CoreError::Conflict(
                "Cannot delete job that is currently processing".to_string(),
            ),
            err @ StoreError::State { .. } => CoreError::Internal(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Filter for [`JobStore::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    /// Clamped to `1..=MAX_LIST_LIMIT`; defaults to [`DEFAULT_LIST_LIMIT`].
    pub limit: Option<usize>,
}

/// Aggregate counts reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobCounts {
    /// Jobs that are queued or processing.
    pub active: usize,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    jobs: IndexMap<JobId, Job>,
    /// Every id ever handed out, including deleted ones.
    issued: HashSet<JobId>,
}

#[derive(Default)]
pub struct JobStore {
    inner: RwLock<Inner>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new queued job and return a snapshot of it.
    pub fn create(&self, parameters: GenerationParams, estimated_secs: u64) -> Job {
        let mut inner = self.write();
        let id = loop {
            let candidate = JobId::new_v4();
            if inner.issued.insert(candidate) {
                break candidate;
            }
        };
        let job = Job::new(id, parameters, estimated_secs, now());
        inner.jobs.insert(id, job.clone());
        job
    }

    pub fn get(&self, id: JobId) -> Result<Job, StoreError> {
        self.read()
            .jobs
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Jobs in insertion order, optionally filtered by status.
    pub fn list(&self, filter: JobFilter) -> Vec<Job> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        self.read()
            .jobs
            .values()
            .filter(|job| filter.status.is_none_or(|status| job.status == status))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> JobCounts {
        let inner = self.read();
        JobCounts {
            active: inner.jobs.values().filter(|j| j.status.is_active()).count(),
            total: inner.jobs.len(),
        }
    }

    /// Apply `f` to the job under the write lock and return a snapshot.
    fn mutate<T>(
        &self,
        id: JobId,
        f: impl FnOnce(&mut Job) -> Result<T, JobStateError>,
    ) -> Result<(T, Job), StoreError> {
        let mut inner = self.write();
        let job = inner.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let out = f(job).map_err(|source| StoreError::State { id, source })?;
        Ok((out, job.clone()))
    }

    /// `queued -> processing`.
    pub fn start(&self, id: JobId) -> Result<Job, StoreError> {
        self.mutate(id, |job| job.start(now())).map(|(_, job)| job)
    }

    /// `processing -> completed`, recording the artifact reference.
    pub fn complete(&self, id: JobId, artifact_ref: String) -> Result<Job, StoreError> {
        self.mutate(id, |job| job.complete(artifact_ref, now()))
            .map(|(_, job)| job)
    }

    /// `processing -> failed`, recording the failure description.
    pub fn fail(&self, id: JobId, error: String) -> Result<Job, StoreError> {
        self.mutate(id, |job| job.fail(error, now()))
            .map(|(_, job)| job)
    }

    /// Record progress for a processing job. Returns whether it changed.
    pub fn update_progress(&self, id: JobId, value: f64) -> Result<bool, StoreError> {
        self.mutate(id, |job| job.record_progress(value, now()))
            .map(|(changed, _)| changed)
    }

    /// Remove a job that is not processing and return the removed record.
    ///
    /// The caller is responsible for reclaiming the job's artifact.
    pub fn delete(&self, id: JobId) -> Result<Job, StoreError> {
        let mut inner = self.write();
        match inner.jobs.get(&id) {
            None => return Err(StoreError::NotFound(id)),
            Some(job) if job.status == JobStatus::Processing => {
                return Err(StoreError::Processing(id));
            }
            Some(_) => {}
        }
        inner
            .jobs
            .shift_remove(&id)
            .ok_or(StoreError::NotFound(id))
    }
}
