//! Process-local state for vidgen: the job record store and the artifact
//! store that maps completed jobs to files on disk.

pub mod artifacts;
pub mod jobs;

pub use artifacts::{ArtifactError, ArtifactFile, ArtifactStore};
pub use jobs::{JobCounts, JobFilter, JobStore, StoreError};
