//! Durable storage for generated videos.
//!
//! An artifact's filename is derived only from its job id: `<id>.mp4`.
//! Client-supplied names are parsed back into a job id with
//! [`ArtifactStore::parse_name`] before anything touches the filesystem, so
//! separators, traversal sequences and foreign extensions never reach a path.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vidgen_core::error::CoreError;
use vidgen_core::job::JobStatus;
use vidgen_core::types::JobId;

use crate::jobs::JobStore;

/// Extension of every stored artifact.
pub const ARTIFACT_EXTENSION: &str = "mp4";

/// Content type served for artifacts.
pub const ARTIFACT_CONTENT_TYPE: &str = "video/mp4";

/// Length of a hyphenated UUID.
const HYPHENATED_ID_LEN: usize = 36;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("invalid artifact name: {0}")]
    InvalidName(String),

    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ArtifactError> for CoreError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::InvalidName(_) => {
                CoreError::Validation("Invalid video filename".to_string())
            }
            ArtifactError::NotFound(name) => CoreError::NotFound {
                entity: "Video",
                id: name,
            },
            ArtifactError::Io(e) => CoreError::Internal(e.to_string()),
        }
    }
}

/// An opened artifact ready to be streamed.
#[derive(Debug)]
pub struct ArtifactFile {
    pub id: JobId,
    pub name: String,
    pub file: tokio::fs::File,
    pub len: u64,
}

pub struct ArtifactStore {
    root: PathBuf,
    jobs: Arc<JobStore>,
}

impl ArtifactStore {
    /// Open (creating if needed) the artifact directory.
    pub async fn open(root: impl Into<PathBuf>, jobs: Arc<JobStore>) -> Result<Self, ArtifactError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root, jobs })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The artifact filename for a job.
    pub fn artifact_name(id: JobId) -> String {
        format!("{}.{ARTIFACT_EXTENSION}", id.hyphenated())
    }

    fn path_for(&self, id: JobId) -> PathBuf {
        self.root.join(Self::artifact_name(id))
    }

    /// Parse a requested filename into the job id it names.
    ///
    /// Accepts exactly `<lowercase hyphenated uuid>.mp4`.
    pub fn parse_name(name: &str) -> Result<JobId, ArtifactError> {
        let invalid = || ArtifactError::InvalidName(name.to_string());

        let stem = name
            .strip_suffix(ARTIFACT_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .ok_or_else(invalid)?;
        if stem.len() != HYPHENATED_ID_LEN {
            return Err(invalid());
        }
        let id = JobId::try_parse(stem).map_err(|_| invalid())?;
        // Reject uppercase and any non-canonical spelling.
        if id.hyphenated().to_string() != stem {
            return Err(invalid());
        }
        Ok(id)
    }

    /// Move the engine's output into the store under the job's artifact name.
    ///
    /// Falls back to copy + remove when a rename is not possible (for example
    /// across filesystems).
    pub async fn put(&self, id: JobId, engine_output: &Path) -> Result<String, ArtifactError> {
        let dest = self.path_for(id);
        if let Err(rename_err) = tokio::fs::rename(engine_output, &dest).await {
            tracing::debug!(
                job_id = %id,
                error = %rename_err,
                "Rename into artifact store failed, copying instead",
            );
            tokio::fs::copy(engine_output, &dest).await?;
            if let Err(e) = tokio::fs::remove_file(engine_output).await {
                tracing::warn!(
                    job_id = %id,
                    path = %engine_output.display(),
                    error = %e,
                    "Failed to remove engine output after copy",
                );
            }
        }
        Ok(Self::artifact_name(id))
    }

    /// Open a completed job's artifact by its public filename.
    pub async fn open_for_read(&self, name: &str) -> Result<ArtifactFile, ArtifactError> {
        let id = Self::parse_name(name)?;
        let not_found = || ArtifactError::NotFound(name.to_string());

        let job = self.jobs.get(id).map_err(|_| not_found())?;
        if job.status != JobStatus::Completed || job.artifact_ref.as_deref() != Some(name) {
            return Err(not_found());
        }

        let file = match tokio::fs::File::open(self.path_for(id)).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();
        Ok(ArtifactFile {
            id,
            name: name.to_string(),
            file,
            len,
        })
    }

    /// Delete a job's artifact. Succeeds if it is already gone.
    pub async fn remove(&self, id: JobId) -> Result<(), ArtifactError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => {
                tracing::info!(job_id = %id, "Deleted video file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
