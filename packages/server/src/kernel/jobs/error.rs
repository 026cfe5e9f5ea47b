use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use super::JobStatus;
use crate::domains::apps::ProviderError;
use crate::domains::icons::ArchiveError;

/// Caller-facing errors from job queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {id} is not ready (status: {status})")]
    NotReady { id: Uuid, status: JobStatus },

    /// The record says Completed but the archive file cannot be read.
    #[error("archive for job {id} is unavailable: {message}")]
    ArchiveUnavailable { id: Uuid, message: String },
}

/// Errors that fail a whole job run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("name provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("failed to prepare working directory {}: {source}", path.display())]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stage {}: {source}", file.display())]
    Stage {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("pipeline task failed: {0}")]
    Task(String),

    #[error("job was discarded")]
    Cancelled,
}
