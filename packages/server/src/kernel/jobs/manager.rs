//! Job manager: submission, lifecycle queries, and the background run.
//!
//! Each `submit` spawns one supervising tokio task. The supervisor spawns the
//! actual run as a child task so a panic inside the pipeline surfaces as a
//! `JoinError` and turns into a `Failed` status instead of taking the
//! manager down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use super::error::{JobError, PipelineError};
use super::pipeline::{CompletedRun, Pipeline};
use super::registry::JobRegistry;
use super::{Job, JobStatus};
use crate::domains::apps::AppNameProvider;
use crate::domains::icons::{Palette, DEFAULT_TARGET_SIZE};
use crate::kernel::ServerDeps;

/// Options for running jobs.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct ManagerConfig {
    /// Root under which each job gets `{work_dir}/{job_id}/`.
    pub work_dir: PathBuf,
    #[builder(default)]
    pub palette: Palette,
    #[builder(default = DEFAULT_TARGET_SIZE)]
    pub target_size: u32,
    /// Items processed concurrently within one job.
    #[builder(default = 4)]
    pub item_concurrency: usize,
}

/// A completed job's archive, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobArchive {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Owns the job registry and runs jobs in the background.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct JobManager {
    registry: Arc<JobRegistry>,
    pipeline: Pipeline,
    work_dir: PathBuf,
}

impl JobManager {
    pub fn new(deps: ServerDeps, config: ManagerConfig) -> Self {
        let pipeline = Pipeline::new(
            deps,
            config.palette,
            config.target_size,
            config.item_concurrency,
        );
        Self {
            registry: Arc::new(JobRegistry::new()),
            pipeline,
            work_dir: config.work_dir,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn job_dir(&self, id: Uuid) -> PathBuf {
        self.work_dir.join(id.to_string())
    }

    /// Queue a job and start it in the background. Never waits on the run.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, provider: Arc<dyn AppNameProvider>) -> Uuid {
        let job = Job::new();
        let id = job.id;
        let cancel = CancellationToken::new();
        self.registry.insert(job, cancel.clone());

        let manager = self.clone();
        let handle = tokio::spawn(async move { manager.supervise(id, provider, cancel).await });
        self.registry.attach_handle(id, handle);

        info!(job_id = %id, "Job submitted");
        id
    }

    pub fn status(&self, id: Uuid) -> Result<Job, JobError> {
        self.registry.get(id).ok_or(JobError::NotFound(id))
    }

    pub fn list(&self) -> Vec<Job> {
        self.registry.list()
    }

    /// Archive bytes of a completed job. Repeated calls return the same data
    /// until the job is discarded.
    pub async fn fetch_result(&self, id: Uuid) -> Result<JobArchive, JobError> {
        let job = self.status(id)?;
        let (Some(path), Some(file_name)) = (job.archive_path, job.archive_name) else {
            return Err(JobError::NotReady {
                id,
                status: job.status,
            });
        };
        if job.status != JobStatus::Completed {
            return Err(JobError::NotReady {
                id,
                status: job.status,
            });
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| JobError::ArchiveUnavailable {
                id,
                message: e.to_string(),
            })?;

        Ok(JobArchive {
            file_name,
            bytes: Bytes::from(bytes),
        })
    }

    /// Remove a job and its files.
    ///
    /// Discarding a running job signals its cancellation token; the run stops
    /// before its next item and its supervisor removes the directory.
    pub async fn discard(&self, id: Uuid) -> Result<(), JobError> {
        let removed = self.registry.remove(id).ok_or(JobError::NotFound(id))?;
        removed.cancel.cancel();

        if removed.job.status.is_terminal() {
            remove_job_dir(&self.job_dir(id)).await;
        } else {
            debug!(job_id = %id, status = %removed.job.status, "Discarded running job");
        }

        info!(job_id = %id, "Job discarded");
        Ok(())
    }

    /// Cancel every in-flight run and wait for the supervisors to finish.
    pub async fn shutdown(&self) {
        let handles = self.registry.cancel_all();
        info!(count = handles.len(), "Waiting for job runs to stop");
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn supervise(
        self,
        id: Uuid,
        provider: Arc<dyn AppNameProvider>,
        cancel: CancellationToken,
    ) {
        let runner = self.clone();
        let run_cancel = cancel.clone();
        let outcome = match tokio::spawn(async move { runner.run(id, provider, run_cancel).await })
            .await
        {
            Ok(outcome) => outcome,
            Err(join) => Err(PipelineError::Task(join.to_string())),
        };

        let job_dir = self.job_dir(id);
        match outcome {
            Ok(done) => {
                let CompletedRun {
                    archive_path,
                    archive_name,
                    stats,
                } = done;
                match self
                    .registry
                    .update(id, |job| job.complete(archive_path, archive_name, stats))
                {
                    Some(Ok(())) => info!(job_id = %id, "Job completed"),
                    Some(Err(e)) => error!(job_id = %id, error = %e, "Could not complete job"),
                    None => remove_job_dir(&job_dir).await,
                }
            }
            Err(PipelineError::Cancelled) => {
                // Still registered means shutdown rather than discard.
                let failed = self.registry.update(id, |job| job.fail("job cancelled"));
                if let Some(Err(transition)) = failed {
                    warn!(job_id = %id, error = %transition, "Could not mark job failed");
                }
                debug!(job_id = %id, "Job run stopped");
                remove_job_dir(&job_dir).await;
            }
            Err(e) => {
                let detail = e.to_string();
                error!(job_id = %id, error = %detail, "Job failed");
                if let Some(Err(transition)) = self.registry.update(id, |job| job.fail(detail)) {
                    warn!(job_id = %id, error = %transition, "Could not mark job failed");
                }
                remove_job_dir(&job_dir).await;
            }
        }
    }

    async fn run(
        &self,
        id: Uuid,
        provider: Arc<dyn AppNameProvider>,
        cancel: CancellationToken,
    ) -> Result<CompletedRun, PipelineError> {
        match self.registry.update(id, Job::start) {
            None => return Err(PipelineError::Cancelled),
            Some(Err(e)) => return Err(PipelineError::Task(e.to_string())),
            Some(Ok(())) => {}
        }
        debug!(job_id = %id, "Job started");

        let registry = self.registry.clone();
        self.pipeline
            .run(provider.as_ref(), &self.job_dir(id), &cancel, |stats| {
                registry.update(id, |job| job.record_progress(stats.clone()));
            })
            .await
    }
}

async fn remove_job_dir(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed job directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove job directory"),
    }
}
