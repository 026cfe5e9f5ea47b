//! In-memory job registry.
//!
//! The only state shared between concurrent tasks. Every access takes the
//! lock for the duration of a closure and never across an `.await`.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::Job;

/// Registry entry: the record plus the handles needed to stop its run.
struct JobEntry {
    job: Job,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// What `remove` hands back so the caller can stop and clean up the run.
pub struct RemovedJob {
    pub job: Job,
    pub cancel: CancellationToken,
    pub handle: Option<JoinHandle<()>>,
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<Uuid, JobEntry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job, cancel: CancellationToken) {
        self.jobs.write().unwrap_or_else(|e| e.into_inner()).insert(
            job.id,
            JobEntry {
                job,
                cancel,
                handle: None,
            },
        );
    }

    /// Store the run's task handle. No-op if the job was already removed.
    pub fn attach_handle(&self, id: Uuid, handle: JoinHandle<()>) {
        if let Some(entry) = self
            .jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&id)
        {
            entry.handle = Some(handle);
        }
    }

    /// Snapshot of a job record.
    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .map(|entry| entry.job.clone())
    }

    /// Mutate a record in place. `None` if the job no longer exists.
    pub fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&id)
            .map(|entry| f(&mut entry.job))
    }

    pub fn remove(&self, id: Uuid) -> Option<RemovedJob> {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .map(|entry| RemovedJob {
                job: entry.job,
                cancel: entry.cancel,
                handle: entry.handle,
            })
    }

    /// All records, oldest first.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|entry| entry.job.clone())
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    /// Cancel every run and take their handles, leaving records in place.
    pub fn cancel_all(&self) -> Vec<JoinHandle<()>> {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .values_mut()
            .filter_map(|entry| {
                entry.cancel.cancel();
                entry.handle.take()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
