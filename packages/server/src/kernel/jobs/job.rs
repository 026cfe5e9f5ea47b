//! Job model for background icon runs.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::pipeline::SkipReason;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Allowed edges: Queued -> InProgress -> {Completed | Failed}.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid job transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

// ============================================================================
// Stats
// ============================================================================

/// Per-item counters, updated as the run progresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    /// Names returned by the provider.
    pub total: usize,
    pub staged: usize,
    pub no_match: usize,
    pub resolve_failed: usize,
    pub fetch_failed: usize,
    pub decode_failed: usize,
}

impl JobStats {
    pub fn record_skip(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::NoMatch => self.no_match += 1,
            SkipReason::Resolve(_) => self.resolve_failed += 1,
            SkipReason::Fetch(_) => self.fetch_failed += 1,
            SkipReason::Decode(_) => self.decode_failed += 1,
            SkipReason::Cancelled => {}
        }
    }

    pub fn skipped(&self) -> usize {
        self.no_match + self.resolve_failed + self.fetch_failed + self.decode_failed
    }
}

// ============================================================================
// Job Model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    #[serde(rename = "job_id")]
    pub id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub archive_path: Option<PathBuf>,
    /// Download file name, `{timestamp}.zip`.
    pub archive_name: Option<String>,
    pub error_detail: Option<String>,
    pub stats: JobStats,
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}

impl Job {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            archive_path: None,
            archive_name: None,
            error_detail: None,
            stats: JobStats::default(),
        }
    }

    pub fn start(&mut self) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::InProgress)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Replace progress counters. Ignored once the job is terminal.
    pub fn record_progress(&mut self, stats: JobStats) {
        if self.status == JobStatus::InProgress {
            self.stats = stats;
        }
    }

    pub fn complete(
        &mut self,
        archive_path: PathBuf,
        archive_name: String,
        stats: JobStats,
    ) -> Result<(), InvalidTransition> {
        self.transition(JobStatus::Completed)?;
        self.finished_at = Some(Utc::now());
        self.archive_path = Some(archive_path);
        self.archive_name = Some(archive_name);
        self.stats = stats;
        Ok(())
    }

    /// Mark failed. A job that never started is moved through InProgress
    /// first so the status history stays on the allowed path.
    pub fn fail(&mut self, detail: impl Into<String>) -> Result<(), InvalidTransition> {
        if self.status == JobStatus::Queued {
            self.start()?;
        }
        self.transition(JobStatus::Failed)?;
        self.finished_at = Some(Utc::now());
        self.error_detail = Some(detail.into());
        Ok(())
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
