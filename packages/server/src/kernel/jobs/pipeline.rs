//! One job run: names -> artwork URLs -> bytes -> recolor -> stage -> zip.
//!
//! ```text
//! provider.list_app_names()          (error: job fails)
//!     │
//!     ├─► per app, up to N at a time
//!     │       resolve ─► fetch ─► recolor ─► write PNG
//!     │       NoMatch / Resolve / Fetch / Decode: skipped
//!     │       write error: job fails
//!     │
//!     └─► all items joined ─► archive icons/ (error: job fails)
//! ```
//!
//! Each item's bytes are owned by the future processing it and handed to the
//! blocking pool by value for the recolor step.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use itunes_client::{FetchError, ResolveError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::PipelineError;
use super::job::JobStats;
use crate::domains::apps::AppNameProvider;
use crate::domains::icons::{archive_directory, encode_png, recolor, DecodeError, FileNamer, Palette};
use crate::kernel::ServerDeps;

/// Subdirectory of the job directory that gets archived.
pub const ICONS_DIR: &str = "icons";

/// Why an item was left out of the archive.
#[derive(Debug)]
pub enum SkipReason {
    /// The lookup worked but found no artwork.
    NoMatch,
    Resolve(ResolveError),
    Fetch(FetchError),
    Decode(DecodeError),
    /// The job was discarded before this item started.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoMatch => f.write_str("no artwork match"),
            SkipReason::Resolve(e) => write!(f, "lookup failed: {}", e),
            SkipReason::Fetch(e) => write!(f, "download failed: {}", e),
            SkipReason::Decode(e) => write!(f, "decode failed: {}", e),
            SkipReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StagedIcon {
    pub app_name: String,
    pub path: PathBuf,
}

/// Result of processing one app. The variant decides what the run does
/// next: continue, continue without it, or stop.
#[derive(Debug)]
pub enum ItemOutcome {
    Staged(StagedIcon),
    Skipped(SkipReason),
    Fatal(PipelineError),
}

#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub archive_path: PathBuf,
    pub archive_name: String,
    pub stats: JobStats,
}

/// Work item for one app name within a run.
#[derive(Debug, Clone)]
struct IconTask {
    app_name: String,
    file_name: String,
}

/// Per-run pipeline settings plus the injected collaborators.
#[derive(Clone)]
pub struct Pipeline {
    deps: ServerDeps,
    palette: Palette,
    target_size: u32,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(deps: ServerDeps, palette: Palette, target_size: u32, concurrency: usize) -> Self {
        Self {
            deps,
            palette,
            target_size,
            concurrency: concurrency.max(1),
        }
    }

    /// Run the whole pipeline inside `job_dir`.
    ///
    /// `on_progress` is called after every finished item with the running
    /// counters.
    pub async fn run<F>(
        &self,
        provider: &dyn AppNameProvider,
        job_dir: &Path,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<CompletedRun, PipelineError>
    where
        F: FnMut(&JobStats),
    {
        let icons_dir = job_dir.join(ICONS_DIR);
        tokio::fs::create_dir_all(&icons_dir)
            .await
            .map_err(|source| PipelineError::WorkDir {
                path: icons_dir.clone(),
                source,
            })?;

        let names = provider.list_app_names().await?;
        let mut stats = JobStats {
            total: names.len(),
            ..Default::default()
        };
        on_progress(&stats);
        info!(job_dir = %job_dir.display(), apps = names.len(), "Processing apps");

        let mut namer = FileNamer::new();
        let tasks: Vec<IconTask> = names
            .into_iter()
            .map(|app_name| IconTask {
                file_name: namer.next_name(&app_name),
                app_name,
            })
            .collect();

        let mut outcomes = stream::iter(tasks)
            .map(|task| self.process_item(task, &icons_dir, cancel))
            .buffer_unordered(self.concurrency);

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                ItemOutcome::Staged(_) => stats.staged += 1,
                ItemOutcome::Skipped(reason) => stats.record_skip(&reason),
                ItemOutcome::Fatal(e) => return Err(e),
            }
            on_progress(&stats);
        }
        drop(outcomes);

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let archive_name = format!("{}.zip", Utc::now().format("%Y%m%d%H%M%S"));
        let archive_path = job_dir.join(&archive_name);
        let (source, dest) = (icons_dir.clone(), archive_path.clone());
        tokio::task::spawn_blocking(move || archive_directory(&source, &dest))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))??;

        info!(
            archive = %archive_path.display(),
            staged = stats.staged,
            skipped = stats.skipped(),
            "Archive ready"
        );

        Ok(CompletedRun {
            archive_path,
            archive_name,
            stats,
        })
    }

    async fn process_item(
        &self,
        task: IconTask,
        icons_dir: &Path,
        cancel: &CancellationToken,
    ) -> ItemOutcome {
        if cancel.is_cancelled() {
            return ItemOutcome::Skipped(SkipReason::Cancelled);
        }
        let app = task.app_name.as_str();

        let url = match self.deps.resolver.resolve(app).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                info!(app = %app, "No icon found, skipping");
                return ItemOutcome::Skipped(SkipReason::NoMatch);
            }
            Err(e) => {
                warn!(app = %app, error = %e, "Icon lookup failed, skipping");
                return ItemOutcome::Skipped(SkipReason::Resolve(e));
            }
        };

        let bytes = match self.deps.fetcher.fetch(&url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(app = %app, url = %url, error = %e, "Icon download failed, skipping");
                return ItemOutcome::Skipped(SkipReason::Fetch(e));
            }
        };

        let (size, palette) = (self.target_size, self.palette);
        let png = match tokio::task::spawn_blocking(move || {
            let image = recolor(&bytes, size, &palette)?;
            encode_png(&image).map_err(DecodeError::from)
        })
        .await
        {
            Ok(Ok(png)) => png,
            Ok(Err(e)) => {
                warn!(app = %app, url = %url, error = %e, "Icon decode failed, skipping");
                return ItemOutcome::Skipped(SkipReason::Decode(e));
            }
            Err(e) => return ItemOutcome::Fatal(PipelineError::Task(e.to_string())),
        };

        let path = icons_dir.join(&task.file_name);
        if let Err(source) = tokio::fs::write(&path, &png).await {
            return ItemOutcome::Fatal(PipelineError::Stage { file: path, source });
        }

        debug!(app = %app, file = %task.file_name, size = png.len(), "Staged icon");
        ItemOutcome::Staged(StagedIcon {
            app_name: task.app_name,
            path,
        })
    }
}
