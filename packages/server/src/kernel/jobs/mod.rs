//! Job infrastructure for background icon runs.
//!
//! - [`JobManager`] - submit, status, fetch_result, discard
//! - [`JobRegistry`] - in-memory id -> record map, the only shared state
//! - [`Pipeline`] - one run: names -> icons -> zip
//! - [`Job`] - record with a monotonic status machine
//!
//! # Architecture
//!
//! ```text
//! submit(provider)
//!     │
//!     ├─► registry.insert(Queued)
//!     └─► tokio::spawn(supervise)
//!             └─► tokio::spawn(run)       (panics become Failed)
//!                     ├─► InProgress
//!                     ├─► Pipeline.run (progress -> registry)
//!                     └─► Completed / Failed
//! ```
//!
//! Records live only in memory; nothing survives a restart.

mod error;
mod job;
pub mod manager;
pub mod pipeline;
mod registry;
pub mod testing;

pub use error::{JobError, PipelineError};
pub use job::{InvalidTransition, Job, JobStats, JobStatus};
pub use manager::{JobArchive, JobManager, ManagerConfig};
pub use pipeline::{CompletedRun, ItemOutcome, Pipeline, SkipReason, StagedIcon, ICONS_DIR};
pub use registry::{JobRegistry, RemovedJob};
