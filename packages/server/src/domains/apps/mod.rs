//! Sources of application names for a job.
//!
//! The job pipeline only needs "something that yields an ordered list of
//! names, or fails". Production uses [`CommandNameProvider`] to ask the host
//! OS; the HTTP layer switches to [`StaticNameProvider`] when the caller
//! posts an explicit list.

mod command;

pub use command::{parse_app_names, CommandNameProvider};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Exited {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("could not parse app list: {0}")]
    Parse(String),

    #[error("app list unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AppNameProvider: Send + Sync {
    /// Ordered app names. Failure here fails the whole job.
    async fn list_app_names(&self) -> Result<Vec<String>, ProviderError>;
}

/// Fixed list of names supplied up front.
#[derive(Debug, Clone, Default)]
pub struct StaticNameProvider {
    names: Vec<String>,
}

impl StaticNameProvider {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl AppNameProvider for StaticNameProvider {
    async fn list_app_names(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.names.clone())
    }
}
