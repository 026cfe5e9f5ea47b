//! Error types for the iTunes Search client.

use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type for lookup operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors returned by [`RetryingFetcher`](crate::RetryingFetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-retryable, non-2xx response. Returned on the first attempt.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Every attempt hit a retryable status or a transient transport failure.
    #[error("gave up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    /// Transport failure that retrying cannot fix (bad URL, body read error).
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl FetchError {
    /// HTTP status of the failing response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure came from running out of attempts.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, FetchError::Exhausted { .. })
    }
}

/// Errors returned by [`ItunesClient::resolve`](crate::ItunesClient::resolve).
///
/// A search that succeeds but matches nothing is *not* an error; it is
/// reported as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The search request itself failed.
    #[error("lookup request failed: {0}")]
    Fetch(#[from] FetchError),

    /// The search service answered with something that is not a result list.
    #[error("lookup response could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}
