//! Pure iTunes Search API client.
//!
//! A minimal client for resolving an application name to its App Store
//! artwork URL, plus the retrying fetcher it is built on. The fetcher is
//! exported so callers can download the artwork itself with the same
//! retry policy.
//!
//! # Example
//!
//! ```rust,ignore
//! use itunes_client::{ItunesClient, RetryPolicy, RetryingFetcher};
//!
//! let fetcher = RetryingFetcher::new(reqwest::Client::new(), RetryPolicy::default());
//! let client = ItunesClient::new(fetcher.clone());
//!
//! if let Some(url) = client.resolve("Safari").await? {
//!     let png = fetcher.fetch(&url).await?;
//! }
//! ```

pub mod error;
pub mod fetch;
pub mod types;

pub use error::{FetchError, FetchResult, ResolveError, Result};
pub use fetch::{RetryPolicy, RetryingFetcher, DEFAULT_RETRYABLE_STATUSES};
pub use types::{SearchParams, SearchResponse, SearchResult};

pub const DEFAULT_SEARCH_URL: &str = "https://itunes.apple.com/search";

#[derive(Clone)]
pub struct ItunesClient {
    fetcher: RetryingFetcher,
    search_url: String,
    params: SearchParams,
}

impl ItunesClient {
    pub fn new(fetcher: RetryingFetcher) -> Self {
        Self {
            fetcher,
            search_url: DEFAULT_SEARCH_URL.to_string(),
            params: SearchParams::default(),
        }
    }

    /// Point the client at a different search endpoint (mirrors, tests).
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    pub fn with_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    pub fn fetcher(&self) -> &RetryingFetcher {
        &self.fetcher
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// Run a search for `term` and return the parsed result list.
    pub async fn search(&self, term: &str) -> Result<SearchResponse> {
        let query = self.params.query_pairs(term);
        let body = self.fetcher.fetch_query(&self.search_url, &query).await?;
        let response: SearchResponse = serde_json::from_slice(&body)?;
        Ok(response)
    }

    /// Resolve an application name to its best artwork URL.
    ///
    /// `Ok(None)` means the search worked but found nothing usable; callers
    /// should skip the app. `Err` means the service could not be queried.
    pub async fn resolve(&self, app_name: &str) -> Result<Option<String>> {
        let term = app_name.trim();
        if term.is_empty() {
            return Ok(None);
        }

        let response = self.search(term).await?;
        let artwork = response
            .results
            .first()
            .and_then(|result| result.best_artwork())
            .map(str::to_string);

        match &artwork {
            Some(url) => tracing::debug!(app = %term, url = %url, "Resolved artwork"),
            None => tracing::info!(
                app = %term,
                result_count = response.result_count,
                "No artwork match"
            ),
        }

        Ok(artwork)
    }
}
