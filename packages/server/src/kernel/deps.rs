//! Server dependencies shared by every job run.

use std::sync::Arc;

use itunes_client::{ItunesClient, RetryingFetcher};

use super::traits::{BaseIconResolver, BaseImageFetcher};
use crate::config::Config;

/// Outbound collaborators, injected once at startup.
///
/// Both are immutable after construction. The production resolver and
/// fetcher share one `reqwest::Client` (and thus one connection pool).
#[derive(Clone)]
pub struct ServerDeps {
    pub resolver: Arc<dyn BaseIconResolver>,
    pub fetcher: Arc<dyn BaseImageFetcher>,
}

impl ServerDeps {
    pub fn new(resolver: Arc<dyn BaseIconResolver>, fetcher: Arc<dyn BaseImageFetcher>) -> Self {
        Self { resolver, fetcher }
    }

    /// Build the iTunes-backed resolver and fetcher from configuration.
    pub fn from_config(config: &Config, http_client: reqwest::Client) -> Self {
        let fetcher = RetryingFetcher::new(http_client, config.retry_policy.clone())
            .with_timeout(config.request_timeout);
        let resolver = ItunesClient::new(fetcher.clone())
            .with_search_url(config.lookup_url.clone())
            .with_params(config.search_params.clone());

        Self::new(Arc::new(resolver), Arc::new(fetcher))
    }
}
