// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The job pipeline depends on these, never on the concrete clients, so tests
// can swap in the mocks from `kernel::jobs::testing`.
//
// Naming convention: Base* for trait names (e.g., BaseIconResolver)

use async_trait::async_trait;
use bytes::Bytes;
use itunes_client::{FetchError, ItunesClient, ResolveError, RetryingFetcher};

// =============================================================================
// Icon Resolver Trait
// =============================================================================

#[async_trait]
pub trait BaseIconResolver: Send + Sync {
    /// Artwork URL for an app name. `Ok(None)` means no match, not a failure.
    async fn resolve(&self, app_name: &str) -> Result<Option<String>, ResolveError>;
}

#[async_trait]
impl BaseIconResolver for ItunesClient {
    async fn resolve(&self, app_name: &str) -> Result<Option<String>, ResolveError> {
        ItunesClient::resolve(self, app_name).await
    }
}

// =============================================================================
// Image Fetcher Trait
// =============================================================================

#[async_trait]
pub trait BaseImageFetcher: Send + Sync {
    /// Download raw image bytes. The caller takes ownership of the buffer.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

#[async_trait]
impl BaseImageFetcher for RetryingFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        RetryingFetcher::fetch(self, url).await
    }
}
