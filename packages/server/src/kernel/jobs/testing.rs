//! Job testing utilities.
//!
//! In-memory stand-ins for the lookup service, image host, and name
//! provider, plus helpers for waiting on background runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use image::{Rgba, RgbaImage};
use itunes_client::{FetchError, ResolveError};
use uuid::Uuid;

use super::{Job, JobManager};
use crate::domains::apps::{AppNameProvider, ProviderError};
use crate::domains::icons::encode_png;
use crate::kernel::{BaseIconResolver, BaseImageFetcher, ServerDeps};

/// Canned lookup result for one app name.
#[derive(Debug, Clone)]
pub enum MockLookup {
    Found(String),
    NoMatch,
    /// Lookup fails as if the service returned this status.
    Fails(u16),
}

/// Resolver answering from a table. Unknown names are `NoMatch`.
#[derive(Default)]
pub struct MockIconResolver {
    lookups: RwLock<HashMap<String, MockLookup>>,
    calls: RwLock<Vec<String>>,
}

impl MockIconResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, app_name: impl Into<String>, lookup: MockLookup) -> Self {
        self.lookups
            .write()
            .unwrap()
            .insert(app_name.into(), lookup);
        self
    }

    /// Map `app_name` to a URL.
    pub fn with_url(self, app_name: impl Into<String>, url: impl Into<String>) -> Self {
        self.with(app_name, MockLookup::Found(url.into()))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl BaseIconResolver for MockIconResolver {
    async fn resolve(&self, app_name: &str) -> Result<Option<String>, ResolveError> {
        self.calls.write().unwrap().push(app_name.to_string());
        let lookup = self.lookups.read().unwrap().get(app_name).cloned();
        match lookup {
            Some(MockLookup::Found(url)) => Ok(Some(url)),
            Some(MockLookup::NoMatch) | None => Ok(None),
            Some(MockLookup::Fails(status)) => Err(ResolveError::Fetch(FetchError::Status {
                status,
                url: format!("mock://search?term={}", app_name),
            })),
        }
    }
}

/// Image host serving canned bytes by URL. Unknown URLs are a 404.
#[derive(Default)]
pub struct MockImageFetcher {
    images: RwLock<HashMap<String, Bytes>>,
    calls: RwLock<Vec<String>>,
}

impl MockImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, url: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        self.images.write().unwrap().insert(url.into(), bytes.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl BaseImageFetcher for MockImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.calls.write().unwrap().push(url.to_string());
        self.images
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

/// Provider that always fails.
#[derive(Debug, Clone)]
pub struct FailingNameProvider {
    message: String,
}

impl FailingNameProvider {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl AppNameProvider for FailingNameProvider {
    async fn list_app_names(&self) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Unavailable(self.message.clone()))
    }
}

/// Provider that panics, for exercising the supervisor.
#[derive(Debug, Clone, Default)]
pub struct PanickingNameProvider;

#[async_trait]
impl AppNameProvider for PanickingNameProvider {
    async fn list_app_names(&self) -> Result<Vec<String>, ProviderError> {
        panic!("name provider exploded")
    }
}

/// Provider that answers after a delay, keeping the job in progress.
#[derive(Debug, Clone)]
pub struct DelayedNameProvider {
    names: Vec<String>,
    delay: Duration,
}

impl DelayedNameProvider {
    pub fn new<I, S>(names: I, delay: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            delay,
        }
    }
}

#[async_trait]
impl AppNameProvider for DelayedNameProvider {
    async fn list_app_names(&self) -> Result<Vec<String>, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.names.clone())
    }
}

/// Dependencies backed by the given mocks.
pub fn mock_deps(resolver: Arc<MockIconResolver>, fetcher: Arc<MockImageFetcher>) -> ServerDeps {
    ServerDeps::new(resolver, fetcher)
}

/// A small PNG icon: white glyph in the middle, dark border, transparent
/// corners.
pub fn sample_icon_png(size: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(size, size, |x, y| {
        let edge = size / 4;
        let corner = (x == 0 || x == size - 1) && (y == 0 || y == size - 1);
        if corner {
            Rgba([0, 0, 0, 0])
        } else if (edge..size - edge).contains(&x) && (edge..size - edge).contains(&y) {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([20, 40, 60, 255])
        }
    });
    encode_png(&image).expect("encoding an in-memory PNG cannot fail")
}

/// Poll until the job reaches a terminal status.
///
/// Panics after `timeout` so a stuck run fails the test instead of hanging.
pub async fn wait_for_terminal(manager: &JobManager, id: Uuid, timeout: Duration) -> Job {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let job = manager.status(id).expect("job should exist while waiting");
        if job.status.is_terminal() {
            return job;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("job {} still {} after {:?}", id, job.status, timeout);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
