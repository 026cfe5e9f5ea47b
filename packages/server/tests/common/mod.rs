// Common test utilities
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use icon_core::domains::icons::list_entries;
use icon_core::kernel::jobs::testing::{mock_deps, MockIconResolver, MockImageFetcher};
use icon_core::kernel::jobs::{JobManager, ManagerConfig};
use tempfile::TempDir;

/// Small target keeps recoloring fast in tests.
pub const TEST_TARGET_SIZE: u32 = 32;

pub const WAIT: Duration = Duration::from_secs(10);

/// A job manager over mocks, working inside a throwaway directory.
pub struct TestHarness {
    pub work_dir: TempDir,
    pub resolver: Arc<MockIconResolver>,
    pub fetcher: Arc<MockImageFetcher>,
    pub manager: JobManager,
}

impl TestHarness {
    pub fn new(resolver: MockIconResolver, fetcher: MockImageFetcher) -> Self {
        init_tracing();

        let work_dir = tempfile::tempdir().expect("temp work dir");
        let resolver = Arc::new(resolver);
        let fetcher = Arc::new(fetcher);
        let manager = manager_for(&resolver, &fetcher, work_dir.path());

        Self {
            work_dir,
            resolver,
            fetcher,
            manager,
        }
    }

    pub fn empty() -> Self {
        Self::new(MockIconResolver::new(), MockImageFetcher::new())
    }

    /// A second manager over the same mocks, rooted at `work_dir`.
    pub fn manager_in(&self, work_dir: impl Into<PathBuf>) -> JobManager {
        manager_for(&self.resolver, &self.fetcher, work_dir)
    }
}

fn manager_for(
    resolver: &Arc<MockIconResolver>,
    fetcher: &Arc<MockImageFetcher>,
    work_dir: impl Into<PathBuf>,
) -> JobManager {
    JobManager::new(
        mock_deps(resolver.clone(), fetcher.clone()),
        ManagerConfig::builder()
            .work_dir(work_dir.into())
            .target_size(TEST_TARGET_SIZE)
            .item_concurrency(2usize)
            .build(),
    )
}

/// Entry names of an in-memory zip, via a temp file.
pub fn zip_entries(bytes: &[u8]) -> Vec<String> {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("result.zip");
    std::fs::write(&path, bytes).expect("write zip");
    list_entries(&path).expect("read zip")
}

/// Poll until `path` no longer exists.
pub async fn wait_until_removed(path: &Path) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while path.exists() {
        if tokio::time::Instant::now() >= deadline {
            panic!("{} still exists after {:?}", path.display(), WAIT);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn init_tracing() {
    // Run tests with: RUST_LOG=debug cargo test -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
