mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use itunes_client::{FetchError, RetryPolicy, RetryingFetcher};

use common::{serve, serve_dropping, Script};

fn fetcher(max_attempts: u32, base_ms: u64, multiplier: f64) -> RetryingFetcher {
    let policy = RetryPolicy::builder()
        .max_attempts(max_attempts)
        .base_delay(Duration::from_millis(base_ms))
        .multiplier(multiplier)
        .jitter(Duration::ZERO)
        .build();
    RetryingFetcher::new(reqwest::Client::new(), policy).with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn succeeds_after_transient_unavailability() {
    let script = Script::new(vec![(503, "busy"), (503, "busy"), (200, "icon-bytes")]);
    let base = serve(script.clone()).await;

    let body = fetcher(3, 25, 4.0)
        .fetch(&format!("{}/icon.png", base))
        .await
        .unwrap();

    assert_eq!(&body[..], b"icon-bytes");
    assert_eq!(script.hit_count(), 3);

    // Gaps between attempts follow the backoff: 25ms then 100ms.
    let hits = script.hit_times();
    let first_gap = hits[1] - hits[0];
    let second_gap = hits[2] - hits[1];
    assert!(first_gap >= Duration::from_millis(25));
    assert!(second_gap >= Duration::from_millis(100));
    assert!(second_gap >= first_gap);
}

#[tokio::test]
async fn not_found_fails_without_retry() {
    let script = Script::new(vec![(404, "missing"), (200, "never served")]);
    let base = serve(script.clone()).await;

    let err = fetcher(3, 25, 2.0)
        .fetch(&format!("{}/icon.png", base))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert_eq!(script.hit_count(), 1);
}

#[tokio::test]
async fn exhausts_after_max_attempts() {
    let script = Script::new(vec![(503, "busy")]);
    let base = serve(script.clone()).await;

    let err = fetcher(2, 5, 2.0)
        .fetch(&format!("{}/icon.png", base))
        .await
        .unwrap_err();

    match err {
        FetchError::Exhausted { attempts, last, .. } => {
            assert_eq!(attempts, 2);
            assert!(last.contains("503"));
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(script.hit_count(), 2);
}

#[tokio::test]
async fn connection_refused_is_retried_then_exhausted() {
    // Bind then drop to get a port with nothing listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = fetcher(2, 5, 2.0)
        .fetch(&format!("http://{}/icon.png", addr))
        .await
        .unwrap_err();

    assert!(err.is_exhausted());
}

#[tokio::test]
async fn status_outside_retry_set_is_not_retried() {
    let script = Script::new(vec![(500, "boom"), (200, "ok")]);
    let base = serve(script.clone()).await;

    let policy = RetryPolicy::builder()
        .retryable_statuses([503].into_iter().collect())
        .base_delay(Duration::from_millis(5))
        .jitter(Duration::ZERO)
        .build();
    let err = RetryingFetcher::new(reqwest::Client::new(), policy)
        .fetch(&format!("{}/icon.png", base))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(script.hit_count(), 1);
}

#[tokio::test]
async fn dropped_connection_is_retried() {
    let (base, accepted) = serve_dropping(1, "icon-bytes").await;

    let body = fetcher(3, 5, 2.0)
        .fetch(&format!("{}/icon.png", base))
        .await
        .unwrap();

    assert_eq!(&body[..], b"icon-bytes");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn dropped_connections_exhaust_attempts() {
    let (base, accepted) = serve_dropping(usize::MAX, "never served").await;

    let err = fetcher(2, 5, 2.0)
        .fetch(&format!("{}/icon.png", base))
        .await
        .unwrap_err();

    assert!(err.is_exhausted());
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn timed_out_request_is_retried() {
    let script = Script::with_delays(
        vec![(200, "icon-bytes")],
        vec![Duration::from_millis(500)],
    );
    let base = serve(script.clone()).await;

    let body = fetcher(3, 5, 2.0)
        .with_timeout(Duration::from_millis(50))
        .fetch(&format!("{}/icon.png", base))
        .await
        .unwrap();

    assert_eq!(&body[..], b"icon-bytes");
    assert_eq!(script.hit_count(), 2);
}
