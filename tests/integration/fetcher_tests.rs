//! Fetcher retry behavior against a live mock server

use catalog_harvest::config::{FetcherConfig, UserAgentConfig};
use catalog_harvest::crawler::{Fetcher, RetryPolicy};
use catalog_harvest::FetchError;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(retries: u32, wait_ms: u64, timeout_ms: u64) -> Fetcher {
    let config = FetcherConfig {
        retries,
        retry_wait_ms: wait_ms,
        timeout_ms,
    };
    Fetcher::from_config(&config, &UserAgentConfig::default()).expect("Failed to build fetcher")
}

#[tokio::test]
async fn test_retry_exhaustion_uses_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = fetcher(3, 50, 2_000);
    let url = format!("{}/flaky", server.uri());

    let started = Instant::now();
    let result = fetcher.fetch(&url).await;
    let elapsed = started.elapsed();

    match result {
        Err(FetchError::Status {
            url: failed,
            status,
            attempts,
        }) => {
            assert_eq!(failed, url);
            assert_eq!(status, 500);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected FetchError::Status, got {:?}", other),
    }

    // Two waits between three attempts, none after the last
    assert!(elapsed >= Duration::from_millis(100), "elapsed {:?}", elapsed);
    server.verify().await;
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-wp-totalpages", "4")
                .set_body_string("{\"ok\":true}"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = fetcher(3, 10, 2_000)
        .fetch(&format!("{}/page", server.uri()))
        .await
        .expect("second attempt should succeed");

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "{\"ok\":true}");
    assert_eq!(response.header("X-WP-TotalPages"), Some("4"));
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_timeout_counts_as_failed_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&server)
        .await;

    let result = fetcher(2, 10, 100)
        .fetch(&format!("{}/slow", server.uri()))
        .await;

    match result {
        Err(FetchError::Transport { attempts, .. }) => assert_eq!(attempts, 2),
        other => panic!("expected FetchError::Transport, got {:?}", other),
    }
}

#[tokio::test]
async fn test_single_attempt_policy_does_not_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(3, 10, 2_000).with_policy(RetryPolicy::new(1, Duration::from_secs(60)));

    let started = Instant::now();
    let result = fetcher.fetch(&format!("{}/missing", server.uri())).await;

    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_sends_configured_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(header("user-agent", "catalog-harvest-test/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let user_agent = UserAgentConfig {
        value: "catalog-harvest-test/1.0".to_string(),
    };
    let config = FetcherConfig {
        retries: 1,
        retry_wait_ms: 10,
        timeout_ms: 2_000,
    };
    let fetcher = Fetcher::from_config(&config, &user_agent).unwrap();

    let response = fetcher.fetch(&format!("{}/ua", server.uri())).await;
    assert!(response.is_ok());
}
