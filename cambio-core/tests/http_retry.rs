//! Retry behavior of the resilient HTTP client against a scripted server.

mod common;

use cambio_core::data::{create_client, HttpClient, RetryPolicy};
use common::{refused_url, Reply, TestServer};
use std::time::{Duration, Instant};

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff_base: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

fn client(max_retries: u32) -> HttpClient {
    create_client(fast_policy(max_retries), "cambio-test/1.0").unwrap()
}

#[test]
fn retries_retryable_status_until_success() {
    let server = TestServer::start(vec![
        Reply::status(503, "busy"),
        Reply::status(502, "bad gateway"),
        Reply::ok("fine"),
    ]);

    let resp = client(3)
        .get(&format!("{}/ping", server.url), Duration::from_secs(2))
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().unwrap(), "fine");
    assert_eq!(server.hits(), 3);
}

#[test]
fn final_retryable_status_is_returned_not_raised() {
    let server = TestServer::start(vec![
        Reply::status(500, "a"),
        Reply::status(500, "b"),
        Reply::status(500, "c"),
    ]);

    let resp = client(2)
        .get(&format!("{}/ping", server.url), Duration::from_secs(2))
        .unwrap();

    assert_eq!(resp.status().as_u16(), 500);
    assert_eq!(server.hits(), 3);
}

#[test]
fn non_retryable_status_returns_immediately() {
    let server = TestServer::start(vec![Reply::status(404, "nope"), Reply::ok("unused")]);

    let resp = client(3)
        .get(&format!("{}/ping", server.url), Duration::from_secs(2))
        .unwrap();

    assert_eq!(resp.status().as_u16(), 404);
    assert_eq!(server.hits(), 1);
}

#[test]
fn retry_after_header_is_honored_within_cap() {
    let server = TestServer::start(vec![
        Reply::status(429, "slow down").with_header("Retry-After", "0"),
        Reply::ok("ok"),
    ]);

    let resp = client(1)
        .get(&format!("{}/ping", server.url), Duration::from_secs(2))
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(server.hits(), 2);
}

#[test]
fn retry_after_is_capped_by_max_backoff() {
    let server = TestServer::start(vec![
        Reply::status(503, "later").with_header("Retry-After", "3600"),
        Reply::ok("ok"),
    ]);
    let policy = RetryPolicy {
        max_backoff: Duration::from_millis(20),
        ..fast_policy(1)
    };
    let client = create_client(policy, "cambio-test/1.0").unwrap();

    let started = Instant::now();
    let resp = client
        .get(&format!("{}/ping", server.url), Duration::from_secs(2))
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn retry_after_ignored_on_other_statuses() {
    let server = TestServer::start(vec![
        Reply::status(500, "oops").with_header("Retry-After", "3600"),
        Reply::ok("ok"),
    ]);

    let started = Instant::now();
    let resp = client(1)
        .get(&format!("{}/ping", server.url), Duration::from_secs(2))
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    // The 30 s cap would apply if the hint were honored.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn connection_refused_is_retried_then_raised() {
    let url = refused_url();
    let policy = RetryPolicy {
        max_retries: 3,
        backoff_base: Duration::from_millis(200),
        ..RetryPolicy::default()
    };
    let client = create_client(policy, "cambio-test/1.0").unwrap();

    let started = Instant::now();
    let err = client
        .get(&format!("{url}/ping"), Duration::from_secs(1))
        .unwrap_err();

    assert!(err.is_connect(), "expected connect error, got {err}");
    // 200 + 400 + 800 ms of backoff between the four attempts.
    assert!(
        started.elapsed() >= Duration::from_millis(1400),
        "gave up after {:?}",
        started.elapsed()
    );
}

#[test]
fn read_timeout_is_retried() {
    let server = TestServer::start(vec![
        Reply::ok("too late").delayed(Duration::from_millis(1500)),
        Reply::ok("in time"),
    ]);

    let resp = client(1)
        .get(&format!("{}/ping", server.url), Duration::from_secs(1))
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().unwrap(), "in time");
    assert_eq!(server.hits(), 2);
}

#[test]
fn identifying_header_on_every_request() {
    let server = TestServer::start(vec![Reply::status(503, ""), Reply::ok("")]);

    client(1)
        .get(&format!("{}/ping", server.url), Duration::from_secs(2))
        .unwrap();

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    for head in requests {
        assert!(head.starts_with("get /ping"), "unexpected request: {head}");
        assert!(head.contains("user-agent: cambio-test/1.0"));
    }
}

#[test]
fn client_is_reusable() {
    let server = TestServer::start(vec![Reply::ok("one"), Reply::ok("two")]);
    let client = client(0);

    let first = client
        .get(&format!("{}/a", server.url), Duration::from_secs(2))
        .unwrap();
    assert_eq!(first.text().unwrap(), "one");
    let second = client
        .get(&format!("{}/b", server.url), Duration::from_secs(2))
        .unwrap();
    assert_eq!(second.text().unwrap(), "two");
}
