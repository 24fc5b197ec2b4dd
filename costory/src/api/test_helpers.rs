//! Test helpers for the Costory API

use std::time::Duration;

use super::{Client, RetryConfig};

#[allow(dead_code)]
pub fn create_test_client(url: &str) -> Client {
    Client::new(url, "test-slug", "test-token").unwrap()
}

/// Client whose retries wait a millisecond instead of half a second.
#[allow(dead_code)]
pub fn create_fast_client(url: &str) -> Client {
    Client::with_config(
        url,
        "test-slug",
        "test-token",
        RetryConfig {
            base_backoff: Duration::from_millis(1),
            ..RetryConfig::default()
        },
    )
    .unwrap()
}
