//! Async test helpers
//!
//! Timeout wrappers and polling utilities for testing timer-driven code.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout duration for tests (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Short timeout for tests that should fail fast (100ms)
pub const SHORT_TEST_TIMEOUT: Duration = Duration::from_millis(100);

/// Polling cadence for [`wait_for`]
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run a future, panicking if it does not complete within `duration`
pub async fn assert_completes_within<F, T>(duration: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => panic!("future did not complete within {:?}", duration),
    }
}

/// Poll an async condition until it holds or `wait` elapses.
/// Panics on timeout so the failing assertion sits at the call site.
pub async fn wait_for<C, Fut>(wait: Duration, mut condition: C)
where
    C: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        if condition().await {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {:?}", wait);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
