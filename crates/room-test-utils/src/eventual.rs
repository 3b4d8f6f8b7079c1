//! Eventual assertion helper for actor tests.
//!
//! Actors apply SDK notifications on their own tasks, so a test observes the
//! effect some scheduler turns later. [`eventually`] polls a condition until
//! it holds or the timeout elapses.

use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Default timeout for [`assert_eventually`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay between checks.
const POLL_DELAY: Duration = Duration::from_millis(5);

/// Poll `condition` until it returns true or `timeout` elapses.
///
/// Returns whether the condition was met.
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_DELAY).await;
    }
}

/// Panic with `what` unless `condition` holds within [`DEFAULT_TIMEOUT`].
pub async fn assert_eventually<F>(what: &str, condition: F)
where
    F: FnMut() -> bool,
{
    assert!(
        eventually(DEFAULT_TIMEOUT, condition).await,
        "condition not met within {DEFAULT_TIMEOUT:?}: {what}"
    );
}
