//! Shared test doubles for unit tests across the crate.
mod fake_engine;

pub(crate) use fake_engine::*;

use std::time::Duration;

/// Polls `condition` every few milliseconds until it holds or `within` elapses.
pub(crate) async fn eventually<F>(
    within: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Blocking flavour of [`eventually`] for tests without a runtime.
pub(crate) fn wait_until<F>(
    within: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = std::time::Instant::now() + within;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
