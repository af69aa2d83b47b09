//! Test fixtures and environment helpers.

use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use tokio::time::Instant;

/// Cadence used when polling a predicate in [`wait_for`].
const POLL_EVERY: Duration = Duration::from_millis(20);

/// Create a labelled temporary directory for a test.
///
/// # Errors
///
/// Returns an error when the directory cannot be created.
pub fn temp_dir() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("downhaul-").tempdir()?)
}

/// Poll `predicate` until it returns `true` or `timeout` elapses.
///
/// Returns the final predicate verdict, so callers can simply assert on it.
pub async fn wait_for<F>(timeout: Duration, mut predicate: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(POLL_EVERY).await;
    }
    predicate()
}
