//! Error types for directory observation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while establishing a directory watch.
///
/// All variants are startup conditions; once the watch is live the observer
/// only logs notification errors and keeps running.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The native watcher could not be constructed.
    #[error("watcher construction failed")]
    Init {
        /// Source notification-backend error.
        source: notify::Error,
    },
    /// The watch subscription on the target directory failed.
    #[error("watch subscription failed")]
    Subscribe {
        /// Directory the subscription was attempted on.
        path: PathBuf,
        /// Source notification-backend error.
        source: notify::Error,
    },
}

/// Convenience alias for watch results.
pub type WatchResult<T> = Result<T, WatchError>;
