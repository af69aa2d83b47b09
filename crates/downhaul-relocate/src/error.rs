//! # Design
//!
//! - Provide structured, constant-message errors for the relocate pipeline.
//! - Capture operation context (paths, operations) to make failures
//!   reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for relocation operations.
pub type RelocateResult<T> = Result<T, RelocateError>;

/// Errors produced while preparing or performing a move.
///
/// Every variant is recoverable per candidate: the pipeline logs it, emits a
/// `move_failed` event, and abandons the candidate in place. Nothing here
/// ever propagates out of a candidate's task.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// IO failures while interacting with the filesystem.
    #[error("relocate io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl RelocateError {
    pub(crate) fn io(operation: &'static str, path: &std::path::Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}
