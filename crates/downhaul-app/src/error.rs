//! # Design
//!
//! - Centralize application-level errors for bootstrap and wiring.
//! - Keep error messages constant while carrying context fields for
//!   debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
///
/// Every variant is a fatal startup condition; once the watch is live, all
/// failures are per-candidate and stay inside the pipeline.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: downhaul_config::ConfigError,
    },
    /// Directory watch operations failed.
    #[error("directory watch operation failed")]
    Watch {
        /// Operation identifier.
        operation: &'static str,
        /// Source watch error.
        source: downhaul_watch::WatchError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: downhaul_telemetry::TelemetryError,
    },
    /// A platform directory could not be resolved.
    #[error("platform directory unresolvable")]
    MissingDirectory {
        /// Name of the unresolvable directory.
        name: &'static str,
    },
    /// IO operations failed.
    #[error("io operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Optional path involved in the failure.
        path: Option<PathBuf>,
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: downhaul_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn watch(
        operation: &'static str,
        source: downhaul_watch::WatchError,
    ) -> Self {
        Self::Watch { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: downhaul_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }
}
