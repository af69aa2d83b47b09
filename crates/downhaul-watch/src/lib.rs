#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Directory observation for the Downhaul agent.
//!
//! Subscribes to native filesystem notifications for a single directory,
//! filters them through a watch policy, and emits one candidate per
//! qualifying transition. Duplicate native notifications are tolerated
//! downstream; the observer never deduplicates.
//!
//! Layout: `policy.rs` (match policies), `observer.rs` (`DirectoryObserver`),
//! `error.rs` (error primitives).

pub mod error;
pub mod observer;
pub mod policy;

use std::path::PathBuf;

use uuid::Uuid;

pub use error::{WatchError, WatchResult};
pub use observer::DirectoryObserver;
pub use policy::WatchPolicy;

/// A file detected by the observer, pending settle-and-move evaluation.
///
/// A candidate has no identity beyond one processing attempt; re-creation
/// under the same name after a move is a brand-new candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Identifier assigned to this processing attempt, used for correlation
    /// in logs and events.
    pub id: Uuid,
    /// Absolute source path in the watched directory.
    pub path: PathBuf,
    /// Base name component of the source path.
    pub file_name: String,
}

impl Candidate {
    /// Build a candidate from a reported path. Returns `None` when the path
    /// has no usable file name component.
    #[must_use]
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            id: Uuid::new_v4(),
            path,
            file_name,
        })
    }
}
