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

//! Settle-and-relocate pipeline for detected downloads.
//!
//! For each candidate the pipeline decides when the file is safe to move (the
//! settle loop), computes a collision-free destination name, performs the
//! move, and optionally asks the platform to open the result. Candidates are
//! processed on independent tasks; nothing a single candidate does can stall
//! the observer or its siblings.
//!
//! Layout: `service.rs` (`RelocateService` + settle algorithm), `launcher.rs`
//! (post-move open), `error.rs` (error primitives).

pub mod error;
pub mod launcher;
pub mod service;

pub use error::{RelocateError, RelocateResult};
pub use launcher::{Launcher, SystemLauncher};
pub use service::{Outcome, RelocateService, SettleOptions, POLL_INTERVAL};
