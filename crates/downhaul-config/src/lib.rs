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

//! File-backed configuration facade for the Downhaul agent.
//!
//! Layout: `model.rs` (typed settings model), `service.rs` (`ConfigService` +
//! `SettingsSource`), `error.rs` (error primitives).

pub mod error;
pub mod model;
pub mod service;

pub use error::{ConfigError, ConfigResult};
pub use model::{Settings, WatchProfile};
pub use service::{ConfigService, SettingsSource};
