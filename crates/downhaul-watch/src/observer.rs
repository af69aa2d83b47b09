//! Native-notification subscription for a single watched directory.

use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::error::{WatchError, WatchResult};
use crate::policy::WatchPolicy;
use crate::Candidate;

/// Live watch on one directory.
///
/// The observer runs for the process lifetime; dropping the handle tears the
/// native watch down. Candidates are delivered over the channel supplied at
/// spawn time, each on the notification backend's thread, so the receiver
/// must not assume any particular delivery context.
pub struct DirectoryObserver {
    directory: PathBuf,
    // Keeps the native watch alive; never read after construction.
    _watcher: RecommendedWatcher,
}

impl DirectoryObserver {
    /// Subscribe to `directory` and start emitting candidates that qualify
    /// under `policy`.
    ///
    /// # Errors
    ///
    /// Returns an error when the native watcher cannot be constructed or the
    /// directory cannot be subscribed (missing or inaccessible). Callers
    /// treat this as fatal; the watch is never retried silently.
    pub fn spawn(
        directory: &Path,
        policy: WatchPolicy,
        candidates: UnboundedSender<Candidate>,
    ) -> WatchResult<Self> {
        let mut watcher = RecommendedWatcher::new(
            move |outcome: Result<Event, notify::Error>| match outcome {
                Ok(event) => Self::handle_event(policy, &event, &candidates),
                Err(error) => warn!(error = %error, "filesystem notification error"),
            },
            Config::default(),
        )
        .map_err(|source| WatchError::Init { source })?;

        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Subscribe {
                path: directory.to_path_buf(),
                source,
            })?;

        info!(
            directory = %directory.display(),
            policy = ?policy,
            "directory watch established"
        );

        Ok(Self {
            directory: directory.to_path_buf(),
            _watcher: watcher,
        })
    }

    /// Directory this observer is subscribed to.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn handle_event(policy: WatchPolicy, event: &Event, candidates: &UnboundedSender<Candidate>) {
        for path in policy.candidate_paths(event) {
            let Some(candidate) = Candidate::from_path(path) else {
                continue;
            };
            debug!(
                candidate_id = %candidate.id,
                path = %candidate.path.display(),
                "candidate detected"
            );
            // A closed receiver means the process is shutting down; there is
            // nothing useful left to do with the event.
            let _ = candidates.send(candidate);
        }
    }
}
