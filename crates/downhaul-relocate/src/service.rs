//! Settle algorithm, collision-free naming, and the move itself.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use downhaul_config::SettingsSource;
use downhaul_events::{Event, EventBus};
use downhaul_watch::Candidate;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{RelocateError, RelocateResult};
use crate::launcher::Launcher;

/// Fixed cadence of the settle loop.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Settle-loop tuning.
///
/// Production always runs the fixed cadence; tests inject shorter intervals.
/// There is intentionally no retry cap or timeout field: an unattended agent
/// waits as long as the producer keeps the file busy rather than risk moving
/// a partially written file.
#[derive(Debug, Clone, Copy)]
pub struct SettleOptions {
    /// Interval between exclusive-access probes, and the quiet window the
    /// last-modification timestamp must clear.
    pub poll_interval: Duration,
}

impl Default for SettleOptions {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Terminal result of one candidate's processing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The file was relocated to a collision-free destination.
    Moved {
        /// Path the file now lives at.
        destination: PathBuf,
    },
    /// Relocation is disabled; the settled file stays at its source path.
    LeftInPlace,
    /// Processing stopped without a completed move; whatever still exists on
    /// disk is left untouched.
    Abandoned,
}

/// Per-candidate probe verdict inside the settle loop.
enum Probe {
    /// Both settle conditions hold.
    Settled,
    /// Still being written, locked, or otherwise not yet safe; keep waiting.
    Pending,
    /// The source no longer exists; there is nothing left to process.
    Vanished,
}

/// Executes the settle-and-relocate pipeline for each candidate.
#[derive(Clone)]
pub struct RelocateService {
    settings: Arc<dyn SettingsSource>,
    events: EventBus,
    launcher: Arc<dyn Launcher>,
    options: SettleOptions,
}

impl RelocateService {
    /// Construct a pipeline reading live settings through `settings` and
    /// reporting lifecycle transitions on `events`.
    #[must_use]
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        events: EventBus,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            settings,
            events,
            launcher,
            options: SettleOptions::default(),
        }
    }

    /// Override the settle-loop tuning.
    #[must_use]
    pub fn with_options(mut self, options: SettleOptions) -> Self {
        self.options = options;
        self
    }

    /// Process `candidate` on its own task so concurrent candidates never
    /// block one another or the observer.
    pub fn spawn(&self, candidate: Candidate) -> JoinHandle<Outcome> {
        let service = self.clone();
        tokio::spawn(async move { service.process(candidate).await })
    }

    /// Run the full pipeline for one candidate: settle, relocate, open.
    ///
    /// At most one move attempt is ever issued per candidate, and no failure
    /// past this point escapes the call; per-candidate errors end in
    /// `Outcome::Abandoned`.
    pub async fn process(&self, candidate: Candidate) -> Outcome {
        let _ = self.events.publish(Event::FileDetected {
            candidate_id: candidate.id,
            path: candidate.path.display().to_string(),
        });

        let mut polls: u32 = 0;
        loop {
            tokio::time::sleep(self.options.poll_interval).await;
            polls = polls.saturating_add(1);
            match probe_candidate(&candidate.path, self.options.poll_interval) {
                Probe::Settled => break,
                Probe::Pending => {}
                Probe::Vanished => {
                    info!(
                        candidate_id = %candidate.id,
                        path = %candidate.path.display(),
                        "source vanished while settling; abandoning"
                    );
                    let _ = self.events.publish(Event::FileAbandoned {
                        candidate_id: candidate.id,
                        path: candidate.path.display().to_string(),
                    });
                    return Outcome::Abandoned;
                }
            }
        }

        debug!(
            candidate_id = %candidate.id,
            path = %candidate.path.display(),
            polls,
            "candidate settled"
        );
        let _ = self.events.publish(Event::FileSettled {
            candidate_id: candidate.id,
            path: candidate.path.display().to_string(),
            polls,
        });

        // Settings are read live at each decision point, never cached across
        // candidates; an edit takes effect on the next arriving file.
        let settings = self.settings.current().await;
        let moved_to = if let Some(target_dir) = settings.relocation_target() {
            match relocate(&candidate, target_dir) {
                Ok(destination) => {
                    info!(
                        candidate_id = %candidate.id,
                        source = %candidate.path.display(),
                        destination = %destination.display(),
                        "file relocated"
                    );
                    let _ = self.events.publish(Event::FileMoved {
                        candidate_id: candidate.id,
                        source: candidate.path.display().to_string(),
                        destination: destination.display().to_string(),
                    });
                    Some(destination)
                }
                Err(relocate_error) => {
                    error!(
                        candidate_id = %candidate.id,
                        path = %candidate.path.display(),
                        error = %relocate_error,
                        "could not move file; leaving in place"
                    );
                    let _ = self.events.publish(Event::MoveFailed {
                        candidate_id: candidate.id,
                        path: candidate.path.display().to_string(),
                        message: relocate_error.to_string(),
                    });
                    return Outcome::Abandoned;
                }
            }
        } else {
            debug!(
                candidate_id = %candidate.id,
                path = %candidate.path.display(),
                "relocation disabled; leaving file in place"
            );
            let _ = self.events.publish(Event::RelocateSkipped {
                candidate_id: candidate.id,
                path: candidate.path.display().to_string(),
            });
            None
        };

        let final_path = moved_to
            .clone()
            .unwrap_or_else(|| candidate.path.clone());

        // The open flag is read again after the move so an edit made while
        // the candidate settled is honoured for this very file.
        if self.settings.current().await.open_immediately {
            self.open_file(&candidate, &final_path);
        }

        moved_to.map_or(Outcome::LeftInPlace, |destination| Outcome::Moved {
            destination,
        })
    }

    fn open_file(&self, candidate: &Candidate, path: &Path) {
        match self.launcher.open(path) {
            Ok(()) => {
                let _ = self.events.publish(Event::FileOpened {
                    candidate_id: candidate.id,
                    path: path.display().to_string(),
                });
            }
            Err(open_error) => {
                warn!(
                    candidate_id = %candidate.id,
                    path = %path.display(),
                    error = %open_error,
                    "could not open file"
                );
                let _ = self.events.publish(Event::OpenFailed {
                    candidate_id: candidate.id,
                    path: path.display().to_string(),
                    message: open_error.to_string(),
                });
            }
        }
    }
}

/// One settle probe: exclusive access plus a quiet modification window.
///
/// An exclusive-lock conflict is the expected steady state while the
/// producing application still writes; only a vanished source ends the wait.
fn probe_candidate(path: &Path, quiet_window: Duration) -> Probe {
    let file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(open_error) if open_error.kind() == io::ErrorKind::NotFound => return Probe::Vanished,
        Err(_) => return Probe::Pending,
    };

    // A held lock surfaces as `WouldBlock`; either way the file is not ours
    // yet, so every lock failure reads as "keep waiting".
    if file.try_lock().is_err() {
        return Probe::Pending;
    }

    let modified = match file.metadata().and_then(|metadata| metadata.modified()) {
        Ok(modified) => modified,
        Err(_) => return Probe::Pending,
    };

    // A modification inside the quiet window, or a timestamp from the
    // future, both mean the producer may still be writing.
    match SystemTime::now().duration_since(modified) {
        Ok(age) if age >= quiet_window => Probe::Settled,
        _ => Probe::Pending,
    }
}

/// Move a settled candidate under `destination_dir`, disambiguating on
/// collision.
fn relocate(candidate: &Candidate, destination_dir: &Path) -> RelocateResult<PathBuf> {
    fs::create_dir_all(destination_dir)
        .map_err(|source| RelocateError::io("destination.create_dir", destination_dir, source))?;

    let destination = unique_destination(destination_dir, &candidate.file_name);
    move_file(&candidate.path, &destination)?;
    Ok(destination)
}

/// First non-existing name under `dir` for `file_name`, inserting ` (N)`
/// before the extension when the plain name is taken.
///
/// Existence is re-checked after each increment rather than pre-listing the
/// directory, which self-corrects against concurrent creations; simultaneous
/// writers racing for the same disambiguated name remain unguarded.
fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let direct = dir.join(file_name);
    if !direct.exists() {
        return direct;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    let extension = name.extension().and_then(|extension| extension.to_str());

    let mut counter: u32 = 1;
    loop {
        let attempt = extension.map_or_else(
            || format!("{stem} ({counter})"),
            |extension| format!("{stem} ({counter}).{extension}"),
        );
        let path = dir.join(attempt);
        if !path.exists() {
            return path;
        }
        counter = counter.saturating_add(1);
    }
}

/// Rename into place, falling back to copy plus source removal when the
/// destination lives on another volume.
fn move_file(source: &Path, destination: &Path) -> RelocateResult<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(_rename_error) => {
            fs::copy(source, destination)
                .map_err(|copy_error| RelocateError::io("move.copy", destination, copy_error))?;
            fs::remove_file(source)
                .map_err(|cleanup_error| RelocateError::io("move.cleanup", source, cleanup_error))
        }
    }
}
