//! Doubles for the pipeline's external collaborators.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use downhaul_config::{Settings, SettingsSource};
use downhaul_relocate::Launcher;

/// Settings source backed by shared memory, editable while a test runs.
#[derive(Clone, Default)]
pub struct LiveSettings {
    inner: Arc<RwLock<Settings>>,
}

impl LiveSettings {
    /// Start from the provided settings.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replace the settings observed by subsequent reads.
    pub fn set(&self, settings: Settings) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = settings;
        }
    }
}

#[async_trait]
impl SettingsSource for LiveSettings {
    async fn current(&self) -> Settings {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Launcher that records every requested path and always succeeds.
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingLauncher {
    /// Fresh launcher with an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths handed to the launcher so far, in request order.
    ///
    /// # Panics
    ///
    /// Panics if the record mutex has been poisoned.
    #[must_use]
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().expect("launcher record poisoned").clone()
    }
}

impl Launcher for RecordingLauncher {
    fn open(&self, path: &Path) -> io::Result<()> {
        self.opened
            .lock()
            .expect("launcher record poisoned")
            .push(path.to_path_buf());
        Ok(())
    }
}

/// Launcher that rejects every request, for failure-path coverage.
#[derive(Clone, Copy, Default)]
pub struct FailingLauncher;

impl Launcher for FailingLauncher {
    fn open(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::other("launcher rejected request"))
    }
}
