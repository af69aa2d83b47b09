//! Settings persistence and the read-live accessor handed to the pipeline.
//!
//! # Design
//! - `ConfigService` owns the settings file: load-or-default at startup,
//!   atomic read-modify-write on update.
//! - `SettingsSource` is the injected read-only accessor the pipeline uses at
//!   event-handling time. Every call re-reads the file so edits take effect on
//!   the next arriving file, never retroactively; a failed read falls back to
//!   the last good snapshot instead of stalling candidates.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::model::Settings;

/// Read-only accessor for the current settings, consumed by the pipeline.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    /// Snapshot of the settings as of this call.
    async fn current(&self) -> Settings;
}

/// File-backed settings service.
#[derive(Clone)]
pub struct ConfigService {
    path: PathBuf,
    last_good: Arc<RwLock<Settings>>,
}

impl ConfigService {
    /// Load settings from `path`, falling back to defaults when the file does
    /// not exist yet. The file is not created until the first update.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let settings = Self::read_file(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            last_good: Arc::new(RwLock::new(settings)),
        })
    }

    /// Path of the backing settings file.
    #[must_use]
    pub fn settings_path(&self) -> &Path {
        &self.path
    }

    /// Re-read the settings file, falling back to the last good snapshot when
    /// the read or parse fails.
    #[must_use]
    pub fn snapshot(&self) -> Settings {
        match Self::read_file(&self.path) {
            Ok(Some(settings)) => {
                self.remember(&settings);
                settings
            }
            Ok(None) => self.last_known(),
            Err(error) => {
                warn!(
                    path = %self.path.display(),
                    error = %error,
                    "settings re-read failed; using last good snapshot"
                );
                self.last_known()
            }
        }
    }

    /// Apply a mutation to the settings and persist the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be serialized or written.
    pub fn update<F>(&self, apply: F) -> ConfigResult<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.snapshot();
        apply(&mut settings);
        self.persist(&settings)?;
        self.remember(&settings);
        Ok(settings)
    }

    fn read_file(path: &Path) -> ConfigResult<Option<Settings>> {
        let payload = match fs::read_to_string(path) {
            Ok(payload) => payload,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(ConfigError::io("settings.read", path, error)),
        };
        let settings = serde_json::from_str(&payload).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(settings))
    }

    fn persist(&self, settings: &Settings) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::io("settings.create_parent", parent, source))?;
        }
        let payload = serde_json::to_string_pretty(settings)
            .map_err(|source| ConfigError::Serialize { source })?;
        fs::write(&self.path, payload)
            .map_err(|source| ConfigError::io("settings.write", &self.path, source))
    }

    fn remember(&self, settings: &Settings) {
        if let Ok(mut guard) = self.last_good.write() {
            *guard = settings.clone();
        }
    }

    fn last_known(&self) -> Settings {
        self.last_good
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SettingsSource for ConfigService {
    async fn current(&self) -> Settings {
        self.snapshot()
    }
}
