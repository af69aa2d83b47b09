//! Typed settings model for the agent.
//!
//! # Design
//! - Pure data carriers used by the configuration service and the pipeline.
//! - Keeps domain types separate from IO/wiring code in `service.rs`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// User-editable agent settings persisted as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Destination directory for relocated downloads. `None` or an empty
    /// path disables relocation entirely and leaves settled files in place.
    pub download_location: Option<PathBuf>,
    /// Whether to hand a finished file to the platform's default handler.
    pub open_immediately: bool,
    /// Which watch preset the observer runs with.
    pub profile: WatchProfile,
}

impl Settings {
    /// Effective relocation target, treating an empty path as disabled.
    #[must_use]
    pub fn relocation_target(&self) -> Option<&Path> {
        self.download_location
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

/// Watch preset pairing a folder-discovery strategy with an observer policy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WatchProfile {
    /// Watch the platform downloads folder and fire when a temp-named file
    /// is renamed into place.
    #[default]
    TempRename,
    /// Watch a fixed spool directory under the OS temp root and fire on any
    /// file creation.
    SpoolCreate,
}

impl WatchProfile {
    /// Render the profile as its lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TempRename => "temp_rename",
            Self::SpoolCreate => "spool_create",
        }
    }
}

impl FromStr for WatchProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temp_rename" => Ok(Self::TempRename),
            "spool_create" => Ok(Self::SpoolCreate),
            other => Err(format!("invalid watch profile '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_relocation_and_opening() {
        let settings = Settings::default();
        assert!(settings.relocation_target().is_none());
        assert!(!settings.open_immediately);
        assert_eq!(settings.profile, WatchProfile::TempRename);
    }

    #[test]
    fn empty_download_location_counts_as_disabled() {
        let settings = Settings {
            download_location: Some(PathBuf::new()),
            ..Settings::default()
        };
        assert!(settings.relocation_target().is_none());
    }

    #[test]
    fn watch_profile_round_trips_through_strings() {
        for profile in [WatchProfile::TempRename, WatchProfile::SpoolCreate] {
            assert_eq!(profile.as_str().parse::<WatchProfile>(), Ok(profile));
        }
        assert!("downloads".parse::<WatchProfile>().is_err());
    }

    #[test]
    fn settings_tolerate_missing_fields() {
        let settings: Settings = serde_json::from_str("{}").expect("parse empty object");
        assert_eq!(settings, Settings::default());
    }
}
