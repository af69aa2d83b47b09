//! Match policies deciding which filesystem transitions yield a candidate.
//!
//! The two policies are alternate configurations of the same observer
//! contract: one keyed to the rename-into-place step of a producing
//! application that downloads through temp-named files, the other to plain
//! file creation.

use std::path::{Path, PathBuf};

use notify::Event;
use notify::event::{CreateKind, EventKind, ModifyKind, RenameMode};
use once_cell::sync::Lazy;
use regex::Regex;

/// Temp-download name shape: 8-4-4-4-12 hex groups plus a `.tmp` suffix.
static TEMP_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\.tmp$",
    )
    .expect("temp name pattern is valid")
});

/// Returns `true` when `name` matches the temp-download naming pattern.
#[must_use]
pub fn is_temp_download_name(name: &str) -> bool {
    TEMP_NAME.is_match(name)
}

/// Selectable observer match policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPolicy {
    /// Fire when a file is renamed and its resulting name matches the
    /// temp-download pattern.
    TempRename,
    /// Fire whenever a file is created, regardless of name.
    AnyCreate,
}

impl WatchPolicy {
    /// Extract the candidate paths a raw notification event yields under
    /// this policy. Most events yield zero or one path.
    #[must_use]
    pub fn candidate_paths(self, event: &Event) -> Vec<PathBuf> {
        match self {
            Self::TempRename => Self::rename_targets(event),
            Self::AnyCreate => Self::created_files(event),
        }
    }

    fn rename_targets(event: &Event) -> Vec<PathBuf> {
        let resulting_path = match event.kind {
            // A plain `To` carries the new path; `Both` carries old then new.
            EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => {
                event.paths.last()
            }
            // Some backends only report an unqualified rename; the name
            // pattern below filters out the old-name half.
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event.paths.last(),
            _ => None,
        };

        resulting_path
            .filter(|path| !path.is_dir())
            .filter(|path| file_name_matches(path))
            .cloned()
            .map_or_else(Vec::new, |path| vec![path])
    }

    fn created_files(event: &Event) -> Vec<PathBuf> {
        match event.kind {
            EventKind::Create(CreateKind::File) => event.paths.clone(),
            EventKind::Create(CreateKind::Any | CreateKind::Other) => event
                .paths
                .iter()
                .filter(|path| path.is_file())
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn file_name_matches(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(is_temp_download_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rename_to(path: &str) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
            .add_path(PathBuf::from(path))
    }

    #[test]
    fn temp_name_pattern_accepts_hex_groups() {
        assert!(is_temp_download_name(
            "a1b2c3d4-e5f6-7a8b-9c0d-e1f2a3b4c5d6.tmp"
        ));
        assert!(is_temp_download_name(
            "A1B2C3D4-E5F6-7A8B-9C0D-E1F2A3B4C5D6.tmp"
        ));
    }

    #[test]
    fn temp_name_pattern_rejects_near_misses() {
        // Wrong group width.
        assert!(!is_temp_download_name("a1b2c3d4-e5f6-7a8b-9c0d-e1f2.tmp"));
        // Non-hex characters.
        assert!(!is_temp_download_name(
            "g1b2c3d4-e5f6-7a8b-9c0d-e1f2a3b4c5d6.tmp"
        ));
        // Wrong extension.
        assert!(!is_temp_download_name(
            "a1b2c3d4-e5f6-7a8b-9c0d-e1f2a3b4c5d6.part"
        ));
        // Trailing garbage.
        assert!(!is_temp_download_name(
            "a1b2c3d4-e5f6-7a8b-9c0d-e1f2a3b4c5d6.tmp.bak"
        ));
    }

    #[test]
    fn temp_rename_policy_matches_renames_into_pattern() {
        let event = rename_to("/downloads/a1b2c3d4-e5f6-7a8b-9c0d-e1f2a3b4c5d6.tmp");
        let paths = WatchPolicy::TempRename.candidate_paths(&event);
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn temp_rename_policy_ignores_non_matching_names() {
        let event = rename_to("/downloads/report.pdf");
        assert!(WatchPolicy::TempRename.candidate_paths(&event).is_empty());
    }

    #[test]
    fn temp_rename_policy_ignores_create_events() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/downloads/a1b2c3d4-e5f6-7a8b-9c0d-e1f2a3b4c5d6.tmp"));
        assert!(WatchPolicy::TempRename.candidate_paths(&event).is_empty());
    }

    #[test]
    fn temp_rename_policy_uses_new_name_from_both() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/downloads/report.pdf.partial"))
            .add_path(PathBuf::from(
                "/downloads/a1b2c3d4-e5f6-7a8b-9c0d-e1f2a3b4c5d6.tmp",
            ));
        let paths = WatchPolicy::TempRename.candidate_paths(&event);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("a1b2c3d4-e5f6-7a8b-9c0d-e1f2a3b4c5d6.tmp"));
    }

    #[test]
    fn any_create_policy_matches_file_creation() {
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/spool/report.pdf"));
        assert_eq!(WatchPolicy::AnyCreate.candidate_paths(&event).len(), 1);
    }

    #[test]
    fn any_create_policy_ignores_renames() {
        let event = rename_to("/spool/report.pdf");
        assert!(WatchPolicy::AnyCreate.candidate_paths(&event).is_empty());
    }
}
