//! Integration coverage for the file-backed settings service.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use downhaul_config::{ConfigService, Settings, SettingsSource, WatchProfile};
use tempfile::TempDir;

fn settings_path(dir: &TempDir) -> PathBuf {
    dir.path().join("config").join("settings.json")
}

#[test]
fn missing_file_loads_defaults_without_creating_it() -> Result<()> {
    let dir = TempDir::new()?;
    let path = settings_path(&dir);

    let service = ConfigService::load(&path)?;
    assert_eq!(service.snapshot(), Settings::default());
    assert!(!path.exists(), "load must not create the settings file");
    Ok(())
}

#[test]
fn update_persists_and_survives_reload() -> Result<()> {
    let dir = TempDir::new()?;
    let path = settings_path(&dir);
    let destination = dir.path().join("sorted");

    let service = ConfigService::load(&path)?;
    let updated = service.update(|settings| {
        settings.download_location = Some(destination.clone());
        settings.open_immediately = true;
        settings.profile = WatchProfile::SpoolCreate;
    })?;
    assert_eq!(updated.relocation_target(), Some(destination.as_path()));

    let reloaded = ConfigService::load(&path)?;
    let snapshot = reloaded.snapshot();
    assert_eq!(snapshot, updated);
    assert_eq!(snapshot.profile, WatchProfile::SpoolCreate);
    Ok(())
}

#[tokio::test]
async fn current_sees_external_edits_live() -> Result<()> {
    let dir = TempDir::new()?;
    let path = settings_path(&dir);

    let service = ConfigService::load(&path)?;
    assert!(service.current().await.relocation_target().is_none());

    fs::create_dir_all(path.parent().expect("settings parent"))?;
    fs::write(
        &path,
        r#"{"download_location":"/srv/inbox","open_immediately":true}"#,
    )?;

    let snapshot = service.current().await;
    assert_eq!(
        snapshot.download_location,
        Some(PathBuf::from("/srv/inbox"))
    );
    assert!(snapshot.open_immediately);
    Ok(())
}

#[tokio::test]
async fn malformed_edit_falls_back_to_last_good_snapshot() -> Result<()> {
    let dir = TempDir::new()?;
    let path = settings_path(&dir);

    let service = ConfigService::load(&path)?;
    service.update(|settings| settings.open_immediately = true)?;

    fs::write(&path, "{ not json")?;
    let snapshot = service.current().await;
    assert!(snapshot.open_immediately, "last good snapshot should win");
    Ok(())
}

#[test]
fn malformed_file_at_startup_is_an_error() -> Result<()> {
    let dir = TempDir::new()?;
    let path = settings_path(&dir);
    fs::create_dir_all(path.parent().expect("settings parent"))?;
    fs::write(&path, "not json at all")?;

    assert!(ConfigService::load(&path).is_err());
    Ok(())
}
