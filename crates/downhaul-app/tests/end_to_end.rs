//! End-to-end wiring of observer and pipeline against real directories.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use downhaul_config::ConfigService;
use downhaul_events::EventBus;
use downhaul_relocate::{RelocateService, SettleOptions};
use downhaul_test_support::fixtures::{temp_dir, wait_for};
use downhaul_test_support::mocks::RecordingLauncher;
use downhaul_watch::{DirectoryObserver, WatchPolicy};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const LAND_WAIT: Duration = Duration::from_secs(5);
const TEMP_NAME: &str = "a1b2c3d4-e5f6-7a8b-9c0d-e1f2a3b4c5d6.tmp";

struct Harness {
    watch_dir: TempDir,
    dest_dir: TempDir,
    _config_dir: TempDir,
    _observer: DirectoryObserver,
    pump: JoinHandle<()>,
}

impl Harness {
    fn start(policy: WatchPolicy) -> Result<Self> {
        let watch_dir = temp_dir()?;
        let dest_dir = temp_dir()?;
        let config_dir = temp_dir()?;

        let config = ConfigService::load(config_dir.path().join("settings.json"))?;
        config.update(|settings| {
            settings.download_location = Some(dest_dir.path().to_path_buf());
        })?;

        let events = EventBus::with_capacity(64);
        let relocate = RelocateService::new(
            Arc::new(config),
            events,
            Arc::new(RecordingLauncher::new()),
        )
        .with_options(SettleOptions {
            poll_interval: Duration::from_millis(30),
        });

        let (candidate_tx, mut candidate_rx) = mpsc::unbounded_channel();
        let observer = DirectoryObserver::spawn(watch_dir.path(), policy, candidate_tx)?;

        let pump = tokio::spawn(async move {
            while let Some(candidate) = candidate_rx.recv().await {
                let _settle_task = relocate.spawn(candidate);
            }
        });

        Ok(Self {
            watch_dir,
            dest_dir,
            _config_dir: config_dir,
            _observer: observer,
            pump,
        })
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Native watch setup is asynchronous on some backends; give it a beat.
async fn settle_watch() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn created_file_settles_and_lands_in_destination() -> Result<()> {
    let harness = Harness::start(WatchPolicy::AnyCreate)?;
    settle_watch().await;

    fs::write(harness.watch_dir.path().join("statement.pdf"), b"ledger")?;

    let landed = harness.dest_dir.path().join("statement.pdf");
    assert!(wait_for(LAND_WAIT, || landed.exists()).await);
    assert!(
        wait_for(Duration::from_secs(1), || {
            !harness.watch_dir.path().join("statement.pdf").exists()
        })
        .await
    );
    assert_eq!(fs::read(&landed)?, b"ledger");
    Ok(())
}

#[tokio::test]
async fn renamed_temp_download_is_relocated_under_its_temp_name() -> Result<()> {
    let harness = Harness::start(WatchPolicy::TempRename)?;
    settle_watch().await;

    let staging = harness.watch_dir.path().join("download.partial");
    fs::write(&staging, b"payload")?;
    fs::rename(&staging, harness.watch_dir.path().join(TEMP_NAME))?;

    let landed = harness.dest_dir.path().join(TEMP_NAME);
    assert!(wait_for(LAND_WAIT, || landed.exists()).await);
    assert_eq!(fs::read(&landed)?, b"payload");
    Ok(())
}
