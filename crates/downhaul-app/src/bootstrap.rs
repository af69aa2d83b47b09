//! Service wiring, folder discovery, and shutdown for the agent binary.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use downhaul_config::{ConfigService, WatchProfile};
use downhaul_events::EventBus;
use downhaul_relocate::{RelocateService, SystemLauncher};
use downhaul_telemetry::LoggingConfig;
use downhaul_watch::{Candidate, DirectoryObserver, WatchPolicy};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// Environment variable overriding the settings file location.
const CONFIG_ENV: &str = "DOWNHAUL_CONFIG";
/// Environment variable overriding the watched directory.
const WATCH_DIR_ENV: &str = "DOWNHAUL_WATCH_DIR";

/// Dependencies required to bootstrap the agent.
pub(crate) struct BootstrapDependencies {
    logging: LoggingConfig<'static>,
    config: ConfigService,
    events: EventBus,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the
    /// binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let logging = LoggingConfig::default();
        let config = ConfigService::load(settings_path_from_env()?)
            .map_err(|err| AppError::config("config_service.load", err))?;
        let events = EventBus::new();

        Ok(Self {
            logging,
            config,
            events,
        })
    }
}

/// Entry point for the agent boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or startup fails; startup
/// failures abort the process since the agent cannot run without its watch
/// target.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify
/// testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    downhaul_telemetry::init_logging(&dependencies.logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    info!("Downhaul agent starting");

    let BootstrapDependencies {
        logging: _,
        config,
        events,
    } = dependencies;

    let settings = config.snapshot();
    let watch_dir = resolve_watch_dir(settings.profile)?;
    let policy = observer_policy(settings.profile);
    info!(
        directory = %watch_dir.display(),
        profile = settings.profile.as_str(),
        settings = %config.settings_path().display(),
        "watch target resolved"
    );

    let (candidate_tx, candidate_rx) = mpsc::unbounded_channel();
    let observer = DirectoryObserver::spawn(&watch_dir, policy, candidate_tx)
        .map_err(|err| AppError::watch("observer.spawn", err))?;

    let relocate = RelocateService::new(
        Arc::new(config.clone()),
        events.clone(),
        Arc::new(SystemLauncher),
    );
    let pump = spawn_candidate_pump(candidate_rx, relocate);
    let journal = spawn_event_journal(events.clone());

    tokio::signal::ctrl_c()
        .await
        .map_err(|source| AppError::Io {
            operation: "signal.ctrl_c",
            path: None,
            source,
        })?;
    info!("shutdown requested; abandoning in-flight candidates");

    // Teardown is abrupt: a candidate mid-settle is dropped with no side
    // effects beyond what already committed to disk.
    pump.abort();
    journal.abort();
    drop(observer);
    Ok(())
}

/// Map a watch profile onto the observer policy preset it pairs with.
#[must_use]
pub const fn observer_policy(profile: WatchProfile) -> WatchPolicy {
    match profile {
        WatchProfile::TempRename => WatchPolicy::TempRename,
        WatchProfile::SpoolCreate => WatchPolicy::AnyCreate,
    }
}

/// Resolve the directory to watch for the given profile.
///
/// `DOWNHAUL_WATCH_DIR` overrides both presets. The temp-rename preset uses
/// the platform downloads folder; the spool preset uses a fixed directory
/// under the OS temp root, created on demand.
///
/// # Errors
///
/// Returns an error when no directory can be resolved; callers treat this as
/// fatal at startup.
pub fn resolve_watch_dir(profile: WatchProfile) -> AppResult<PathBuf> {
    if let Ok(dir) = env::var(WATCH_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    match profile {
        WatchProfile::TempRename => {
            dirs::download_dir().ok_or(AppError::MissingDirectory { name: "downloads" })
        }
        WatchProfile::SpoolCreate => {
            let spool = env::temp_dir().join("downhaul").join("incoming");
            fs::create_dir_all(&spool).map_err(|source| AppError::Io {
                operation: "spool.create_dir",
                path: Some(spool.clone()),
                source,
            })?;
            Ok(spool)
        }
    }
}

fn settings_path_from_env() -> AppResult<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|base| base.join("downhaul").join("settings.json"))
        .ok_or(AppError::MissingDirectory { name: "config" })
}

/// Forward observer candidates into the pipeline, one detached task each.
fn spawn_candidate_pump(
    mut candidates: UnboundedReceiver<Candidate>,
    relocate: RelocateService,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(candidate) = candidates.recv().await {
            // The pump never waits on a candidate; settling happens on the
            // candidate's own task.
            let _settle_task = relocate.spawn(candidate);
        }
    })
}

/// Log every bus event at debug level for operational visibility.
fn spawn_event_journal(events: EventBus) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = events.subscribe(None);
        while let Some(envelope) = stream.next().await {
            debug!(event_id = envelope.id, kind = envelope.event.kind(), "event");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_map_to_their_policy_presets() {
        assert_eq!(
            observer_policy(WatchProfile::TempRename),
            WatchPolicy::TempRename
        );
        assert_eq!(
            observer_policy(WatchProfile::SpoolCreate),
            WatchPolicy::AnyCreate
        );
    }

    #[test]
    fn spool_profile_resolves_under_the_temp_root() {
        if env::var(WATCH_DIR_ENV).is_ok() {
            // An operator override wins; nothing to assert here.
            return;
        }
        let spool = resolve_watch_dir(WatchProfile::SpoolCreate).expect("spool dir resolves");
        assert!(spool.starts_with(env::temp_dir()));
        assert!(spool.is_dir());
    }
}
