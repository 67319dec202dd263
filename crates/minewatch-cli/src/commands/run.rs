use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info};

use minewatch_core::MonitorConfig;
use minewatch_health::sensor_from_config;
use minewatch_monitor::{notify_fatal, Coordinator, NotificationKind};
use minewatch_notify::{notifier_from_config, LogNotifier, Notifier};
use minewatch_state::{RunLock, StateStore};

use super::{load_config, EXIT_CONFIG};

pub async fn run(config_path: &Path, dry_run: bool) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };

    let notifier: Arc<dyn Notifier> = if dry_run {
        Arc::new(LogNotifier)
    } else {
        match notifier_from_config(&config.notifier) {
            Ok(notifier) => notifier,
            Err(e) => {
                error!(error = %e, "could not set up notifier");
                return ExitCode::from(EXIT_CONFIG);
            }
        }
    };

    match execute(&config, Arc::clone(&notifier), dry_run).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = format!("{e:#}"), "run failed");
            notify_fatal(notifier.as_ref(), &e, Utc::now()).await;
            ExitCode::FAILURE
        }
    }
}

async fn execute(
    config: &MonitorConfig,
    notifier: Arc<dyn Notifier>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let Some(_lock) = RunLock::try_acquire(&config.lock_file).context("acquiring run lock")?
    else {
        info!(lock = %config.lock_file.display(), "another run is in progress, exiting");
        return Ok(());
    };

    let store = StateStore::new(&config.state_file);
    let legacy_site = config.registry.single().map(|s| s.name.as_str());
    let state = store
        .load(legacy_site)
        .with_context(|| format!("loading state from {}", store.path().display()))?;

    let sensor = sensor_from_config(&config.sensor).context("building sensor")?;
    let coordinator = Coordinator::new(config.registry.clone(), config.alerting, sensor, notifier);
    let (state, report) = coordinator.run_cycle(state, Utc::now()).await;

    let (alerts_tried, alerts_sent) = report.notifications(NotificationKind::Alert);
    let (recoveries_tried, recoveries_sent) = report.notifications(NotificationKind::Recovery);
    info!(
        sites = report.outcomes.len(),
        sensor_failures = report.sensor_failures(),
        alerts_tried,
        alerts_sent,
        recoveries_tried,
        recoveries_sent,
        "run summary"
    );

    if dry_run {
        info!("dry run, state not saved");
        return Ok(());
    }
    store
        .save(&state)
        .with_context(|| format!("saving state to {}", store.path().display()))?;
    Ok(())
}
