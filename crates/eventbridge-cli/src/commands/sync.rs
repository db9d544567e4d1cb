//! Sync commands: `sync`, `pull`, `push`, `sync-all` and `watch`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use eventbridge_core::{SyncReport, SyncResult};
use eventbridge_sync::{Scheduler, SchedulerConfig, SyncService};

use crate::error::{CliError, CliResult};

pub async fn sync(service: &SyncService, calendar: &str) -> CliResult<bool> {
    let report = service.sync(calendar).await?;
    print_report(calendar, &report);
    Ok(report.success)
}

pub async fn pull(service: &SyncService, calendar: &str) -> CliResult<bool> {
    let result = service.pull(calendar).await?;
    print_result(calendar, &result);
    Ok(result.success)
}

pub async fn push(service: &SyncService, calendar: &str) -> CliResult<bool> {
    let result = service.push(calendar).await?;
    print_result(calendar, &result);
    Ok(result.success)
}

/// Syncs every calendar; succeeds when every report does.
pub async fn sync_all(service: &SyncService) -> CliResult<bool> {
    let reports = service.sync_all().await;
    for (calendar, report) in &reports {
        print_report(calendar, report);
    }
    Ok(reports.iter().all(|(_, r)| r.success))
}

/// Runs `sync_all` on a schedule until Ctrl-C.
pub async fn watch(service: Arc<SyncService>, config: SchedulerConfig) -> CliResult<bool> {
    if service.links().is_empty() {
        return Err(CliError::config("no calendars configured"));
    }

    let scheduler = Scheduler::new(config);
    let handle = scheduler.handle();
    let task = tokio::spawn(scheduler.run(move || {
        let service = service.clone();
        async move { tick(&service).await }
    }));

    tokio::signal::ctrl_c().await?;
    info!("interrupted, stopping");
    if let Err(e) = handle.stop().await {
        warn!(error = %e, "failed to stop scheduler");
    }
    if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
        warn!("scheduler did not stop in time");
    }

    let state = handle.state().await;
    Ok(state.last_error.is_none())
}

/// One scheduled run. Fails only when no calendar synced successfully.
async fn tick(service: &SyncService) -> Result<(), String> {
    let reports = service.sync_all().await;
    for (calendar, report) in &reports {
        info!(calendar = %calendar, success = report.success, "{}", report.message);
    }
    if reports.iter().any(|(_, r)| r.success) {
        Ok(())
    } else {
        Err(format!("all {} calendars failed to sync", reports.len()))
    }
}

fn print_report(calendar: &str, report: &SyncReport) {
    println!("[{}]", calendar);
    println!("{}", report.message);
}

fn print_result(calendar: &str, result: &SyncResult) {
    println!("[{}] {}", calendar, result.message);
}
