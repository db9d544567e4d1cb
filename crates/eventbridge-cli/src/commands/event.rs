//! Single-event commands.
//!
//! These stand in for the host application's write path: the local change is
//! committed first, then the matching lifecycle event is dispatched.

use tracing::debug;

use eventbridge_sync::{HookOutcome, LifecycleEvent, SyncService};

use crate::error::{CliError, CliResult};

/// Pushes a stored event again: update when it has a remote id, create otherwise.
pub async fn resync(service: &SyncService, id: &str) -> CliResult<bool> {
    let event = service
        .store()
        .get_event(id)?
        .ok_or_else(|| CliError::EventNotFound(id.to_string()))?;

    let lifecycle = if event.remote_id().is_some() {
        LifecycleEvent::Updated(event)
    } else {
        LifecycleEvent::Created(event)
    };
    debug!(event = %id, lifecycle = lifecycle.name(), "resyncing event");
    let outcome = service.hooks().dispatch(&lifecycle).await;
    print_outcome(id, lifecycle.name(), &outcome);
    Ok(!outcome.is_failure())
}

/// Deletes a stored event, then its remote counterpart.
pub async fn delete(service: &SyncService, id: &str) -> CliResult<bool> {
    let event = service
        .store()
        .delete_event(id)?
        .ok_or_else(|| CliError::EventNotFound(id.to_string()))?;
    let outcome = service.hooks().on_delete(&event).await;
    print_outcome(id, "deleted", &outcome);
    Ok(!outcome.is_failure())
}

fn print_outcome(id: &str, lifecycle: &str, outcome: &HookOutcome) {
    match outcome {
        HookOutcome::Applied => println!("{} {}: synced", lifecycle, id),
        HookOutcome::Skipped(reason) => println!("{} {}: not synced ({})", lifecycle, id, reason),
        HookOutcome::Failed(error) => println!("{} {}: sync failed: {}", lifecycle, id, error),
    }
}
