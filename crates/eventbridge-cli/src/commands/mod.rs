//! Command handlers.
//!
//! Handlers print to stdout and return whether the operation succeeded; the
//! binary maps that to the exit code.

pub mod config;
pub mod contact;
pub mod event;
pub mod sync;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use eventbridge_sync::{HttpAdapterFactory, SyncService};

use crate::config::AppConfig;
use crate::error::CliResult;
use crate::store::JsonFileStore;

/// Builds the sync service: resolved links, the JSON store and HTTP adapters.
pub fn build_service(config: &AppConfig, store_path: Option<&Path>) -> CliResult<SyncService> {
    let links = config.resolved_links()?;
    let store = JsonFileStore::open(config.store_path(store_path))?;
    debug!(
        calendars = links.len(),
        store = %store.path().display(),
        "sync service ready"
    );
    let factory = HttpAdapterFactory::new(config.http.to_settings());
    Ok(SyncService::new(Arc::new(store), links, Arc::new(factory)))
}
