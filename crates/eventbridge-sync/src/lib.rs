//! Synchronization engine: reconciler, store, hooks, scheduler.
//!
//! This crate ties provider adapters to the local event store:
//! - Bulk pull and push cycles per calendar ([`SyncService`])
//! - Single-record sync after local writes ([`HookDispatcher`])
//! - Periodic background sync ([`Scheduler`])
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use eventbridge_core::{CalendarLink, ProviderKind};
//! use eventbridge_sync::{HttpAdapterFactory, MemoryStore, SyncService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let link = CalendarLink::new("crm", ProviderKind::CrmMeetings, "cal", "token");
//!     let service = SyncService::new(
//!         Arc::new(MemoryStore::new()),
//!         vec![link],
//!         Arc::new(HttpAdapterFactory::default()),
//!     );
//!     let report = service.sync("crm").await?;
//!     println!("{}", report.message);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod hooks;
pub mod reconciler;
pub mod scheduler;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{ServiceResult, StoreError, StoreResult, SyncError};
pub use hooks::{HookDispatcher, HookNotice, HookOutcome, LifecycleEvent};
pub use reconciler::{Reconciler, RecordOutcome, UNKNOWN_FIRST_NAME};
pub use scheduler::{
    Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle, SchedulerState,
    SharedSchedulerState,
};
pub use service::{AdapterFactory, HttpAdapterFactory, SyncService};
pub use store::{EventStore, MemoryStore, StoreSnapshot};
