//! Reactive single-record sync after local writes.
//!
//! The host sends a [`LifecycleEvent`] once a local write has committed.
//! [`HookDispatcher`] routes it to the reconciler of the event's calendar.
//! Outcomes never roll back the local write; failures are logged and
//! forwarded as [`HookNotice`]s for the user.
//!
//! New local contacts tagged with a CRM calendar are pushed through
//! [`HookDispatcher::on_contact_created`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use eventbridge_core::{CalendarLink, Contact, Event, ProviderKind};

use crate::reconciler::{Reconciler, RecordOutcome};
use crate::service::AdapterFactory;
use crate::store::EventStore;

/// A committed local change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created(Event),
    Updated(Event),
    Deleted(Event),
}

impl LifecycleEvent {
    pub fn event(&self) -> &Event {
        match self {
            Self::Created(e) | Self::Updated(e) | Self::Deleted(e) => e,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Deleted(_) => "deleted",
        }
    }
}

/// Result of handling one lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Applied,
    Skipped(String),
    Failed(String),
}

impl HookOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Notification sent for each handled lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookNotice {
    pub event_id: String,
    pub lifecycle: &'static str,
    pub outcome: HookOutcome,
}

/// Routes lifecycle events to the matching provider.
#[derive(Clone)]
pub struct HookDispatcher {
    store: Arc<dyn EventStore>,
    links: HashMap<String, CalendarLink>,
    factory: Arc<dyn AdapterFactory>,
}

impl HookDispatcher {
    pub fn new(
        store: Arc<dyn EventStore>,
        links: impl IntoIterator<Item = CalendarLink>,
        factory: Arc<dyn AdapterFactory>,
    ) -> Self {
        Self {
            store,
            links: links.into_iter().map(|l| (l.id.clone(), l)).collect(),
            factory,
        }
    }

    pub async fn on_create(&self, event: &Event) -> HookOutcome {
        self.dispatch(&LifecycleEvent::Created(event.clone())).await
    }

    pub async fn on_update(&self, event: &Event) -> HookOutcome {
        self.dispatch(&LifecycleEvent::Updated(event.clone())).await
    }

    pub async fn on_delete(&self, event: &Event) -> HookOutcome {
        self.dispatch(&LifecycleEvent::Deleted(event.clone())).await
    }

    /// Handles one lifecycle event.
    pub async fn dispatch(&self, lifecycle: &LifecycleEvent) -> HookOutcome {
        let event = lifecycle.event();
        let link = match self.route(event) {
            Ok(link) => link,
            Err(reason) => {
                debug!(event = %event.id, lifecycle = lifecycle.name(), %reason, "hook skipped");
                return HookOutcome::Skipped(reason);
            }
        };

        let adapter = match self.factory.build(link) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(event = %event.id, calendar = %link.id, error = %e, "hook could not build adapter");
                return HookOutcome::Failed(e.to_string());
            }
        };
        let reconciler = Reconciler::new(adapter.as_ref(), self.store.as_ref(), link);
        let result = match lifecycle {
            LifecycleEvent::Created(e) => reconciler.push_created(e).await,
            LifecycleEvent::Updated(e) => reconciler.push_updated(e).await,
            LifecycleEvent::Deleted(e) => reconciler.push_deleted(e).await,
        };

        match result {
            Ok(RecordOutcome::Skipped(reason)) => {
                debug!(event = %event.id, lifecycle = lifecycle.name(), %reason, "hook skipped");
                HookOutcome::Skipped(reason)
            }
            Ok(_) => {
                info!(event = %event.id, calendar = %link.id, lifecycle = lifecycle.name(), "hook applied");
                HookOutcome::Applied
            }
            Err(e) => {
                warn!(record = %event.id, op = lifecycle.name(), error = %e, "hook failed");
                HookOutcome::Failed(e.to_string())
            }
        }
    }

    /// Creates a new local contact in the CRM behind `calendar`, unless a
    /// remote contact with the same key already exists.
    pub async fn on_contact_created(&self, contact: &Contact, calendar: &str) -> HookOutcome {
        let link = match self.links.get(calendar) {
            Some(link) if link.provider != ProviderKind::CrmMeetings => {
                let reason = format!("calendar {} does not take contacts", calendar);
                debug!(contact = %contact.id, %reason, "contact hook skipped");
                return HookOutcome::Skipped(reason);
            }
            Some(link) if !link.push_enabled => {
                return HookOutcome::Skipped(format!("push is disabled for calendar {}", calendar));
            }
            Some(link) => link,
            None => return HookOutcome::Skipped(format!("unknown calendar {}", calendar)),
        };

        let adapter = match self.factory.build(link) {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(contact = %contact.id, calendar = %link.id, error = %e, "hook could not build adapter");
                return HookOutcome::Failed(e.to_string());
            }
        };
        let reconciler = Reconciler::new(adapter.as_ref(), self.store.as_ref(), link);
        match reconciler.push_contact(contact).await {
            Ok(RecordOutcome::Skipped(reason)) => {
                info!(contact = %contact.id, calendar = %link.id, %reason, "contact not pushed");
                HookOutcome::Skipped(reason)
            }
            Ok(_) => {
                info!(contact = %contact.id, calendar = %link.id, "contact pushed");
                HookOutcome::Applied
            }
            Err(e) => {
                warn!(record = %contact.id, op = "contact_created", error = %e, "hook failed");
                HookOutcome::Failed(e.to_string())
            }
        }
    }

    /// The link an event syncs with, or why it has none.
    fn route(&self, event: &Event) -> Result<&CalendarLink, String> {
        let Some(provider) = event.sync_provider else {
            return Err("event has no sync provider".into());
        };
        if !event.sync_enabled {
            return Err("sync is disabled for this event".into());
        }
        let Some(calendar) = event.sync_calendar_ref.as_deref() else {
            return Err("event is not linked to a calendar".into());
        };
        let Some(link) = self.links.get(calendar) else {
            return Err(format!("unknown calendar {}", calendar));
        };
        if link.provider != provider {
            return Err(format!(
                "calendar {} uses {}, event expects {}",
                calendar, link.provider, provider
            ));
        }
        Ok(link)
    }

    /// Consumes lifecycle events in order until the channel closes.
    ///
    /// Each outcome is forwarded to `notices` when given.
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<LifecycleEvent>,
        notices: Option<mpsc::Sender<HookNotice>>,
    ) {
        while let Some(lifecycle) = rx.recv().await {
            let outcome = self.dispatch(&lifecycle).await;
            if let Some(tx) = &notices {
                let notice = HookNotice {
                    event_id: lifecycle.event().id.clone(),
                    lifecycle: lifecycle.name(),
                    outcome,
                };
                if tx.send(notice).await.is_err() {
                    debug!("notice receiver dropped");
                }
            }
        }
        debug!("lifecycle channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use eventbridge_providers::{ProviderAdapter, ProviderResult};

    use crate::store::MemoryStore;
    use crate::testing::{FakeAdapter, at, link};

    struct FakeFactory;

    impl AdapterFactory for FakeFactory {
        fn build(&self, link: &CalendarLink) -> ProviderResult<Box<dyn ProviderAdapter>> {
            Ok(Box::new(
                FakeAdapter::new()
                    .with_kind(link.provider)
                    .without_attendees(),
            ))
        }
    }

    fn dispatcher(store: Arc<MemoryStore>) -> HookDispatcher {
        HookDispatcher::new(store, [link()], Arc::new(FakeFactory))
    }

    #[tokio::test]
    async fn unset_provider_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let hooks = dispatcher(store);
        let outcome = hooks.on_create(&Event::new("e1", "Demo", at(9))).await;
        assert!(matches!(outcome, HookOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn unknown_calendar_and_mismatched_provider_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let hooks = dispatcher(store);

        let elsewhere = CalendarLink::new("nope", ProviderKind::CrmMeetings, "cal", "t");
        let outcome = hooks
            .on_create(&Event::new("e1", "Demo", at(9)).linked_to(&elsewhere))
            .await;
        assert_eq!(outcome, HookOutcome::Skipped("unknown calendar nope".into()));

        let mut mismatched = Event::new("e2", "Demo", at(9)).linked_to(&link());
        mismatched.sync_provider = Some(ProviderKind::AppointmentApi);
        assert!(matches!(
            hooks.on_create(&mismatched).await,
            HookOutcome::Skipped(_)
        ));
    }

    #[tokio::test]
    async fn create_hook_stores_remote_id() {
        let store = Arc::new(MemoryStore::new());
        let event = Event::new("e1", "Demo", at(9)).linked_to(&link());
        store.insert_event(event.clone()).unwrap();
        let hooks = dispatcher(store.clone());

        assert_eq!(hooks.on_create(&event).await, HookOutcome::Applied);
        let stored = store.get_event("e1").unwrap().unwrap();
        assert!(stored.remote_id().is_some());
        assert_eq!(
            Event {
                remote_event_id: None,
                ..stored
            },
            event
        );
    }

    #[tokio::test]
    async fn update_without_remote_id_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let hooks = dispatcher(store);
        let event = Event::new("e1", "Demo", at(9)).linked_to(&link());
        assert!(matches!(
            hooks.on_update(&event).await,
            HookOutcome::Skipped(_)
        ));
    }

    #[tokio::test]
    async fn failures_are_reported_not_raised() {
        let store = Arc::new(MemoryStore::new());
        let hooks = dispatcher(store);
        // An empty subject fails mapping on the remote side.
        let event = Event::new("e1", "", at(9))
            .linked_to(&link())
            .with_remote_event_id("r-1");
        let outcome = hooks.on_update(&event).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn run_forwards_notices_in_order() {
        let store = Arc::new(MemoryStore::new());
        let event = Event::new("e1", "Demo", at(9)).linked_to(&link());
        store.insert_event(event.clone()).unwrap();
        let hooks = dispatcher(store);

        let (tx, rx) = mpsc::channel(8);
        let (notice_tx, mut notice_rx) = mpsc::channel(8);
        let task = tokio::spawn(hooks.run(rx, Some(notice_tx)));

        tx.send(LifecycleEvent::Created(event.clone())).await.unwrap();
        tx.send(LifecycleEvent::Deleted(Event::new("e9", "x", at(9))))
            .await
            .unwrap();
        drop(tx);
        task.await.unwrap();

        let first = notice_rx.recv().await.unwrap();
        assert_eq!(first.event_id, "e1");
        assert_eq!(first.lifecycle, "created");
        assert_eq!(first.outcome, HookOutcome::Applied);
        let second = notice_rx.recv().await.unwrap();
        assert_eq!(second.lifecycle, "deleted");
        assert!(matches!(second.outcome, HookOutcome::Skipped(_)));
    }

    /// Builds adapters whose provider has email-keyed contacts.
    struct ContactFactory;

    impl AdapterFactory for ContactFactory {
        fn build(&self, link: &CalendarLink) -> ProviderResult<Box<dyn ProviderAdapter>> {
            Ok(Box::new(FakeAdapter::new().with_kind(link.provider)))
        }
    }

    #[tokio::test]
    async fn contact_hook_pushes_to_crm_calendars_only() {
        let store = Arc::new(MemoryStore::new());
        let appointments = CalendarLink::new("gj", ProviderKind::AppointmentApi, "12", "t");
        let mut frozen = CalendarLink::new("frozen", ProviderKind::CrmMeetings, "cal", "t");
        frozen.push_enabled = false;
        let hooks = HookDispatcher::new(
            store,
            [link(), appointments, frozen],
            Arc::new(ContactFactory),
        );
        let contact = Contact::new("CT-1")
            .with_first_name("Ana")
            .with_email("ana@example.com");

        assert_eq!(
            hooks.on_contact_created(&contact, "crm").await,
            HookOutcome::Applied
        );
        for calendar in ["gj", "frozen", "missing"] {
            assert!(matches!(
                hooks.on_contact_created(&contact, calendar).await,
                HookOutcome::Skipped(_)
            ));
        }

        let keyless = Contact::new("CT-2").with_first_name("Bo");
        assert!(matches!(
            hooks.on_contact_created(&keyless, "crm").await,
            HookOutcome::Skipped(_)
        ));
    }
}
