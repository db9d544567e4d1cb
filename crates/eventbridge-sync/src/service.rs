//! Entry points for synchronizing configured calendars.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use eventbridge_core::{CalendarLink, Direction, SyncReport, SyncResult, TimeRange};
use eventbridge_providers::{HttpSettings, ProviderAdapter, ProviderResult, build_adapter};

use crate::error::{ServiceResult, SyncError};
use crate::hooks::HookDispatcher;
use crate::reconciler::Reconciler;
use crate::store::EventStore;

/// Builds provider adapters for calendar links.
pub trait AdapterFactory: Send + Sync {
    fn build(&self, link: &CalendarLink) -> ProviderResult<Box<dyn ProviderAdapter>>;
}

/// Factory for the real HTTP adapters.
#[derive(Debug, Clone, Default)]
pub struct HttpAdapterFactory {
    settings: HttpSettings,
}

impl HttpAdapterFactory {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn build(&self, link: &CalendarLink) -> ProviderResult<Box<dyn ProviderAdapter>> {
        build_adapter(link, &self.settings)
    }
}

/// Runs pull, push and combined cycles for configured links.
pub struct SyncService {
    store: Arc<dyn EventStore>,
    links: Vec<CalendarLink>,
    factory: Arc<dyn AdapterFactory>,
    range: Option<TimeRange>,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn EventStore>,
        links: Vec<CalendarLink>,
        factory: Arc<dyn AdapterFactory>,
    ) -> Self {
        Self {
            store,
            links,
            factory,
            range: None,
        }
    }

    /// Uses a fixed listing window instead of one around the current time.
    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn links(&self) -> &[CalendarLink] {
        &self.links
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Looks up a configured link.
    pub fn link(&self, calendar_id: &str) -> ServiceResult<&CalendarLink> {
        self.links
            .iter()
            .find(|l| l.id == calendar_id)
            .ok_or_else(|| SyncError::UnknownCalendar(calendar_id.to_string()))
    }

    /// A dispatcher for lifecycle hooks sharing this service's store and links.
    pub fn hooks(&self) -> HookDispatcher {
        HookDispatcher::new(
            self.store.clone(),
            self.links.iter().cloned(),
            self.factory.clone(),
        )
    }

    /// Imports remote records of one calendar.
    pub async fn pull(&self, calendar_id: &str) -> ServiceResult<SyncResult> {
        let link = self.link(calendar_id)?;
        if !link.pull_enabled {
            return Ok(SyncResult::failed("Pull is disabled for this calendar"));
        }
        Ok(self.run(link, Direction::Pull).await)
    }

    /// Exports local events of one calendar.
    pub async fn push(&self, calendar_id: &str) -> ServiceResult<SyncResult> {
        let link = self.link(calendar_id)?;
        if !link.push_enabled {
            return Ok(SyncResult::failed("Push is disabled for this calendar"));
        }
        Ok(self.run(link, Direction::Push).await)
    }

    /// Imports the remote contacts of one calendar into the local store.
    pub async fn pull_contacts(&self, calendar_id: &str) -> ServiceResult<SyncResult> {
        let link = self.link(calendar_id)?;
        if !link.pull_enabled {
            return Ok(SyncResult::failed("Pull is disabled for this calendar"));
        }
        let adapter = match self.build(link, "contacts") {
            Ok(adapter) => adapter,
            Err(failed) => return Ok(failed),
        };
        Ok(Reconciler::new(adapter.as_ref(), self.store.as_ref(), link)
            .pull_contacts()
            .await)
    }

    /// Pull then push for one calendar.
    pub async fn sync(&self, calendar_id: &str) -> ServiceResult<SyncReport> {
        let link = self.link(calendar_id)?;
        Ok(self.sync_link(link).await)
    }

    /// Syncs every configured calendar in order.
    pub async fn sync_all(&self) -> Vec<(String, SyncReport)> {
        let mut reports = Vec::with_capacity(self.links.len());
        for link in &self.links {
            let report = self.sync_link(link).await;
            reports.push((link.id.clone(), report));
        }
        reports
    }

    #[instrument(skip(self, link), fields(calendar = %link.id))]
    async fn sync_link(&self, link: &CalendarLink) -> SyncReport {
        let pull = if link.pull_enabled {
            self.run(link, Direction::Pull).await
        } else {
            SyncResult::skipped_disabled(Direction::Pull)
        };
        let push = if link.push_enabled {
            self.run(link, Direction::Push).await
        } else {
            SyncResult::skipped_disabled(Direction::Push)
        };
        let report = SyncReport::combine(pull, push);
        info!(success = report.success, "sync finished");
        report
    }

    /// The adapter for `link`, or the failed result to report instead.
    fn build(
        &self,
        link: &CalendarLink,
        op: &str,
    ) -> Result<Box<dyn ProviderAdapter>, SyncResult> {
        self.factory.build(link).map_err(|e| {
            let err = SyncError::from_provider(&link.id, e);
            warn!(calendar = %link.id, %op, error = %err, "calendar is not usable");
            SyncResult::failed(err.to_string())
        })
    }

    async fn run(&self, link: &CalendarLink, direction: Direction) -> SyncResult {
        let adapter = match self.build(link, &direction.to_string()) {
            Ok(adapter) => adapter,
            Err(failed) => return failed,
        };

        let mut reconciler = Reconciler::new(adapter.as_ref(), self.store.as_ref(), link);
        if let Some(range) = self.range {
            reconciler = reconciler.with_range(range);
        }
        match direction {
            Direction::Pull => reconciler.pull().await,
            Direction::Push => reconciler.push().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use eventbridge_core::{Event, ProviderKind};
    use eventbridge_providers::ProviderError;

    use crate::store::MemoryStore;
    use crate::testing::{FakeAdapter, at, link, remote_meeting};

    /// Serves a prepared adapter per build, or a credential error.
    #[derive(Default)]
    struct ScriptedFactory {
        adapters: Mutex<Vec<FakeAdapter>>,
    }

    impl ScriptedFactory {
        fn with(adapters: Vec<FakeAdapter>) -> Arc<Self> {
            Arc::new(Self {
                adapters: Mutex::new(adapters),
            })
        }
    }

    impl AdapterFactory for ScriptedFactory {
        fn build(&self, _link: &CalendarLink) -> ProviderResult<Box<dyn ProviderAdapter>> {
            let mut adapters = self.adapters.lock().unwrap();
            if adapters.is_empty() {
                return Err(ProviderError::authentication("missing access token"));
            }
            Ok(Box::new(adapters.remove(0)))
        }
    }

    fn service(links: Vec<CalendarLink>, factory: Arc<ScriptedFactory>) -> SyncService {
        SyncService::new(Arc::new(MemoryStore::new()), links, factory)
    }

    #[tokio::test]
    async fn unknown_calendar_is_an_error() {
        let svc = service(vec![link()], ScriptedFactory::with(vec![]));
        assert!(matches!(
            svc.sync("missing").await,
            Err(SyncError::UnknownCalendar(_))
        ));
    }

    #[tokio::test]
    async fn disabled_directions() {
        let pull_only = link().with_directions(true, false);
        let svc = service(
            vec![pull_only],
            ScriptedFactory::with(vec![
                FakeAdapter::new().with_pages(vec![vec![remote_meeting(1)]]),
            ]),
        );

        let push = svc.push("crm").await.unwrap();
        assert!(!push.success);
        assert_eq!(push.message, "Push is disabled for this calendar");

        let report = svc.sync("crm").await.unwrap();
        assert!(report.success);
        assert!(!report.push.success);
        assert_eq!(
            report.message,
            "Pull completed: 1 created, 0 updated, 0 skipped (of 1).\nPush skipped (disabled)"
        );
    }

    #[tokio::test]
    async fn pull_disabled_entry_point() {
        let svc = service(
            vec![link().with_directions(false, true)],
            ScriptedFactory::with(vec![]),
        );
        let pull = svc.pull("crm").await.unwrap();
        assert!(!pull.success);
        assert_eq!(pull.message, "Pull is disabled for this calendar");
    }

    #[tokio::test]
    async fn credential_failures_surface_in_result() {
        let svc = service(vec![link()], ScriptedFactory::with(vec![]));
        let report = svc.sync("crm").await.unwrap();
        assert!(!report.success);
        assert!(
            report
                .pull
                .message
                .starts_with("authentication failed for calendar crm")
        );
    }

    #[tokio::test]
    async fn pull_contacts_entry_point() {
        let contacts = vec![eventbridge_providers::RemoteContact {
            first_name: Some("Luz".into()),
            phone: Some("+57 300 123 4567".into()),
            ..eventbridge_providers::RemoteContact::new("c-1")
        }];
        let svc = service(
            vec![link()],
            ScriptedFactory::with(vec![FakeAdapter::new().with_listed_contacts(contacts)]),
        );

        let result = svc.pull_contacts("crm").await.unwrap();
        assert!(result.success);
        assert_eq!(result.stats.created, 1);
        assert_eq!(svc.store().list_events().unwrap().len(), 0);

        // The factory is exhausted, so the second run fails like a bad token.
        let failed = svc.pull_contacts("crm").await.unwrap();
        assert!(!failed.success);
        assert!(matches!(
            svc.pull_contacts("missing").await,
            Err(SyncError::UnknownCalendar(_))
        ));
    }

    #[tokio::test]
    async fn sync_all_runs_every_link() {
        let second = CalendarLink::new("gj", ProviderKind::AppointmentApi, "cal", "t");
        let svc = service(
            vec![link(), second],
            ScriptedFactory::with(vec![
                FakeAdapter::new(),
                FakeAdapter::new(),
                FakeAdapter::new().with_kind(ProviderKind::AppointmentApi),
            ]),
        );
        svc.store()
            .insert_event(Event::new("e1", "Demo", at(9)).linked_to(&link()))
            .unwrap();

        let reports = svc.sync_all().await;
        let ids: Vec<&str> = reports.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["crm", "gj"]);
        assert!(reports[0].1.success);
        // The fourth build finds no adapter left and fails like a missing token.
        assert!(reports[1].1.success);
        assert!(!reports[1].1.push.success);
    }
}
