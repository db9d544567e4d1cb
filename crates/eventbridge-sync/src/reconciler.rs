//! Pull and push cycles for one calendar link.
//!
//! A [`Reconciler`] borrows an adapter, the store and the link for the
//! duration of a cycle. Per-record failures are logged and counted as
//! skipped; only failures to start the cycle or fetch the listing abort it.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use eventbridge_core::{
    CalendarLink, Contact, ContactKeyKind, Direction, Event, Participant, SyncResult, SyncStats,
    TimeRange,
};
use eventbridge_providers::{
    Attendees, ContactResolver, CycleContext, LocalFields, PayloadIntent, ProviderAdapter,
    RemoteContact, RemoteRecord, fetch_all_remote_events,
};

use crate::error::ServiceResult;
use crate::store::EventStore;

/// First name given to local contacts created from nameless attendees.
pub const UNKNOWN_FIRST_NAME: &str = "Unknown";

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Created,
    Updated,
    Deleted,
    Skipped(String),
}

impl RecordOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }
}

/// Runs sync operations for one link.
pub struct Reconciler<'a> {
    adapter: &'a dyn ProviderAdapter,
    store: &'a dyn EventStore,
    link: &'a CalendarLink,
    range: TimeRange,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler using the default window around now.
    pub fn new(
        adapter: &'a dyn ProviderAdapter,
        store: &'a dyn EventStore,
        link: &'a CalendarLink,
    ) -> Self {
        Self {
            adapter,
            store,
            link,
            range: TimeRange::sync_window(Utc::now()),
        }
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    /// Imports every remote record of the link.
    #[instrument(skip(self), fields(calendar = %self.link.id, provider = %self.link.provider))]
    pub async fn pull(&self) -> SyncResult {
        let mut ctx = match self.adapter.begin_cycle(Direction::Pull).await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(error = %e, "pull cycle could not start");
                return SyncResult::failed(format!("Pull failed: {}", e));
            }
        };

        let records = match fetch_all_remote_events(self.adapter, &self.range).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "remote listing failed");
                return SyncResult::failed(format!("Pull failed: {}", e));
            }
        };

        let mut stats = SyncStats {
            total: records.len(),
            ..Default::default()
        };
        for record in &records {
            match self.pull_record(record, &mut ctx).await {
                Ok(RecordOutcome::Created) => stats.created += 1,
                Ok(RecordOutcome::Updated) => stats.updated += 1,
                Ok(RecordOutcome::Skipped(reason)) => {
                    debug!(record = %record_label(record), %reason, "record skipped");
                    stats.skipped += 1;
                }
                Ok(RecordOutcome::Deleted) => {}
                Err(e) => {
                    warn!(record = %record_label(record), op = "pull", error = %e, "record failed");
                    stats.skipped += 1;
                }
            }
        }

        let message = format!(
            "Pull completed: {} created, {} updated, {} skipped (of {}).",
            stats.created, stats.updated, stats.skipped, stats.total
        );
        info!(
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            total = stats.total,
            "pull completed"
        );
        SyncResult::completed(message, stats)
    }

    async fn pull_record(
        &self,
        record: &RemoteRecord,
        ctx: &mut CycleContext,
    ) -> ServiceResult<RecordOutcome> {
        let fields = self.adapter.map_in(record)?;
        let (Some(remote_id), Some(starts_on)) = (fields.remote_id.clone(), fields.starts_on)
        else {
            return Ok(RecordOutcome::skipped("record has no id or start"));
        };

        if let Some(calendar) = fields.calendar_ref.as_deref()
            && calendar != self.link.remote_calendar_id
        {
            return Ok(RecordOutcome::skipped(format!(
                "record belongs to calendar {}",
                calendar
            )));
        }

        let existing = self
            .store
            .find_by_remote_id(self.link.provider, &remote_id)?;
        if existing.as_ref().is_some_and(|e| !e.sync_enabled) {
            return Ok(RecordOutcome::skipped("local event has sync disabled"));
        }

        let participants = match self.adapter.record_attendees(record, ctx).await? {
            Attendees::Known(contacts) => Some(self.local_participants(&contacts)?),
            Attendees::Unknown => None,
        };

        match existing {
            None => {
                let mut event = Event::new("", "", starts_on)
                    .linked_to(self.link)
                    .with_remote_event_id(&remote_id);
                event.customer_ref = fields.customer_ref.clone();
                event.pulled_from_provider = true;
                apply_fields(&mut event, fields, participants);
                let id = self.store.insert_event(event)?;
                debug!(event = %id, remote = %remote_id, "created local event");
                Ok(RecordOutcome::Created)
            }
            Some(mut event) => {
                apply_fields(&mut event, fields, participants);
                self.store.update_event(&event)?;
                debug!(event = %event.id, remote = %remote_id, "updated local event");
                Ok(RecordOutcome::Updated)
            }
        }
    }

    /// Finds or creates a local contact for each remote attendee.
    fn local_participants(&self, contacts: &[RemoteContact]) -> ServiceResult<Vec<Participant>> {
        let Some(kind) = self.adapter.contact_key_kind() else {
            return Ok(Vec::new());
        };

        let mut participants: Vec<Participant> = Vec::with_capacity(contacts.len());
        for remote in contacts {
            let Some(key) = remote.key(kind) else {
                debug!(remote = %remote.id, "attendee has no correlating key");
                continue;
            };
            let id = match self.store.find_contact(&key)? {
                Some(contact) => contact.id,
                None => {
                    let contact = Contact {
                        id: String::new(),
                        first_name: Some(
                            remote
                                .first_name
                                .clone()
                                .filter(|n| !n.trim().is_empty())
                                .unwrap_or_else(|| UNKNOWN_FIRST_NAME.to_string()),
                        ),
                        last_name: remote.last_name.clone(),
                        email: remote.email.clone(),
                        phone: remote.phone.clone(),
                    };
                    self.store.insert_contact(contact)?
                }
            };
            let participant = Participant::new(id);
            if !participants.contains(&participant) {
                participants.push(participant);
            }
        }
        Ok(participants)
    }

    /// Imports the provider's contacts into the local store, keyed by phone.
    ///
    /// Contacts without a phone are skipped. A local contact with the same
    /// phone gets its name refreshed; otherwise a new one is created.
    #[instrument(skip(self), fields(calendar = %self.link.id, provider = %self.link.provider))]
    pub async fn pull_contacts(&self) -> SyncResult {
        let contacts = match self.adapter.list_remote_contacts().await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(error = %e, "contact listing failed");
                return SyncResult::failed(format!("Contact import failed: {}", e));
            }
        };

        let mut stats = SyncStats {
            total: contacts.len(),
            ..Default::default()
        };
        for remote in &contacts {
            match self.import_contact(remote) {
                Ok(RecordOutcome::Created) => stats.created += 1,
                Ok(RecordOutcome::Updated) => stats.updated += 1,
                Ok(RecordOutcome::Skipped(reason)) => {
                    debug!(remote = %remote.id, %reason, "contact skipped");
                    stats.skipped += 1;
                }
                Ok(RecordOutcome::Deleted) => {}
                Err(e) => {
                    warn!(remote = %remote.id, op = "import_contact", error = %e, "contact failed");
                    stats.skipped += 1;
                }
            }
        }

        info!(
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            total = stats.total,
            "contact import completed"
        );
        let message = format!(
            "Contact import completed: {} created, {} updated, {} skipped (of {}).",
            stats.created, stats.updated, stats.skipped, stats.total
        );
        SyncResult::completed(message, stats)
    }

    fn import_contact(&self, remote: &RemoteContact) -> ServiceResult<RecordOutcome> {
        let Some(key) = remote.key(ContactKeyKind::Phone) else {
            return Ok(RecordOutcome::skipped("contact has no phone"));
        };
        let first_name = remote
            .first_name
            .clone()
            .filter(|n| !n.trim().is_empty());

        match self.store.find_contact(&key)? {
            Some(mut contact) => {
                if first_name.is_some() {
                    contact.first_name = first_name;
                }
                if remote.last_name.is_some() {
                    contact.last_name = remote.last_name.clone();
                }
                contact.phone = remote.phone.clone();
                self.store.update_contact(&contact)?;
                debug!(contact = %contact.id, remote = %remote.id, "updated local contact");
                Ok(RecordOutcome::Updated)
            }
            None => {
                let contact = Contact {
                    id: String::new(),
                    first_name: Some(first_name.unwrap_or_else(|| UNKNOWN_FIRST_NAME.to_string())),
                    last_name: remote.last_name.clone(),
                    email: remote.email.clone(),
                    phone: remote.phone.clone(),
                };
                let id = self.store.insert_contact(contact)?;
                debug!(contact = %id, remote = %remote.id, "created local contact");
                Ok(RecordOutcome::Created)
            }
        }
    }

    /// Exports every sync-enabled local event linked to the link.
    #[instrument(skip(self), fields(calendar = %self.link.id, provider = %self.link.provider))]
    pub async fn push(&self) -> SyncResult {
        let ctx = match self.adapter.begin_cycle(Direction::Push).await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!(error = %e, "push cycle could not start");
                return SyncResult::failed(format!("Push failed: {}", e));
            }
        };
        let events = match self.store.events_for_push(self.link) {
            Ok(events) => events,
            Err(e) => return SyncResult::failed(format!("Push failed: {}", e)),
        };

        let mut resolver = ContactResolver::new(self.adapter, &ctx);
        let mut stats = SyncStats {
            total: events.len(),
            ..Default::default()
        };
        for event in &events {
            match self.push_event(event, &ctx, &mut resolver).await {
                Ok(RecordOutcome::Created) => stats.created += 1,
                Ok(RecordOutcome::Updated) => stats.updated += 1,
                Ok(RecordOutcome::Skipped(reason)) => {
                    warn!(record = %event.id, op = "push", %reason, "event skipped");
                    stats.skipped += 1;
                }
                Ok(RecordOutcome::Deleted) => {}
                Err(e) => {
                    warn!(record = %event.id, op = "push", error = %e, "event failed");
                    stats.skipped += 1;
                }
            }
        }

        let message = format!(
            "Push completed: {}/{} events synced, {} skipped.",
            stats.successful(),
            stats.total,
            stats.skipped
        );
        info!(
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            total = stats.total,
            "push completed"
        );
        SyncResult::completed(message, stats)
    }

    async fn push_event(
        &self,
        event: &Event,
        ctx: &CycleContext,
        resolver: &mut ContactResolver<'_>,
    ) -> ServiceResult<RecordOutcome> {
        let Some(attendees) = self.attendee_ids(event, resolver).await? else {
            return Ok(RecordOutcome::skipped("no attendee could be resolved"));
        };

        let Some(remote_id) = event.remote_id() else {
            return self.create_remote(event, &attendees, ctx).await;
        };

        match self.adapter.get_remote_event(remote_id).await? {
            Some(_) => self.update_remote(event, remote_id, &attendees, ctx).await,
            None => {
                debug!(event = %event.id, remote = %remote_id, "remote record missing, recreating");
                self.create_remote(event, &attendees, ctx).await
            }
        }
    }

    /// Remote contact ids for the event's participants, or `None` when the
    /// provider needs attendees and none resolved.
    async fn attendee_ids(
        &self,
        event: &Event,
        resolver: &mut ContactResolver<'_>,
    ) -> ServiceResult<Option<Vec<String>>> {
        let mut contacts = Vec::with_capacity(event.participants.len());
        for contact_id in event.contact_ids() {
            match self.store.get_contact(contact_id)? {
                Some(contact) => contacts.push(contact),
                None => warn!(event = %event.id, contact = %contact_id, "participant contact not found"),
            }
        }

        let ids = resolver.resolve_all(&contacts).await;
        if ids.is_empty() && self.adapter.requires_attendees() {
            return Ok(None);
        }
        Ok(Some(ids))
    }

    async fn create_remote(
        &self,
        event: &Event,
        attendees: &[String],
        ctx: &CycleContext,
    ) -> ServiceResult<RecordOutcome> {
        let payload = self
            .adapter
            .map_out(event, attendees, PayloadIntent::Create, ctx)?;
        let remote_id = self.adapter.create_remote_event(&payload).await?;
        self.store.set_remote_event_id(&event.id, &remote_id)?;
        debug!(event = %event.id, remote = %remote_id, "created remote record");
        Ok(RecordOutcome::Created)
    }

    async fn update_remote(
        &self,
        event: &Event,
        remote_id: &str,
        attendees: &[String],
        ctx: &CycleContext,
    ) -> ServiceResult<RecordOutcome> {
        let payload = self
            .adapter
            .map_out(event, attendees, PayloadIntent::Update, ctx)?;
        self.adapter.update_remote_event(remote_id, &payload).await?;
        debug!(event = %event.id, remote = %remote_id, "updated remote record");
        Ok(RecordOutcome::Updated)
    }

    /// Pushes a newly created local event.
    pub async fn push_created(&self, event: &Event) -> ServiceResult<RecordOutcome> {
        if event.remote_id().is_some() {
            return Ok(RecordOutcome::skipped("event already has a remote id"));
        }
        let ctx = self.adapter.begin_cycle(Direction::Push).await?;
        let mut resolver = ContactResolver::new(self.adapter, &ctx);
        let Some(attendees) = self.attendee_ids(event, &mut resolver).await? else {
            return Ok(RecordOutcome::skipped("no attendee could be resolved"));
        };
        self.create_remote(event, &attendees, &ctx).await
    }

    /// Pushes changes of an already linked local event.
    pub async fn push_updated(&self, event: &Event) -> ServiceResult<RecordOutcome> {
        let Some(remote_id) = event.remote_id() else {
            return Ok(RecordOutcome::skipped("event has no remote id"));
        };
        let ctx = self.adapter.begin_cycle(Direction::Push).await?;
        let mut resolver = ContactResolver::new(self.adapter, &ctx);
        let Some(attendees) = self.attendee_ids(event, &mut resolver).await? else {
            return Ok(RecordOutcome::skipped("no attendee could be resolved"));
        };
        self.update_remote(event, remote_id, &attendees, &ctx).await
    }

    /// Creates the remote counterpart of a new local contact, unless the
    /// provider already has a contact with the same key.
    pub async fn push_contact(&self, contact: &Contact) -> ServiceResult<RecordOutcome> {
        if self.adapter.contact_key_kind().is_none() {
            return Ok(RecordOutcome::skipped("provider has no contacts"));
        }
        let ctx = self.adapter.begin_cycle(Direction::Push).await?;
        let mut resolver = ContactResolver::new(self.adapter, &ctx);
        match resolver.resolve(contact).await? {
            Some(resolved) if resolved.created => Ok(RecordOutcome::Created),
            Some(resolved) => Ok(RecordOutcome::skipped(format!(
                "contact already exists remotely as {}",
                resolved.id
            ))),
            None => Ok(RecordOutcome::skipped("contact has no correlating key")),
        }
    }

    /// Deletes the remote counterpart of a removed local event.
    pub async fn push_deleted(&self, event: &Event) -> ServiceResult<RecordOutcome> {
        let Some(remote_id) = event.remote_id() else {
            return Ok(RecordOutcome::skipped("event has no remote id"));
        };
        match self.adapter.delete_remote_event(remote_id).await {
            Ok(()) => Ok(RecordOutcome::Deleted),
            Err(e) if e.is_not_found() => {
                warn!(event = %event.id, remote = %remote_id, "remote record already gone");
                Ok(RecordOutcome::skipped("remote record not found"))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Overwrites the mutable fields of `event` with pulled values.
fn apply_fields(event: &mut Event, fields: LocalFields, participants: Option<Vec<Participant>>) {
    if let Some(subject) = fields.subject {
        event.subject = subject;
    }
    event.description = fields.description;
    if let Some(starts_on) = fields.starts_on {
        event.starts_on = starts_on;
    }
    event.ends_on = fields.ends_on;
    if let Some(participants) = participants {
        event.participants = participants;
    }
    event.normalize_times();
}

fn record_label(record: &RemoteRecord) -> String {
    eventbridge_providers::mapping::lookup_path(record.json(), "id")
        .and_then(eventbridge_providers::mapping::value_to_text)
        .unwrap_or_else(|| "<no id>".to_string())
}
