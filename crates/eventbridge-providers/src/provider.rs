//! ProviderAdapter trait definition.
//!
//! [`ProviderAdapter`] is the capability set the reconciler needs from a
//! provider: remote event CRUD with pagination, contact lookup and creation,
//! and the two mapping directions. Per-cycle state (the owner to assign, the
//! contact cache) lives in a [`CycleContext`] value owned by the caller, never
//! in the adapter.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tracing::{debug, warn};

use eventbridge_core::{ContactKey, ContactKeyKind, Direction, Event, ProviderKind, TimeRange};

use crate::error::{ProviderError, ProviderResult};
use crate::mapping::LocalFields;

/// A boxed future for async trait methods.
///
/// Keeps [`ProviderAdapter`] object-safe so the reconciler can work with
/// `&dyn ProviderAdapter`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A record as returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord(pub Value);

impl RemoteRecord {
    pub fn json(&self) -> &Value {
        &self.0
    }
}

/// One page of a remote listing.
#[derive(Debug, Clone, Default)]
pub struct RemotePage {
    pub records: Vec<RemoteRecord>,
    /// Opaque continuation token; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// A body ready to send to the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePayload(pub Value);

impl RemotePayload {
    pub fn json(&self) -> &Value {
        &self.0
    }
}

/// Whether a payload is for a new record or an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadIntent {
    Create,
    Update,
}

/// A provider-side contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteContact {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub assigned_to: Option<String>,
}

impl RemoteContact {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Correlating key of the requested kind, if present.
    pub fn key(&self, kind: ContactKeyKind) -> Option<ContactKey> {
        match kind {
            ContactKeyKind::Email => self.email.as_deref().and_then(ContactKey::email),
            ContactKeyKind::Phone => self.phone.as_deref().and_then(ContactKey::phone),
        }
    }
}

/// Fields sent when creating or refreshing a remote contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactFields {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub owner_id: Option<String>,
}

/// Attendees of a remote record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attendees {
    /// The provider listed these contacts.
    Known(Vec<RemoteContact>),
    /// The provider did not say; existing local participants should be kept.
    Unknown,
}

/// Remote contacts seen during one cycle, keyed by remote id.
#[derive(Debug, Clone, Default)]
pub struct ContactCache {
    by_id: HashMap<String, RemoteContact>,
}

impl ContactCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contact: RemoteContact) {
        self.by_id.insert(contact.id.clone(), contact);
    }

    pub fn get(&self, id: &str) -> Option<&RemoteContact> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contacts(&self) -> impl Iterator<Item = &RemoteContact> {
        self.by_id.values()
    }
}

impl FromIterator<RemoteContact> for ContactCache {
    fn from_iter<I: IntoIterator<Item = RemoteContact>>(iter: I) -> Self {
        let mut cache = Self::new();
        for contact in iter {
            cache.insert(contact);
        }
        cache
    }
}

/// State owned by a single pull or push cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleContext {
    /// User that created meetings and contacts are assigned to.
    pub owner_id: Option<String>,
    pub contacts: ContactCache,
}

impl CycleContext {
    pub fn with_owner(owner_id: Option<String>) -> Self {
        Self {
            owner_id,
            contacts: ContactCache::new(),
        }
    }
}

/// The capability set of one external calendar provider.
///
/// Implementations are built per [`CalendarLink`](eventbridge_core::CalendarLink)
/// and hold only immutable configuration.
pub trait ProviderAdapter: Send + Sync {
    /// Which provider this adapter talks to.
    fn kind(&self) -> ProviderKind;

    /// Prepares the state for one cycle (owner lookup, contact prefetch).
    fn begin_cycle(&self, direction: Direction) -> BoxFuture<'_, ProviderResult<CycleContext>>;

    /// Fetches one page of remote records.
    fn list_remote_events<'a>(
        &'a self,
        range: &'a TimeRange,
        cursor: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<RemotePage>>;

    /// Fetches one record; `None` when the provider reports it missing.
    fn get_remote_event<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Option<RemoteRecord>>>;

    /// Creates a record and returns its remote id.
    fn create_remote_event<'a>(
        &'a self,
        payload: &'a RemotePayload,
    ) -> BoxFuture<'a, ProviderResult<String>>;

    fn update_remote_event<'a>(
        &'a self,
        id: &'a str,
        payload: &'a RemotePayload,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    fn delete_remote_event<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>>;

    /// Attribute used to correlate contacts, or `None` if the provider has no contacts.
    fn contact_key_kind(&self) -> Option<ContactKeyKind>;

    /// Candidate contacts for `key`. Callers apply the match rule.
    fn find_contacts<'a>(
        &'a self,
        key: &'a ContactKey,
        ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<Vec<RemoteContact>>>;

    fn create_contact<'a>(
        &'a self,
        fields: &'a ContactFields,
        ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<String>>;

    fn update_contact<'a>(
        &'a self,
        id: &'a str,
        fields: &'a ContactFields,
        ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Every remote contact the link can see, for importing into the local store.
    ///
    /// Providers without a contact listing return a calendar error.
    fn list_remote_contacts(&self) -> BoxFuture<'_, ProviderResult<Vec<RemoteContact>>> {
        let kind = self.kind();
        Box::pin(async move { Err(contacts_unsupported(kind)) })
    }

    /// Whether a matched contact gets its mutable fields refreshed.
    fn refreshes_matched_contacts(&self) -> bool {
        false
    }

    /// Whether a push needs at least one resolved attendee.
    fn requires_attendees(&self) -> bool {
        true
    }

    /// Attendees of a pulled record. May use or fill the cycle's contact cache.
    fn record_attendees<'a>(
        &'a self,
        record: &'a RemoteRecord,
        ctx: &'a mut CycleContext,
    ) -> BoxFuture<'a, ProviderResult<Attendees>>;

    /// Maps a remote record to local fields.
    fn map_in(&self, record: &RemoteRecord) -> ProviderResult<LocalFields>;

    /// Builds the provider payload for `event` and its resolved remote contact ids.
    fn map_out(
        &self,
        event: &Event,
        attendee_ids: &[String],
        intent: PayloadIntent,
        ctx: &CycleContext,
    ) -> ProviderResult<RemotePayload>;
}

/// Upper bound on pages fetched by one listing.
pub const MAX_LISTING_PAGES: usize = 200;

/// Follows cursors until the provider reports no further page.
///
/// Stops early, keeping what was fetched, when a cursor comes back a second
/// time or after [`MAX_LISTING_PAGES`] pages.
pub async fn fetch_all_remote_events(
    adapter: &dyn ProviderAdapter,
    range: &TimeRange,
) -> ProviderResult<Vec<RemoteRecord>> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = adapter
            .list_remote_events(range, cursor.as_deref())
            .await?;
        pages += 1;
        records.extend(page.records);

        let Some(next) = page.next_cursor else {
            break;
        };
        if !seen.insert(next.clone()) {
            warn!(provider = %adapter.kind(), cursor = %next, "provider repeated a cursor, stopping");
            break;
        }
        if pages >= MAX_LISTING_PAGES {
            warn!(provider = %adapter.kind(), pages, "page limit reached, stopping");
            break;
        }
        cursor = Some(next);
    }

    debug!(provider = %adapter.kind(), pages, records = records.len(), "fetched remote events");
    Ok(records)
}

/// Error for contact operations on a provider without contacts.
pub(crate) fn contacts_unsupported(kind: ProviderKind) -> ProviderError {
    ProviderError::calendar("contacts are not supported by this provider").with_provider(kind.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_contact_keys() {
        let contact = RemoteContact {
            id: "1".into(),
            email: Some(" a@b.co ".into()),
            phone: Some("+57 300".into()),
            ..Default::default()
        };
        assert_eq!(
            contact.key(ContactKeyKind::Email),
            Some(ContactKey::Email("a@b.co".into()))
        );
        assert_eq!(
            contact.key(ContactKeyKind::Phone),
            Some(ContactKey::Phone("+57300".into()))
        );
    }

    #[test]
    fn contact_cache_from_iter() {
        let cache: ContactCache = vec![RemoteContact::new("a"), RemoteContact::new("b")]
            .into_iter()
            .collect();
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_none());
    }

    #[test]
    fn record_exposes_json() {
        let record = RemoteRecord(json!({"id": "x"}));
        assert_eq!(record.json()["id"], "x");
    }
}
