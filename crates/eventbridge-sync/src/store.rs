//! Local persistence for events and contacts.
//!
//! [`EventStore`] is the collaborator the reconciler writes through.
//! [`MemoryStore`] keeps everything in a [`StoreSnapshot`] behind an
//! `RwLock`; other stores can wrap it and persist the snapshot.

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use eventbridge_core::{CalendarLink, Contact, ContactKey, Event, ProviderKind};

use crate::error::{StoreError, StoreResult};

/// Persistence operations used by sync cycles and hooks.
pub trait EventStore: Send + Sync {
    fn get_event(&self, id: &str) -> StoreResult<Option<Event>>;

    /// Event previously pulled from or pushed to `provider` as `remote_id`.
    fn find_by_remote_id(&self, provider: ProviderKind, remote_id: &str)
    -> StoreResult<Option<Event>>;

    /// Stores a new event and returns its id. An empty id is replaced by a fresh one.
    fn insert_event(&self, event: Event) -> StoreResult<String>;

    /// Replaces an existing event.
    fn update_event(&self, event: &Event) -> StoreResult<()>;

    /// Records the remote id of a pushed event without touching other fields.
    fn set_remote_event_id(&self, event_id: &str, remote_id: &str) -> StoreResult<()>;

    /// Removes an event, returning it if it existed.
    fn delete_event(&self, id: &str) -> StoreResult<Option<Event>>;

    /// Sync-enabled events linked to `link`.
    fn events_for_push(&self, link: &CalendarLink) -> StoreResult<Vec<Event>>;

    fn list_events(&self) -> StoreResult<Vec<Event>>;

    fn get_contact(&self, id: &str) -> StoreResult<Option<Contact>>;

    /// First contact carrying `key`.
    fn find_contact(&self, key: &ContactKey) -> StoreResult<Option<Contact>>;

    /// Stores a new contact and returns its id. An empty id is replaced by a fresh one.
    fn insert_contact(&self, contact: Contact) -> StoreResult<String>;

    /// Replaces an existing contact.
    fn update_contact(&self, contact: &Contact) -> StoreResult<()>;
}

/// Serializable contents of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub events: BTreeMap<String, Event>,
    #[serde(default)]
    pub contacts: BTreeMap<String, Contact>,
}

fn fresh_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

/// In-memory store. Writes are last-writer-wins.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> StoreResult<StoreSnapshot> {
        self.read(|s| s.clone())
    }

    fn read<T>(&self, f: impl FnOnce(&StoreSnapshot) -> T) -> StoreResult<T> {
        let guard = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut StoreSnapshot) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        f(&mut guard)
    }
}

impl EventStore for MemoryStore {
    fn get_event(&self, id: &str) -> StoreResult<Option<Event>> {
        self.read(|s| s.events.get(id).cloned())
    }

    fn find_by_remote_id(
        &self,
        provider: ProviderKind,
        remote_id: &str,
    ) -> StoreResult<Option<Event>> {
        self.read(|s| {
            s.events
                .values()
                .find(|e| e.sync_provider == Some(provider) && e.remote_id() == Some(remote_id))
                .cloned()
        })
    }

    fn insert_event(&self, mut event: Event) -> StoreResult<String> {
        if event.id.trim().is_empty() {
            event.id = fresh_id("EV");
        }
        let id = event.id.clone();
        self.write(|s| {
            s.events.insert(id.clone(), event);
            Ok(id)
        })
    }

    fn update_event(&self, event: &Event) -> StoreResult<()> {
        self.write(|s| match s.events.get_mut(&event.id) {
            Some(slot) => {
                *slot = event.clone();
                Ok(())
            }
            None => Err(StoreError::event_not_found(&event.id)),
        })
    }

    fn set_remote_event_id(&self, event_id: &str, remote_id: &str) -> StoreResult<()> {
        self.write(|s| match s.events.get_mut(event_id) {
            Some(event) => {
                event.remote_event_id = Some(remote_id.to_string());
                Ok(())
            }
            None => Err(StoreError::event_not_found(event_id)),
        })
    }

    fn delete_event(&self, id: &str) -> StoreResult<Option<Event>> {
        self.write(|s| Ok(s.events.remove(id)))
    }

    fn events_for_push(&self, link: &CalendarLink) -> StoreResult<Vec<Event>> {
        self.read(|s| {
            s.events
                .values()
                .filter(|e| e.is_synced_with(link))
                .cloned()
                .collect()
        })
    }

    fn list_events(&self) -> StoreResult<Vec<Event>> {
        self.read(|s| s.events.values().cloned().collect())
    }

    fn get_contact(&self, id: &str) -> StoreResult<Option<Contact>> {
        self.read(|s| s.contacts.get(id).cloned())
    }

    fn find_contact(&self, key: &ContactKey) -> StoreResult<Option<Contact>> {
        self.read(|s| s.contacts.values().find(|c| c.matches_key(key)).cloned())
    }

    fn insert_contact(&self, mut contact: Contact) -> StoreResult<String> {
        if contact.id.trim().is_empty() {
            contact.id = fresh_id("CT");
        }
        let id = contact.id.clone();
        self.write(|s| {
            s.contacts.insert(id.clone(), contact);
            Ok(id)
        })
    }

    fn update_contact(&self, contact: &Contact) -> StoreResult<()> {
        self.write(|s| match s.contacts.get_mut(&contact.id) {
            Some(slot) => {
                *slot = contact.clone();
                Ok(())
            }
            None => Err(StoreError::contact_not_found(&contact.id)),
        })
    }
}
