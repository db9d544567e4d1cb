//! JSON-file event store.
//!
//! Holds everything in a [`MemoryStore`] and rewrites the file after each
//! write. The file is replaced atomically through a sibling temp file.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use eventbridge_core::{CalendarLink, Contact, ContactKey, Event, ProviderKind};
use eventbridge_sync::{EventStore, MemoryStore, StoreError, StoreResult, StoreSnapshot};

/// Store persisted as a single JSON document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let snapshot = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                StoreSnapshot::default()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            StoreSnapshot::default()
        };
        debug!(
            path = %path.display(),
            events = snapshot.events.len(),
            contacts = snapshot.contacts.len(),
            "store opened"
        );
        Ok(Self {
            path,
            inner: MemoryStore::from_snapshot(snapshot),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies a write to memory, then persists the whole store.
    fn write<T>(&self, f: impl FnOnce(&MemoryStore) -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let value = f(&self.inner)?;
        self.persist()?;
        Ok(value)
    }

    fn persist(&self) -> StoreResult<()> {
        let snapshot = self.inner.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl EventStore for JsonFileStore {
    fn get_event(&self, id: &str) -> StoreResult<Option<Event>> {
        self.inner.get_event(id)
    }

    fn find_by_remote_id(
        &self,
        provider: ProviderKind,
        remote_id: &str,
    ) -> StoreResult<Option<Event>> {
        self.inner.find_by_remote_id(provider, remote_id)
    }

    fn insert_event(&self, event: Event) -> StoreResult<String> {
        self.write(|s| s.insert_event(event))
    }

    fn update_event(&self, event: &Event) -> StoreResult<()> {
        self.write(|s| s.update_event(event))
    }

    fn set_remote_event_id(&self, event_id: &str, remote_id: &str) -> StoreResult<()> {
        self.write(|s| s.set_remote_event_id(event_id, remote_id))
    }

    fn delete_event(&self, id: &str) -> StoreResult<Option<Event>> {
        self.write(|s| s.delete_event(id))
    }

    fn events_for_push(&self, link: &CalendarLink) -> StoreResult<Vec<Event>> {
        self.inner.events_for_push(link)
    }

    fn list_events(&self) -> StoreResult<Vec<Event>> {
        self.inner.list_events()
    }

    fn get_contact(&self, id: &str) -> StoreResult<Option<Contact>> {
        self.inner.get_contact(id)
    }

    fn find_contact(&self, key: &ContactKey) -> StoreResult<Option<Contact>> {
        self.inner.find_contact(key)
    }

    fn insert_contact(&self, contact: Contact) -> StoreResult<String> {
        self.write(|s| s.insert_contact(contact))
    }

    fn update_contact(&self, contact: &Contact) -> StoreResult<()> {
        self.write(|s| s.update_contact(contact))
    }
}
