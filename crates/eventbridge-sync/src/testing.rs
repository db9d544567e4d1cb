//! In-process adapter used by the sync tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Value, json};

use eventbridge_core::{
    CalendarLink, ContactKey, ContactKeyKind, Direction, Event, ProviderKind, TimeRange,
};
use eventbridge_providers::resolver::is_match;
use eventbridge_providers::{
    Attendees, BoxFuture, ContactFields, CycleContext, FieldMap, FieldRule, LocalField,
    LocalFields, PayloadIntent, ProviderAdapter, ProviderError, ProviderResult, RemoteContact,
    RemotePage, RemotePayload, RemoteRecord,
};

const FIELDS: FieldMap = FieldMap::new(&[
    FieldRule::text(LocalField::RemoteId, "id"),
    FieldRule::text(LocalField::Subject, "title"),
    FieldRule::timestamp(LocalField::StartsOn, "start"),
    FieldRule::timestamp(LocalField::EndsOn, "end"),
    FieldRule::text(LocalField::CalendarRef, "calendar"),
]);

pub(crate) fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap()
}

pub(crate) fn link() -> CalendarLink {
    CalendarLink::new("crm", ProviderKind::CrmMeetings, "cal", "token")
}

pub(crate) fn remote_meeting(i: usize) -> Value {
    json!({
        "id": format!("r-{}", i),
        "title": format!("Meeting {}", i),
        "start": "2024-03-01T09:00:00",
        "end": "2024-03-01T09:30:00",
        "calendar": "cal",
    })
}

/// Scriptable adapter that records every remote call.
pub(crate) struct FakeAdapter {
    kind: ProviderKind,
    key_kind: Option<ContactKeyKind>,
    requires_attendees: bool,
    fail_begin: bool,
    fail_list_page: Option<usize>,
    fail_attendees: HashSet<String>,
    fail_lookup: bool,
    listed_contacts: Option<Vec<RemoteContact>>,
    pages: Vec<Vec<Value>>,
    attendees: HashMap<String, Vec<RemoteContact>>,
    remote: Mutex<HashMap<String, Value>>,
    contacts: Mutex<Vec<RemoteContact>>,
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
}

impl FakeAdapter {
    pub(crate) fn new() -> Self {
        Self {
            kind: ProviderKind::CrmMeetings,
            key_kind: Some(ContactKeyKind::Email),
            requires_attendees: true,
            fail_begin: false,
            fail_list_page: None,
            fail_attendees: HashSet::new(),
            fail_lookup: false,
            listed_contacts: None,
            pages: Vec::new(),
            attendees: HashMap::new(),
            remote: Mutex::new(HashMap::new()),
            contacts: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    pub(crate) fn with_pages(mut self, pages: Vec<Vec<Value>>) -> Self {
        self.pages = pages;
        self
    }

    pub(crate) fn with_attendees(mut self, record: &str, contacts: Vec<RemoteContact>) -> Self {
        self.attendees.insert(record.to_string(), contacts);
        self
    }

    pub(crate) fn with_key_kind(mut self, kind: ContactKeyKind) -> Self {
        self.key_kind = Some(kind);
        self
    }

    /// Behaves like a provider without contacts.
    pub(crate) fn without_attendees(mut self) -> Self {
        self.key_kind = None;
        self.requires_attendees = false;
        self
    }

    pub(crate) fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    /// Listing the page at `index` fails with a server error.
    pub(crate) fn failing_list_page(mut self, index: usize) -> Self {
        self.fail_list_page = Some(index);
        self
    }

    pub(crate) fn failing_attendees(mut self, record: &str) -> Self {
        self.fail_attendees.insert(record.to_string());
        self
    }

    /// Every `get_remote_event` fails with a server error.
    pub(crate) fn failing_lookup(mut self) -> Self {
        self.fail_lookup = true;
        self
    }

    pub(crate) fn with_listed_contacts(mut self, contacts: Vec<RemoteContact>) -> Self {
        self.listed_contacts = Some(contacts);
        self
    }

    /// Adds a contact the provider already knows.
    pub(crate) fn with_remote_contact(self, contact: RemoteContact) -> Self {
        self.contacts.lock().unwrap().push(contact);
        self
    }

    pub(crate) fn created_contacts(&self) -> Vec<RemoteContact> {
        self.contacts.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == call)
            .count()
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl ProviderAdapter for FakeAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn begin_cycle(&self, _direction: Direction) -> BoxFuture<'_, ProviderResult<CycleContext>> {
        Box::pin(async move {
            if self.fail_begin {
                return Err(ProviderError::authentication("token rejected"));
            }
            Ok(CycleContext::with_owner(Some("owner".into())))
        })
    }

    fn list_remote_events<'a>(
        &'a self,
        _range: &'a TimeRange,
        cursor: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<RemotePage>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let index = cursor.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
            if self.fail_list_page == Some(index) {
                return Err(ProviderError::from_status(502, "bad gateway"));
            }
            let records = self
                .pages
                .get(index)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(RemoteRecord)
                .collect();
            let next_cursor = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
            Ok(RemotePage {
                records,
                next_cursor,
            })
        })
    }

    fn get_remote_event<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Option<RemoteRecord>>> {
        Box::pin(async move {
            self.record(format!("get:{}", id));
            if self.fail_lookup {
                return Err(ProviderError::from_status(500, "internal error"));
            }
            Ok(self.remote.lock().unwrap().get(id).cloned().map(RemoteRecord))
        })
    }

    fn create_remote_event<'a>(
        &'a self,
        payload: &'a RemotePayload,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.record("create");
            let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            self.remote
                .lock()
                .unwrap()
                .insert(id.clone(), payload.json().clone());
            Ok(id)
        })
    }

    fn update_remote_event<'a>(
        &'a self,
        id: &'a str,
        payload: &'a RemotePayload,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.record(format!("update:{}", id));
            self.remote
                .lock()
                .unwrap()
                .insert(id.to_string(), payload.json().clone());
            Ok(())
        })
    }

    fn delete_remote_event<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.record(format!("delete:{}", id));
            match self.remote.lock().unwrap().remove(id) {
                Some(_) => Ok(()),
                None => Err(ProviderError::not_found("no such record")),
            }
        })
    }

    fn contact_key_kind(&self) -> Option<ContactKeyKind> {
        self.key_kind
    }

    fn find_contacts<'a>(
        &'a self,
        key: &'a ContactKey,
        _ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<Vec<RemoteContact>>> {
        Box::pin(async move {
            self.record("find_contacts");
            Ok(self
                .contacts
                .lock()
                .unwrap()
                .iter()
                .filter(|c| is_match(c, key))
                .cloned()
                .collect())
        })
    }

    fn create_contact<'a>(
        &'a self,
        fields: &'a ContactFields,
        _ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.record("create_contact");
            let id = format!("c-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            self.contacts.lock().unwrap().push(RemoteContact {
                id: id.clone(),
                email: fields.email.clone(),
                first_name: Some(fields.first_name.clone()),
                last_name: Some(fields.last_name.clone()),
                phone: fields.phone.clone(),
                assigned_to: fields.owner_id.clone(),
            });
            Ok(id)
        })
    }

    fn update_contact<'a>(
        &'a self,
        id: &'a str,
        _fields: &'a ContactFields,
        _ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.record(format!("update_contact:{}", id));
            Ok(())
        })
    }

    fn list_remote_contacts(&self) -> BoxFuture<'_, ProviderResult<Vec<RemoteContact>>> {
        Box::pin(async move {
            self.record("list_contacts");
            self.listed_contacts
                .clone()
                .ok_or_else(|| ProviderError::calendar("contacts are not supported"))
        })
    }

    fn requires_attendees(&self) -> bool {
        self.requires_attendees
    }

    fn record_attendees<'a>(
        &'a self,
        record: &'a RemoteRecord,
        _ctx: &'a mut CycleContext,
    ) -> BoxFuture<'a, ProviderResult<Attendees>> {
        Box::pin(async move {
            let id = record.json()["id"].as_str().unwrap_or_default();
            if self.fail_attendees.contains(id) {
                return Err(ProviderError::network("attendee lookup timed out"));
            }
            Ok(self
                .attendees
                .get(id)
                .cloned()
                .map_or(Attendees::Unknown, Attendees::Known))
        })
    }

    fn map_in(&self, record: &RemoteRecord) -> ProviderResult<LocalFields> {
        FIELDS
            .to_local(record.json(), &chrono::FixedOffset::east_opt(0).unwrap())
            .finish_pull("Untitled")
    }

    fn map_out(
        &self,
        event: &Event,
        attendee_ids: &[String],
        intent: PayloadIntent,
        _ctx: &CycleContext,
    ) -> ProviderResult<RemotePayload> {
        if event.subject.trim().is_empty() {
            return Err(ProviderError::mapping("missing required field `subject`"));
        }
        Ok(RemotePayload(json!({
            "title": event.subject,
            "start": event.starts_on.to_string(),
            "attendees": attendee_ids,
            "create": intent == PayloadIntent::Create,
        })))
    }
}
