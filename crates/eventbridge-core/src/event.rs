//! Local calendar events and their sync metadata.

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarLink, ProviderKind};

/// Length assumed for events that have no end time.
pub const DEFAULT_DURATION_MINUTES: i64 = 30;

/// A reference from an event to a local contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub contact_id: String,
}

impl Participant {
    pub fn new(contact_id: impl Into<String>) -> Self {
        Self {
            contact_id: contact_id.into(),
        }
    }
}

/// A local calendar record.
///
/// The sync metadata fields decide whether a sync cycle may touch the record:
/// nothing happens unless `sync_enabled` is set and the provider/calendar
/// linkage matches the link being synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Local identifier, assigned by the store when empty.
    #[serde(default)]
    pub id: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Start as local wall clock.
    pub starts_on: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_on: Option<NaiveDateTime>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Provider-side customer reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_provider: Option<ProviderKind>,
    /// Id of the [`CalendarLink`] this event syncs with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_calendar_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_event_id: Option<String>,
    #[serde(default)]
    pub sync_enabled: bool,
    #[serde(default)]
    pub pulled_from_provider: bool,
}

impl Event {
    /// Creates an unlinked event.
    pub fn new(id: impl Into<String>, subject: impl Into<String>, starts_on: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            description: None,
            starts_on,
            ends_on: None,
            participants: Vec::new(),
            customer_ref: None,
            sync_provider: None,
            sync_calendar_ref: None,
            remote_event_id: None,
            sync_enabled: false,
            pulled_from_provider: false,
        }
    }

    /// Creates an event starting now, with no id yet.
    pub fn draft(subject: impl Into<String>) -> Self {
        Self::new("", subject, Local::now().naive_local())
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the end time.
    pub fn with_ends_on(mut self, ends_on: NaiveDateTime) -> Self {
        self.ends_on = Some(ends_on);
        self
    }

    /// Builder method to add a participant.
    pub fn with_participant(mut self, contact_id: impl Into<String>) -> Self {
        self.participants.push(Participant::new(contact_id));
        self
    }

    /// Builder method to set the customer reference.
    pub fn with_customer_ref(mut self, customer_ref: impl Into<String>) -> Self {
        self.customer_ref = Some(customer_ref.into());
        self
    }

    /// Builder method to set the remote id.
    pub fn with_remote_event_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_event_id = Some(remote_id.into());
        self
    }

    /// Links the event to `link` and enables sync.
    pub fn linked_to(mut self, link: &CalendarLink) -> Self {
        self.sync_provider = Some(link.provider);
        self.sync_calendar_ref = Some(link.id.clone());
        self.sync_enabled = true;
        self
    }

    /// The remote id, ignoring blank values.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_event_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Returns true if the event is sync-enabled and linked to `link`.
    pub fn is_synced_with(&self, link: &CalendarLink) -> bool {
        self.sync_enabled
            && self.sync_provider == Some(link.provider)
            && self.sync_calendar_ref.as_deref() == Some(link.id.as_str())
    }

    /// The end time, or start plus the default duration.
    ///
    /// `None` when the default end falls outside the representable range.
    pub fn effective_end(&self) -> Option<NaiveDateTime> {
        self.ends_on.or_else(|| {
            self.starts_on
                .checked_add_signed(Duration::minutes(DEFAULT_DURATION_MINUTES))
        })
    }

    /// Drops an end time equal to the start.
    pub fn normalize_times(&mut self) {
        if self.ends_on == Some(self.starts_on) {
            self.ends_on = None;
        }
    }

    /// Participant contact ids in order.
    pub fn contact_ids(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.contact_id.as_str())
    }
}
