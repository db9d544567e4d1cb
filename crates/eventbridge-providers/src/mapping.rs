//! Table-driven field mapping between local events and provider records.
//!
//! Each provider declares a [`FieldMap`] for each direction: a static list of
//! [`FieldRule`]s pairing a [`LocalField`] with a dotted path into the remote
//! JSON (`calendar.id`, `properties.hs_meeting_title`). Reading a missing path
//! yields `None`; writing a dotted path creates the nested objects.

use chrono::{FixedOffset, NaiveDateTime};
use serde_json::{Map, Value};

use eventbridge_core::Event;
use eventbridge_core::time::{
    epoch_millis, format_with_offset, format_zulu, millis_to_wall_clock, parse_remote_timestamp,
};

use crate::error::{ProviderError, ProviderResult};

/// A mappable field of the local event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalField {
    RemoteId,
    Subject,
    Description,
    StartsOn,
    EndsOn,
    CustomerRef,
    /// Remote calendar the record belongs to.
    CalendarRef,
    /// Remote contact attached to the record.
    ContactRef,
}

impl LocalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteId => "remote_event_id",
            Self::Subject => "subject",
            Self::Description => "description",
            Self::StartsOn => "starts_on",
            Self::EndsOn => "ends_on",
            Self::CustomerRef => "customer_ref",
            Self::CalendarRef => "calendar_ref",
            Self::ContactRef => "contact_ref",
        }
    }
}

/// How a remote value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Timestamp,
}

/// How local timestamps are written on push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStyle {
    /// Number of milliseconds since the epoch.
    EpochMillis,
    /// `YYYY-MM-DDTHH:MM:SS` followed by the link's offset.
    OffsetSuffix,
    /// UTC with a `Z` suffix.
    Zulu,
}

/// One row of a mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub local: LocalField,
    pub path: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    pub const fn text(local: LocalField, path: &'static str) -> Self {
        Self {
            local,
            path,
            kind: FieldKind::Text,
            required: false,
        }
    }

    pub const fn timestamp(local: LocalField, path: &'static str) -> Self {
        Self {
            local,
            path,
            kind: FieldKind::Timestamp,
            required: false,
        }
    }

    /// Marks the rule as mandatory on push.
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Partial event fields read from or written to a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalFields {
    pub remote_id: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub starts_on: Option<NaiveDateTime>,
    pub ends_on: Option<NaiveDateTime>,
    pub customer_ref: Option<String>,
    pub calendar_ref: Option<String>,
    pub contact_ref: Option<String>,
}

impl LocalFields {
    /// Fields of a local event as pushed to `remote_calendar_id`.
    ///
    /// A missing end becomes start plus the default duration.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when that default end is out of range.
    pub fn from_event(event: &Event, remote_calendar_id: &str) -> ProviderResult<Self> {
        let ends_on = event.effective_end().ok_or_else(|| {
            ProviderError::mapping(format!("event {} has an end time out of range", event.id))
        })?;
        Ok(Self {
            remote_id: event.remote_id().map(String::from),
            subject: Some(event.subject.clone()).filter(|s| !s.trim().is_empty()),
            description: event.description.clone(),
            starts_on: Some(event.starts_on),
            ends_on: Some(ends_on),
            customer_ref: event.customer_ref.clone(),
            calendar_ref: Some(remote_calendar_id.to_string()).filter(|s| !s.is_empty()),
            contact_ref: None,
        })
    }

    /// Checks the fields every pulled record needs and fills a default subject.
    ///
    /// # Errors
    ///
    /// Returns a mapping error when the remote id or start time is missing.
    pub fn finish_pull(mut self, default_subject: &str) -> ProviderResult<Self> {
        if self.remote_id.is_none() {
            return Err(ProviderError::mapping("remote record has no id"));
        }
        if self.starts_on.is_none() {
            return Err(ProviderError::mapping(format!(
                "remote record {} has no start time",
                self.remote_id.as_deref().unwrap_or_default()
            )));
        }
        if self.subject.as_deref().is_none_or(|s| s.trim().is_empty()) {
            self.subject = Some(default_subject.to_string());
        }
        Ok(self)
    }

    fn text(&self, field: LocalField) -> Option<&str> {
        match field {
            LocalField::RemoteId => self.remote_id.as_deref(),
            LocalField::Subject => self.subject.as_deref(),
            LocalField::Description => self.description.as_deref(),
            LocalField::CustomerRef => self.customer_ref.as_deref(),
            LocalField::CalendarRef => self.calendar_ref.as_deref(),
            LocalField::ContactRef => self.contact_ref.as_deref(),
            LocalField::StartsOn | LocalField::EndsOn => None,
        }
    }

    fn timestamp(&self, field: LocalField) -> Option<NaiveDateTime> {
        match field {
            LocalField::StartsOn => self.starts_on,
            LocalField::EndsOn => self.ends_on,
            _ => None,
        }
    }

    fn set_text(&mut self, field: LocalField, value: String) {
        let slot = match field {
            LocalField::RemoteId => &mut self.remote_id,
            LocalField::Subject => &mut self.subject,
            LocalField::Description => &mut self.description,
            LocalField::CustomerRef => &mut self.customer_ref,
            LocalField::CalendarRef => &mut self.calendar_ref,
            LocalField::ContactRef => &mut self.contact_ref,
            LocalField::StartsOn | LocalField::EndsOn => return,
        };
        *slot = Some(value);
    }

    fn set_timestamp(&mut self, field: LocalField, value: NaiveDateTime) {
        match field {
            LocalField::StartsOn => self.starts_on = Some(value),
            LocalField::EndsOn => self.ends_on = Some(value),
            _ => {}
        }
    }
}

/// Follows a dotted path through nested objects.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

/// Renders a scalar as text. Objects, arrays, null and blank strings give `None`.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_timestamp(value: &Value, offset: &FixedOffset) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_remote_timestamp(s, offset),
        Value::Number(n) => n.as_i64().and_then(|ms| millis_to_wall_clock(ms, offset)),
        _ => None,
    }
}

fn set_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    let mut parts = path.split('.').peekable();
    let mut current = target;
    while let Some(key) = parts.next() {
        if parts.peek().is_none() {
            current.insert(key.to_string(), value);
            return;
        }
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
}

/// A provider's mapping table for one direction.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    rules: &'static [FieldRule],
}

impl FieldMap {
    pub const fn new(rules: &'static [FieldRule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [FieldRule] {
        self.rules
    }

    /// Reads every rule from `record`. Missing paths leave the field `None`.
    pub fn to_local(&self, record: &Value, offset: &FixedOffset) -> LocalFields {
        let mut fields = LocalFields::default();
        for rule in self.rules {
            let Some(raw) = lookup_path(record, rule.path) else {
                continue;
            };
            match rule.kind {
                FieldKind::Text => {
                    if let Some(text) = value_to_text(raw) {
                        fields.set_text(rule.local, text);
                    }
                }
                FieldKind::Timestamp => {
                    if let Some(ts) = value_to_timestamp(raw, offset) {
                        fields.set_timestamp(rule.local, ts);
                    }
                }
            }
        }
        fields
    }

    /// Builds a JSON object from `fields`.
    ///
    /// # Errors
    ///
    /// Returns a mapping error naming the first required field that is absent,
    /// or the first timestamp that has no UTC instant in `offset`.
    pub fn to_remote(
        &self,
        fields: &LocalFields,
        style: TimestampStyle,
        offset: &FixedOffset,
    ) -> ProviderResult<Map<String, Value>> {
        let mut out = Map::new();
        for rule in self.rules {
            let value = match rule.kind {
                FieldKind::Text => fields
                    .text(rule.local)
                    .map(|text| Value::String(text.to_string())),
                FieldKind::Timestamp => match fields.timestamp(rule.local) {
                    Some(ts) => Some(remote_timestamp(ts, style, offset).ok_or_else(|| {
                        ProviderError::mapping(format!(
                            "`{}` is out of range: {}",
                            rule.local.as_str(),
                            ts
                        ))
                    })?),
                    None => None,
                },
            };
            match value {
                Some(value) => set_path(&mut out, rule.path, value),
                None if rule.required => {
                    return Err(ProviderError::mapping(format!(
                        "missing required field `{}` for `{}`",
                        rule.local.as_str(),
                        rule.path
                    )));
                }
                None => {}
            }
        }
        Ok(out)
    }
}

fn remote_timestamp(
    ts: NaiveDateTime,
    style: TimestampStyle,
    offset: &FixedOffset,
) -> Option<Value> {
    match style {
        TimestampStyle::EpochMillis => epoch_millis(ts, offset).map(Value::from),
        TimestampStyle::OffsetSuffix => Some(Value::String(format_with_offset(ts, offset))),
        TimestampStyle::Zulu => format_zulu(ts, offset).map(Value::String),
    }
}
