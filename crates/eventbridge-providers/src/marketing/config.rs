//! Marketing calendar provider configuration.

use crate::http::SuccessCodes;
use crate::mapping::{FieldMap, FieldRule, LocalField};

pub const DEFAULT_BASE_URL: &str = "https://services.leadconnectorhq.com";

pub const SUCCESS_CODES: SuccessCodes = SuccessCodes::new(&[200, 201]);

/// `Version` header for calendar endpoints.
pub const CALENDAR_API_VERSION: &str = "2021-04-15";

/// `Version` header for contact endpoints.
pub const CONTACTS_API_VERSION: &str = "2021-07-28";

pub const CONTACT_PAGE_SIZE: usize = 100;

/// Pages read from the contact listing before giving up on the rest.
pub const MAX_CONTACT_PAGES: usize = 100;

pub const DEFAULT_SUBJECT: &str = "Appointment";

pub const PULL_FIELDS: FieldMap = FieldMap::new(&[
    FieldRule::text(LocalField::RemoteId, "id"),
    FieldRule::text(LocalField::Subject, "title"),
    FieldRule::timestamp(LocalField::StartsOn, "startTime"),
    FieldRule::timestamp(LocalField::EndsOn, "endTime"),
    FieldRule::text(LocalField::Description, "notes"),
    FieldRule::text(LocalField::ContactRef, "contactId"),
]);

pub const PUSH_FIELDS: FieldMap = FieldMap::new(&[
    FieldRule::text(LocalField::Subject, "title").required(),
    FieldRule::timestamp(LocalField::StartsOn, "startTime").required(),
    FieldRule::timestamp(LocalField::EndsOn, "endTime").required(),
    FieldRule::text(LocalField::Description, "notes"),
]);

/// REST paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketingEndpoints {
    pub calendar: String,
    pub events: String,
    pub appointments: String,
    pub appointment: String,
    pub event: String,
    pub contacts: String,
    pub contact: String,
}

impl Default for MarketingEndpoints {
    fn default() -> Self {
        Self {
            calendar: "/calendars/{id}".into(),
            events: "/calendars/events".into(),
            appointments: "/calendars/events/appointments".into(),
            appointment: "/calendars/events/appointments/{id}".into(),
            event: "/calendars/events/{id}".into(),
            contacts: "/contacts/".into(),
            contact: "/contacts/{id}".into(),
        }
    }
}
