//! CRM meetings provider configuration.

use crate::http::SuccessCodes;
use crate::mapping::{FieldMap, FieldRule, LocalField};

pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";

pub const SUCCESS_CODES: SuccessCodes = SuccessCodes::new(&[200, 201, 204]);

/// Meeting properties requested on list and get.
pub const MEETING_PROPERTIES: &str =
    "hs_meeting_title,hs_meeting_start_time,hs_meeting_end_time,hs_meeting_body";

pub const CONTACT_PROPERTIES: &str = "firstname,lastname,email";

pub const PAGE_SIZE: usize = 100;

/// Association type id for meeting → contact.
pub const MEETING_TO_CONTACT: u32 = 200;

pub const DEFAULT_SUBJECT: &str = "Meeting";

pub const PULL_FIELDS: FieldMap = FieldMap::new(&[
    FieldRule::text(LocalField::RemoteId, "id"),
    FieldRule::text(LocalField::Subject, "properties.hs_meeting_title"),
    FieldRule::timestamp(LocalField::StartsOn, "properties.hs_meeting_start_time"),
    FieldRule::timestamp(LocalField::EndsOn, "properties.hs_meeting_end_time"),
    FieldRule::text(LocalField::Description, "properties.hs_meeting_body"),
]);

pub const PUSH_FIELDS: FieldMap = FieldMap::new(&[
    FieldRule::text(LocalField::Subject, "properties.hs_meeting_title").required(),
    FieldRule::timestamp(LocalField::StartsOn, "properties.hs_meeting_start_time").required(),
    FieldRule::timestamp(LocalField::EndsOn, "properties.hs_meeting_end_time").required(),
    FieldRule::timestamp(LocalField::StartsOn, "properties.hs_timestamp").required(),
    FieldRule::text(LocalField::Description, "properties.hs_meeting_body"),
]);

/// REST paths, relative to the base URL. `{id}` is substituted per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmEndpoints {
    pub meetings: String,
    pub meeting: String,
    pub meeting_contacts: String,
    pub contacts: String,
    pub contact: String,
    pub contact_search: String,
}

impl Default for CrmEndpoints {
    fn default() -> Self {
        Self {
            meetings: "/crm/v3/objects/meetings".into(),
            meeting: "/crm/v3/objects/meetings/{id}".into(),
            meeting_contacts: "/crm/v3/objects/meetings/{id}/associations/contact".into(),
            contacts: "/crm/v3/objects/contacts".into(),
            contact: "/crm/v3/objects/contacts/{id}".into(),
            contact_search: "/crm/v3/objects/contacts/search".into(),
        }
    }
}
