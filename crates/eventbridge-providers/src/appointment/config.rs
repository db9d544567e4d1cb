//! Appointment API configuration.

use crate::http::SuccessCodes;
use crate::mapping::{FieldMap, FieldRule, LocalField};

pub const DEFAULT_BASE_URL: &str = "https://goujana.co";

pub const SUCCESS_CODES: SuccessCodes = SuccessCodes::new(&[200, 201, 204]);

pub const TOKEN_HEADER: &str = "X-API-TOKEN";

pub const DEFAULT_SUBJECT: &str = "Appointment";

pub const PULL_FIELDS: FieldMap = FieldMap::new(&[
    FieldRule::text(LocalField::RemoteId, "id"),
    FieldRule::text(LocalField::Subject, "text"),
    FieldRule::text(LocalField::Description, "observations"),
    FieldRule::timestamp(LocalField::StartsOn, "start_date"),
    FieldRule::timestamp(LocalField::EndsOn, "end_date"),
    FieldRule::text(LocalField::CustomerRef, "customer.id"),
    FieldRule::text(LocalField::CalendarRef, "calendar.id"),
]);

pub const PUSH_FIELDS: FieldMap = FieldMap::new(&[
    FieldRule::text(LocalField::Subject, "text").required(),
    FieldRule::text(LocalField::Description, "observations"),
    FieldRule::timestamp(LocalField::StartsOn, "start_date").required(),
    FieldRule::timestamp(LocalField::EndsOn, "end_date").required(),
    FieldRule::text(LocalField::CustomerRef, "customer").required(),
    FieldRule::text(LocalField::CalendarRef, "calendar").required(),
]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentEndpoints {
    pub appointments: String,
    pub appointment: String,
}

impl Default for AppointmentEndpoints {
    fn default() -> Self {
        Self {
            appointments: "/api/v1/schedule/appointment/".into(),
            appointment: "/api/v1/schedule/appointment/{id}/".into(),
        }
    }
}
