//! Appointment API adapter.
//!
//! Appointments reference a customer and a calendar by id and have no
//! attendee list, so contact resolution does not apply.

use chrono::FixedOffset;
use serde::Deserialize;
use serde_json::Value;

use eventbridge_core::{
    CalendarLink, ContactKey, ContactKeyKind, Direction, Event, ProviderKind, TimeRange,
};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{ApiClient, ApiRequest, Credential, HttpSettings, decode, fill_template, id_at};
use crate::mapping::{LocalFields, TimestampStyle};
use crate::provider::{
    Attendees, BoxFuture, ContactFields, CycleContext, PayloadIntent, ProviderAdapter,
    RemoteContact, RemotePage, RemotePayload, RemoteRecord, contacts_unsupported,
};

use super::config::{
    AppointmentEndpoints, DEFAULT_BASE_URL, DEFAULT_SUBJECT, PULL_FIELDS, PUSH_FIELDS,
    SUCCESS_CODES, TOKEN_HEADER,
};

const PROVIDER: &str = "appointment-api";

/// Either a paginated envelope or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AppointmentList {
    Plain(Vec<Value>),
    Paged {
        #[serde(default)]
        results: Vec<Value>,
        next: Option<String>,
    },
}

/// Adapter for the appointment scheduling API.
#[derive(Debug, Clone)]
pub struct AppointmentProvider {
    api: ApiClient,
    endpoints: AppointmentEndpoints,
    offset: FixedOffset,
    calendar_id: String,
}

impl AppointmentProvider {
    /// Builds an adapter for `link`. The session cookie, when set, is sent
    /// with every request.
    pub fn new(link: &CalendarLink, settings: &HttpSettings) -> ProviderResult<Self> {
        let base_url = link.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let mut api = ApiClient::new(
            PROVIDER,
            base_url,
            Credential::Header {
                name: TOKEN_HEADER,
                token: link.access_token.clone(),
            },
            SUCCESS_CODES,
            settings,
        )?;
        if let Some(cookie) = link.session_cookie.as_deref().filter(|c| !c.trim().is_empty()) {
            api = api.with_default_header("Cookie", cookie);
        }
        let offset = link.offset().map_err(|e| {
            ProviderError::configuration(e.to_string()).with_provider(PROVIDER)
        })?;

        Ok(Self {
            api,
            endpoints: AppointmentEndpoints::default(),
            offset,
            calendar_id: link.remote_calendar_id.clone(),
        })
    }

    pub fn with_endpoints(mut self, endpoints: AppointmentEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn appointment_path(&self, id: &str) -> String {
        fill_template(&self.endpoints.appointment, &[("id", id)])
    }

    async fn list_page(&self, cursor: Option<&str>) -> ProviderResult<RemotePage> {
        let path = cursor.unwrap_or(self.endpoints.appointments.as_str());
        let list: AppointmentList =
            decode(PROVIDER, self.api.send(ApiRequest::get(path)).await?)?;
        let (records, next_cursor) = match list {
            AppointmentList::Plain(records) => (records, None),
            AppointmentList::Paged { results, next } => {
                (results, next.filter(|n| !n.trim().is_empty()))
            }
        };
        Ok(RemotePage {
            records: records.into_iter().map(RemoteRecord).collect(),
            next_cursor,
        })
    }

    async fn get_appointment(&self, id: &str) -> ProviderResult<Option<RemoteRecord>> {
        Ok(self
            .api
            .send_optional(ApiRequest::get(self.appointment_path(id)))
            .await?
            .map(RemoteRecord))
    }

    async fn create_appointment(&self, payload: &RemotePayload) -> ProviderResult<String> {
        let body = self
            .api
            .send(ApiRequest::post(
                self.endpoints.appointments.as_str(),
                payload.json(),
            ))
            .await?;
        id_at(&body, "id").ok_or_else(|| {
            ProviderError::invalid_response("created appointment has no id")
                .with_provider(PROVIDER)
        })
    }

    async fn update_appointment(&self, id: &str, payload: &RemotePayload) -> ProviderResult<()> {
        self.api
            .send(ApiRequest::patch(self.appointment_path(id), payload.json()))
            .await?;
        Ok(())
    }

    async fn delete_appointment(&self, id: &str) -> ProviderResult<()> {
        self.api
            .send(ApiRequest::delete(self.appointment_path(id)))
            .await?;
        Ok(())
    }
}

impl ProviderAdapter for AppointmentProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AppointmentApi
    }

    fn begin_cycle(&self, _direction: Direction) -> BoxFuture<'_, ProviderResult<CycleContext>> {
        Box::pin(async { Ok(CycleContext::default()) })
    }

    // No server-side date filter; records are paged by absolute `next` URLs.
    fn list_remote_events<'a>(
        &'a self,
        _range: &'a TimeRange,
        cursor: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<RemotePage>> {
        Box::pin(self.list_page(cursor))
    }

    fn get_remote_event<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Option<RemoteRecord>>> {
        Box::pin(self.get_appointment(id))
    }

    fn create_remote_event<'a>(
        &'a self,
        payload: &'a RemotePayload,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(self.create_appointment(payload))
    }

    fn update_remote_event<'a>(
        &'a self,
        id: &'a str,
        payload: &'a RemotePayload,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.update_appointment(id, payload))
    }

    fn delete_remote_event<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.delete_appointment(id))
    }

    fn contact_key_kind(&self) -> Option<ContactKeyKind> {
        None
    }

    fn find_contacts<'a>(
        &'a self,
        _key: &'a ContactKey,
        _ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<Vec<RemoteContact>>> {
        Box::pin(async { Err(contacts_unsupported(self.kind())) })
    }

    fn create_contact<'a>(
        &'a self,
        _fields: &'a ContactFields,
        _ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async { Err(contacts_unsupported(self.kind())) })
    }

    fn update_contact<'a>(
        &'a self,
        _id: &'a str,
        _fields: &'a ContactFields,
        _ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async { Err(contacts_unsupported(self.kind())) })
    }

    fn requires_attendees(&self) -> bool {
        false
    }

    fn record_attendees<'a>(
        &'a self,
        _record: &'a RemoteRecord,
        _ctx: &'a mut CycleContext,
    ) -> BoxFuture<'a, ProviderResult<Attendees>> {
        Box::pin(async { Ok(Attendees::Unknown) })
    }

    fn map_in(&self, record: &RemoteRecord) -> ProviderResult<LocalFields> {
        PULL_FIELDS
            .to_local(record.json(), &self.offset)
            .finish_pull(DEFAULT_SUBJECT)
            .map_err(|e| e.with_provider(PROVIDER))
    }

    fn map_out(
        &self,
        event: &Event,
        _attendee_ids: &[String],
        _intent: PayloadIntent,
        _ctx: &CycleContext,
    ) -> ProviderResult<RemotePayload> {
        let fields = LocalFields::from_event(event, &self.calendar_id)
            .map_err(|e| e.with_provider(PROVIDER))?;
        let body = PUSH_FIELDS
            .to_remote(&fields, TimestampStyle::Zulu, &self.offset)
            .map_err(|e| e.with_provider(PROVIDER))?;
        Ok(RemotePayload(Value::Object(body)))
    }
}
