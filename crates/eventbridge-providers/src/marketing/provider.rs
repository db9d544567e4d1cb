//! Marketing calendar adapter.
//!
//! Appointments belong to a calendar inside a location (sub-account). Every
//! appointment carries exactly one contact, correlated by phone number. The
//! user the calendar is assigned to owns created appointments and contacts.

use chrono::FixedOffset;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use eventbridge_core::{
    CalendarLink, ContactKey, ContactKeyKind, Direction, Event, ProviderKind, TimeRange,
};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{ApiClient, ApiRequest, Credential, HttpSettings, decode, fill_template, id_at};
use crate::mapping::{LocalFields, TimestampStyle, lookup_path};
use crate::provider::{
    Attendees, BoxFuture, ContactCache, ContactFields, CycleContext, PayloadIntent,
    ProviderAdapter, RemoteContact, RemotePage, RemotePayload, RemoteRecord,
};

use super::config::{
    CALENDAR_API_VERSION, CONTACT_PAGE_SIZE, CONTACTS_API_VERSION, DEFAULT_BASE_URL,
    DEFAULT_SUBJECT, MAX_CONTACT_PAGES, MarketingEndpoints, PULL_FIELDS, PUSH_FIELDS,
    SUCCESS_CODES,
};

const PROVIDER: &str = "marketing-calendar";

#[derive(Debug, Deserialize)]
struct CalendarEnvelope {
    calendar: CalendarInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarInfo {
    #[serde(default)]
    team_members: Vec<TeamMember>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamMember {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    events: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ContactList {
    #[serde(default)]
    contacts: Vec<ContactObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactObject {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    assigned_to: Option<String>,
}

impl From<ContactObject> for RemoteContact {
    fn from(object: ContactObject) -> Self {
        Self {
            id: object.id,
            email: object.email,
            first_name: object.first_name,
            last_name: object.last_name,
            phone: object.phone,
            assigned_to: object.assigned_to,
        }
    }
}

/// Adapter for the marketing calendar API.
#[derive(Debug, Clone)]
pub struct MarketingProvider {
    api: ApiClient,
    endpoints: MarketingEndpoints,
    offset: FixedOffset,
    calendar_id: String,
    location_id: String,
}

impl MarketingProvider {
    /// Builds an adapter for `link`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the link has no location, or for an
    /// invalid base URL or offset.
    pub fn new(link: &CalendarLink, settings: &HttpSettings) -> ProviderResult<Self> {
        let location_id = link
            .location_id
            .clone()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::configuration(format!("calendar `{}` has no location_id", link.id))
                    .with_provider(PROVIDER)
            })?;
        let base_url = link.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let api = ApiClient::new(
            PROVIDER,
            base_url,
            Credential::Bearer(link.access_token.clone()),
            SUCCESS_CODES,
            settings,
        )?
        .with_default_header("Version", CALENDAR_API_VERSION);
        let offset = link.offset().map_err(|e| {
            ProviderError::configuration(e.to_string()).with_provider(PROVIDER)
        })?;

        Ok(Self {
            api,
            endpoints: MarketingEndpoints::default(),
            offset,
            calendar_id: link.remote_calendar_id.clone(),
            location_id,
        })
    }

    pub fn with_endpoints(mut self, endpoints: MarketingEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn appointment_path(&self, id: &str) -> String {
        fill_template(&self.endpoints.appointment, &[("id", id)])
    }

    /// User the calendar is assigned to.
    async fn calendar_owner(&self) -> ProviderResult<String> {
        let path = fill_template(&self.endpoints.calendar, &[("id", &self.calendar_id)]);
        let envelope: CalendarEnvelope =
            decode(PROVIDER, self.api.send(ApiRequest::get(path)).await?)?;
        envelope
            .calendar
            .team_members
            .into_iter()
            .next()
            .and_then(|m| m.user_id)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::configuration(format!(
                    "calendar {} has no assigned user",
                    self.calendar_id
                ))
                .with_provider(PROVIDER)
            })
    }

    /// Every contact assigned to `owner`, page by page.
    ///
    /// Stops after [`MAX_CONTACT_PAGES`] pages for APIs that ignore `page`.
    async fn fetch_contacts(&self, owner: &str) -> ProviderResult<Vec<RemoteContact>> {
        let mut contacts = Vec::new();
        let mut page = 1usize;
        loop {
            let request = ApiRequest::get(self.endpoints.contacts.as_str())
                .with_header("Version", CONTACTS_API_VERSION)
                .with_query("locationId", &self.location_id)
                .with_query("assignedTo", owner)
                .with_query("limit", CONTACT_PAGE_SIZE)
                .with_query("page", page);
            let list: ContactList = decode(PROVIDER, self.api.send(request).await?)?;
            let received = list.contacts.len();
            contacts.extend(list.contacts.into_iter().map(RemoteContact::from));

            if received < CONTACT_PAGE_SIZE {
                break;
            }
            if page >= MAX_CONTACT_PAGES {
                warn!(pages = page, contacts = contacts.len(), "contact page limit reached");
                break;
            }
            page += 1;
        }
        debug!(contacts = contacts.len(), pages = page, "fetched contacts");
        Ok(contacts)
    }

    /// Contacts assigned to `owner` that have a phone number.
    async fn prefetch_contacts(&self, owner: &str) -> ProviderResult<ContactCache> {
        Ok(self
            .fetch_contacts(owner)
            .await?
            .into_iter()
            .filter(|c| c.phone.as_deref().is_some_and(|p| !p.trim().is_empty()))
            .collect())
    }

    async fn owner_contacts(&self) -> ProviderResult<Vec<RemoteContact>> {
        let owner = self.calendar_owner().await?;
        self.fetch_contacts(&owner).await
    }

    async fn start_cycle(&self, direction: Direction) -> ProviderResult<CycleContext> {
        let owner = self.calendar_owner().await?;
        let mut ctx = CycleContext::with_owner(Some(owner.clone()));
        if direction == Direction::Pull {
            ctx.contacts = self.prefetch_contacts(&owner).await?;
        }
        info!(calendar = %self.calendar_id, %owner, %direction, "cycle started");
        Ok(ctx)
    }

    async fn list_events(&self, range: &TimeRange) -> ProviderResult<RemotePage> {
        let request = ApiRequest::get(self.endpoints.events.as_str())
            .with_query("locationId", &self.location_id)
            .with_query("calendarId", &self.calendar_id)
            .with_query("startTime", range.start_millis())
            .with_query("endTime", range.end_millis());
        let list: EventList = decode(PROVIDER, self.api.send(request).await?)?;
        Ok(RemotePage {
            records: list.events.into_iter().map(RemoteRecord).collect(),
            next_cursor: None,
        })
    }

    async fn get_appointment(&self, id: &str) -> ProviderResult<Option<RemoteRecord>> {
        let Some(body) = self
            .api
            .send_optional(ApiRequest::get(self.appointment_path(id)))
            .await?
        else {
            return Ok(None);
        };
        let record = match lookup_path(&body, "appointment") {
            Some(inner) => inner.clone(),
            None => body,
        };
        Ok(Some(RemoteRecord(record)))
    }

    async fn create_appointment(&self, payload: &RemotePayload) -> ProviderResult<String> {
        let body = self
            .api
            .send(ApiRequest::post(
                self.endpoints.appointments.as_str(),
                payload.json(),
            ))
            .await?;
        id_at(&body, "id")
            .or_else(|| id_at(&body, "appointment.id"))
            .ok_or_else(|| {
                ProviderError::invalid_response("created appointment has no id")
                    .with_provider(PROVIDER)
            })
    }

    async fn update_appointment(&self, id: &str, payload: &RemotePayload) -> ProviderResult<()> {
        self.api
            .send(ApiRequest::put(self.appointment_path(id), payload.json()))
            .await?;
        Ok(())
    }

    async fn delete_event(&self, id: &str) -> ProviderResult<()> {
        let path = fill_template(&self.endpoints.event, &[("id", id)]);
        self.api.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    async fn search_contacts(&self, key: &ContactKey) -> ProviderResult<Vec<RemoteContact>> {
        let request = ApiRequest::get(self.endpoints.contacts.as_str())
            .with_header("Version", CONTACTS_API_VERSION)
            .with_query("query", key.value())
            .with_query("locationId", &self.location_id);
        let list: ContactList = decode(PROVIDER, self.api.send(request).await?)?;
        Ok(list.contacts.into_iter().map(RemoteContact::from).collect())
    }

    fn assignee<'a>(fields: &'a ContactFields, ctx: &'a CycleContext) -> Option<&'a str> {
        fields
            .owner_id
            .as_deref()
            .or(ctx.owner_id.as_deref())
    }

    async fn post_contact(
        &self,
        fields: &ContactFields,
        ctx: &CycleContext,
    ) -> ProviderResult<String> {
        let body = json!({
            "firstName": fields.first_name,
            "phone": fields.phone,
            "locationId": self.location_id,
            "assignedTo": Self::assignee(fields, ctx),
        });
        let answer = self
            .api
            .send(
                ApiRequest::post(self.endpoints.contacts.as_str(), &body)
                    .with_header("Version", CONTACTS_API_VERSION),
            )
            .await?;
        id_at(&answer, "contact.id").ok_or_else(|| {
            ProviderError::invalid_response("created contact has no id").with_provider(PROVIDER)
        })
    }

    async fn put_contact(
        &self,
        id: &str,
        fields: &ContactFields,
        ctx: &CycleContext,
    ) -> ProviderResult<()> {
        let body = json!({
            "firstName": fields.first_name,
            "phone": fields.phone,
            "assignedTo": Self::assignee(fields, ctx),
        });
        let path = fill_template(&self.endpoints.contact, &[("id", id)]);
        self.api
            .send(ApiRequest::put(path, &body).with_header("Version", CONTACTS_API_VERSION))
            .await?;
        Ok(())
    }
}

impl ProviderAdapter for MarketingProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MarketingCalendar
    }

    fn begin_cycle(&self, direction: Direction) -> BoxFuture<'_, ProviderResult<CycleContext>> {
        Box::pin(self.start_cycle(direction))
    }

    fn list_remote_events<'a>(
        &'a self,
        range: &'a TimeRange,
        _cursor: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<RemotePage>> {
        Box::pin(self.list_events(range))
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
        Box::pin(self.delete_event(id))
    }

    fn contact_key_kind(&self) -> Option<ContactKeyKind> {
        Some(ContactKeyKind::Phone)
    }

    fn find_contacts<'a>(
        &'a self,
        key: &'a ContactKey,
        _ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<Vec<RemoteContact>>> {
        Box::pin(self.search_contacts(key))
    }

    fn create_contact<'a>(
        &'a self,
        fields: &'a ContactFields,
        ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(self.post_contact(fields, ctx))
    }

    fn update_contact<'a>(
        &'a self,
        id: &'a str,
        fields: &'a ContactFields,
        ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.put_contact(id, fields, ctx))
    }

    fn list_remote_contacts(&self) -> BoxFuture<'_, ProviderResult<Vec<RemoteContact>>> {
        Box::pin(self.owner_contacts())
    }

    fn refreshes_matched_contacts(&self) -> bool {
        true
    }

    fn record_attendees<'a>(
        &'a self,
        record: &'a RemoteRecord,
        ctx: &'a mut CycleContext,
    ) -> BoxFuture<'a, ProviderResult<Attendees>> {
        Box::pin(async move {
            let attendees = id_at(record.json(), "contactId")
                .and_then(|id| ctx.contacts.get(&id).cloned())
                .map_or(Attendees::Unknown, |c| Attendees::Known(vec![c]));
            Ok(attendees)
        })
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
        attendee_ids: &[String],
        intent: PayloadIntent,
        ctx: &CycleContext,
    ) -> ProviderResult<RemotePayload> {
        let contact_id = attendee_ids.first().ok_or_else(|| {
            ProviderError::mapping(format!("event {} has no resolved contact", event.id))
                .with_provider(PROVIDER)
        })?;

        let mut fields = LocalFields::from_event(event, &self.calendar_id)
            .map_err(|e| e.with_provider(PROVIDER))?;
        let title = fields
            .subject
            .as_deref()
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        fields.subject = Some(title);

        let mut body: Map<String, Value> = PUSH_FIELDS
            .to_remote(&fields, TimestampStyle::OffsetSuffix, &self.offset)
            .map_err(|e| e.with_provider(PROVIDER))?;

        body.insert("calendarId".into(), json!(self.calendar_id));
        body.insert("locationId".into(), json!(self.location_id));
        body.insert("contactId".into(), json!(contact_id));
        if let Some(owner) = &ctx.owner_id {
            body.insert("assignedUserId".into(), json!(owner));
        }
        match intent {
            PayloadIntent::Create => {
                body.insert("appointmentStatus".into(), json!("new"));
                body.insert("ignoreFreeSlotValidation".into(), json!(true));
            }
            PayloadIntent::Update => {
                body.insert("appointmentStatus".into(), json!("confirmed"));
            }
        }

        Ok(RemotePayload(Value::Object(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn link(server: &MockServer) -> CalendarLink {
        CalendarLink::new("mkt", ProviderKind::MarketingCalendar, "cal-9", "token")
            .with_location("loc-1")
            .with_base_url(server.uri())
    }

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    async fn mount_calendar(server: &MockServer, members: Value) {
        Mock::given(method("GET"))
            .and(path("/calendars/cal-9"))
            .and(header("version", CALENDAR_API_VERSION))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"calendar": {"teamMembers": members}})),
            )
            .mount(server)
            .await;
    }

    fn contact(i: usize, phone: Option<&str>) -> Value {
        json!({"id": format!("c-{}", i), "firstName": "Ana", "phone": phone})
    }

    #[test]
    fn requires_location() {
        let link = CalendarLink::new("mkt", ProviderKind::MarketingCalendar, "cal-9", "token");
        let err = MarketingProvider::new(&link, &HttpSettings::default()).unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn pull_cycle_prefetches_contacts_with_phone() {
        let server = MockServer::start().await;
        mount_calendar(&server, json!([{"userId": "user-1"}])).await;

        let full: Vec<Value> = (0..100)
            .map(|i| contact(i, if i % 2 == 0 { Some("+1 555 0100") } else { None }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/contacts/"))
            .and(query_param("page", "1"))
            .and(query_param("assignedTo", "user-1"))
            .and(header("version", CONTACTS_API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contacts": full})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/contacts/"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"contacts": [contact(500, Some("300 1234567"))]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let adapter = MarketingProvider::new(&link(&server), &HttpSettings::default()).unwrap();
        let ctx = adapter.begin_cycle(Direction::Pull).await.unwrap();
        assert_eq!(ctx.owner_id.as_deref(), Some("user-1"));
        assert_eq!(ctx.contacts.len(), 51);
    }

    #[tokio::test]
    async fn contact_listing_keeps_contacts_without_phone() {
        let server = MockServer::start().await;
        mount_calendar(&server, json!([{"userId": "user-1"}])).await;
        Mock::given(method("GET"))
            .and(path("/contacts/"))
            .and(query_param("assignedTo", "user-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contacts": [contact(1, Some("300 1234567")), contact(2, None)]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = MarketingProvider::new(&link(&server), &HttpSettings::default()).unwrap();
        let contacts = adapter.list_remote_contacts().await.unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[1].phone, None);
    }

    #[tokio::test]
    async fn contact_paging_stops_when_page_is_ignored() {
        let server = MockServer::start().await;
        mount_calendar(&server, json!([{"userId": "user-1"}])).await;
        let full: Vec<Value> = (0..CONTACT_PAGE_SIZE)
            .map(|i| contact(i, Some("+1 555 0100")))
            .collect();
        Mock::given(method("GET"))
            .and(path("/contacts/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contacts": full})))
            .expect(MAX_CONTACT_PAGES as u64)
            .mount(&server)
            .await;

        let adapter = MarketingProvider::new(&link(&server), &HttpSettings::default()).unwrap();
        let contacts = adapter.list_remote_contacts().await.unwrap();
        assert_eq!(contacts.len(), CONTACT_PAGE_SIZE * MAX_CONTACT_PAGES);
    }

    #[tokio::test]
    async fn missing_assigned_user_is_fatal() {
        let server = MockServer::start().await;
        mount_calendar(&server, json!([])).await;

        let adapter = MarketingProvider::new(&link(&server), &HttpSettings::default()).unwrap();
        let err = adapter.begin_cycle(Direction::Push).await.unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn lists_events_in_window() {
        let server = MockServer::start().await;
        let range = TimeRange::sync_window(chrono::Utc::now());
        Mock::given(method("GET"))
            .and(path("/calendars/events"))
            .and(query_param("calendarId", "cal-9"))
            .and(query_param("locationId", "loc-1"))
            .and(query_param("startTime", range.start_millis().to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [{"id": "a1", "title": "Visit", "startTime": "2024-03-01T09:00:00-05:00"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = MarketingProvider::new(&link(&server), &HttpSettings::default()).unwrap();
        let page = adapter.list_remote_events(&range, None).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(page.next_cursor.is_none());

        let fields = adapter.map_in(&page.records[0]).unwrap();
        assert_eq!(fields.starts_on, Some(start()));
    }

    #[tokio::test]
    async fn create_reads_nested_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/events/appointments"))
            .and(body_partial_json(json!({
                "title": "Follow up call",
                "startTime": "2024-03-01T09:00:00-05:00",
                "endTime": "2024-03-01T09:30:00-05:00",
                "contactId": "c-1",
                "appointmentStatus": "new",
                "ignoreFreeSlotValidation": true
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"appointment": {"id": "ap-3"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let adapter = MarketingProvider::new(&link(&server), &HttpSettings::default()).unwrap();
        let event = Event::new("e1", "  Follow   up\ncall ", start());
        let payload = adapter
            .map_out(
                &event,
                &["c-1".to_string()],
                PayloadIntent::Create,
                &CycleContext::with_owner(Some("user-1".into())),
            )
            .unwrap();
        assert_eq!(payload.json()["assignedUserId"], "user-1");
        assert_eq!(adapter.create_remote_event(&payload).await.unwrap(), "ap-3");
    }

    #[test]
    fn update_payload_is_confirmed() {
        let link = CalendarLink::new("mkt", ProviderKind::MarketingCalendar, "cal-9", "token")
            .with_location("loc-1");
        let adapter = MarketingProvider::new(&link, &HttpSettings::default()).unwrap();
        let event = Event::new("e1", "Visit", start());
        let payload = adapter
            .map_out(
                &event,
                &["c-1".to_string()],
                PayloadIntent::Update,
                &CycleContext::default(),
            )
            .unwrap();
        let json = payload.json();
        assert_eq!(json["appointmentStatus"], "confirmed");
        assert!(json.get("ignoreFreeSlotValidation").is_none());

        let err = adapter
            .map_out(&event, &[], PayloadIntent::Update, &CycleContext::default())
            .unwrap_err();
        assert_eq!(err.code(), crate::ProviderErrorCode::MappingFailed);
    }

    #[tokio::test]
    async fn attendees_come_from_cache() {
        let link = CalendarLink::new("mkt", ProviderKind::MarketingCalendar, "cal-9", "token")
            .with_location("loc-1");
        let adapter = MarketingProvider::new(&link, &HttpSettings::default()).unwrap();
        let mut ctx = CycleContext::default();
        ctx.contacts.insert(RemoteContact {
            phone: Some("+15550100".into()),
            ..RemoteContact::new("c-1")
        });

        let known = RemoteRecord(json!({"id": "a1", "contactId": "c-1"}));
        let unknown = RemoteRecord(json!({"id": "a2", "contactId": "c-2"}));
        assert!(matches!(
            adapter.record_attendees(&known, &mut ctx).await.unwrap(),
            Attendees::Known(ref c) if c.len() == 1
        ));
        assert_eq!(
            adapter.record_attendees(&unknown, &mut ctx).await.unwrap(),
            Attendees::Unknown
        );
    }

    #[tokio::test]
    async fn contact_create_and_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contacts/"))
            .and(body_partial_json(json!({
                "firstName": "Ana",
                "phone": "+15550100",
                "locationId": "loc-1",
                "assignedTo": "user-1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"contact": {"id": "c-7"}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/contacts/c-7"))
            .and(body_partial_json(json!({"assignedTo": "user-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"succeded": true})))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = MarketingProvider::new(&link(&server), &HttpSettings::default()).unwrap();
        let ctx = CycleContext::with_owner(Some("user-1".into()));
        let fields = ContactFields {
            first_name: "Ana".into(),
            last_name: "X".into(),
            email: None,
            phone: Some("+15550100".into()),
            owner_id: None,
        };
        let id = adapter.create_contact(&fields, &ctx).await.unwrap();
        assert_eq!(id, "c-7");
        adapter.update_contact(&id, &fields, &ctx).await.unwrap();
    }
}
