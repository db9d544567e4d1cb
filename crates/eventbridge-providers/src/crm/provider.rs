//! CRM meetings adapter.
//!
//! Meetings live under the CRM object API and are linked to contacts through
//! associations. Contacts are correlated by email.

use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use eventbridge_core::{
    CalendarLink, ContactKey, ContactKeyKind, Direction, Event, ProviderKind, TimeRange,
};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{ApiClient, ApiRequest, Credential, HttpSettings, decode, fill_template, id_at};
use crate::mapping::{LocalFields, TimestampStyle, value_to_text};
use crate::provider::{
    Attendees, BoxFuture, ContactFields, CycleContext, PayloadIntent, ProviderAdapter,
    RemoteContact, RemotePage, RemotePayload, RemoteRecord,
};

use super::config::{
    CONTACT_PROPERTIES, CrmEndpoints, DEFAULT_BASE_URL, DEFAULT_SUBJECT, MEETING_PROPERTIES,
    MEETING_TO_CONTACT, PAGE_SIZE, PULL_FIELDS, PUSH_FIELDS, SUCCESS_CODES,
};

const PROVIDER: &str = "crm-meetings";

#[derive(Debug, Deserialize)]
struct MeetingList {
    #[serde(default)]
    results: Vec<Value>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<PagingNext>,
}

#[derive(Debug, Deserialize)]
struct PagingNext {
    after: String,
}

#[derive(Debug, Deserialize)]
struct AssociationList {
    #[serde(default)]
    results: Vec<AssociationRef>,
}

#[derive(Debug, Deserialize)]
struct AssociationRef {
    #[serde(alias = "toObjectId")]
    id: Value,
}

#[derive(Debug, Deserialize)]
struct ContactObject {
    id: String,
    #[serde(default)]
    properties: ContactProperties,
}

#[derive(Debug, Default, Deserialize)]
struct ContactProperties {
    email: Option<String>,
    firstname: Option<String>,
    lastname: Option<String>,
    hubspot_owner_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContactSearch {
    #[serde(default)]
    results: Vec<ContactObject>,
}

impl From<ContactObject> for RemoteContact {
    fn from(object: ContactObject) -> Self {
        Self {
            id: object.id,
            email: object.properties.email,
            first_name: object.properties.firstname,
            last_name: object.properties.lastname,
            phone: None,
            assigned_to: object.properties.hubspot_owner_id,
        }
    }
}

/// Adapter for the CRM meetings API.
#[derive(Debug, Clone)]
pub struct CrmProvider {
    api: ApiClient,
    endpoints: CrmEndpoints,
    offset: FixedOffset,
    owner_id: Option<String>,
    detail_delay: Duration,
}

impl CrmProvider {
    /// Builds an adapter for `link`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid base URL or offset.
    pub fn new(link: &CalendarLink, settings: &HttpSettings) -> ProviderResult<Self> {
        let base_url = link.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let api = ApiClient::new(
            PROVIDER,
            base_url,
            Credential::Bearer(link.access_token.clone()),
            SUCCESS_CODES,
            settings,
        )?;
        let offset = link.offset().map_err(|e| {
            ProviderError::configuration(e.to_string()).with_provider(PROVIDER)
        })?;

        Ok(Self {
            api,
            endpoints: CrmEndpoints::default(),
            offset,
            owner_id: link.owner_id.clone(),
            detail_delay: settings.detail_delay,
        })
    }

    pub fn with_endpoints(mut self, endpoints: CrmEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn meeting_path(&self, id: &str) -> String {
        fill_template(&self.endpoints.meeting, &[("id", id)])
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_page(&self, cursor: Option<&str>) -> ProviderResult<RemotePage> {
        let mut request = ApiRequest::get(self.endpoints.meetings.as_str())
            .with_query("properties", MEETING_PROPERTIES)
            .with_query("limit", PAGE_SIZE);
        if let Some(after) = cursor {
            request = request.with_query("after", after);
        }

        let list: MeetingList = decode(PROVIDER, self.api.send(request).await?)?;
        Ok(RemotePage {
            records: list.results.into_iter().map(RemoteRecord).collect(),
            next_cursor: list.paging.and_then(|p| p.next).map(|n| n.after),
        })
    }

    async fn get_meeting(&self, id: &str) -> ProviderResult<Option<RemoteRecord>> {
        let request =
            ApiRequest::get(self.meeting_path(id)).with_query("properties", MEETING_PROPERTIES);
        Ok(self.api.send_optional(request).await?.map(RemoteRecord))
    }

    async fn create_meeting(&self, payload: &RemotePayload) -> ProviderResult<String> {
        let body = self
            .api
            .send(ApiRequest::post(self.endpoints.meetings.as_str(), payload.json()))
            .await?;
        id_at(&body, "id").ok_or_else(|| {
            ProviderError::invalid_response("created meeting has no id").with_provider(PROVIDER)
        })
    }

    async fn update_meeting(&self, id: &str, payload: &RemotePayload) -> ProviderResult<()> {
        self.api
            .send(ApiRequest::patch(self.meeting_path(id), payload.json()))
            .await?;
        Ok(())
    }

    async fn delete_meeting(&self, id: &str) -> ProviderResult<()> {
        self.api.send(ApiRequest::delete(self.meeting_path(id))).await?;
        Ok(())
    }

    async fn fetch_contact(&self, id: &str) -> ProviderResult<RemoteContact> {
        let path = fill_template(&self.endpoints.contact, &[("id", id)]);
        let request = ApiRequest::get(path).with_query("properties", CONTACT_PROPERTIES);
        let object: ContactObject = decode(PROVIDER, self.api.send(request).await?)?;
        Ok(object.into())
    }

    async fn search_contacts(&self, key: &ContactKey) -> ProviderResult<Vec<RemoteContact>> {
        let ContactKey::Email(email) = key else {
            return Ok(Vec::new());
        };
        let body = json!({
            "filterGroups": [{
                "filters": [{"propertyName": "email", "operator": "EQ", "value": email}]
            }],
            "properties": CONTACT_PROPERTIES.split(',').collect::<Vec<_>>(),
        });
        let found: ContactSearch = decode(
            PROVIDER,
            self.api
                .send(ApiRequest::post(self.endpoints.contact_search.as_str(), &body))
                .await?,
        )?;
        Ok(found.results.into_iter().map(RemoteContact::from).collect())
    }

    fn contact_body(fields: &ContactFields, with_email: bool) -> Value {
        let mut properties = Map::new();
        if with_email {
            if let Some(email) = &fields.email {
                properties.insert("email".into(), json!(email));
            }
        }
        properties.insert("firstname".into(), json!(fields.first_name));
        properties.insert("lastname".into(), json!(fields.last_name));
        if let Some(owner) = &fields.owner_id {
            properties.insert("hubspot_owner_id".into(), json!(owner));
        }
        json!({ "properties": properties })
    }

    async fn post_contact(&self, fields: &ContactFields) -> ProviderResult<String> {
        let body = Self::contact_body(fields, true);
        let answer = self
            .api
            .send(ApiRequest::post(self.endpoints.contacts.as_str(), &body))
            .await?;
        id_at(&answer, "id").ok_or_else(|| {
            ProviderError::invalid_response("created contact has no id").with_provider(PROVIDER)
        })
    }

    async fn patch_contact(&self, id: &str, fields: &ContactFields) -> ProviderResult<()> {
        let body = Self::contact_body(fields, false);
        let path = fill_template(&self.endpoints.contact, &[("id", id)]);
        self.api.send(ApiRequest::patch(path, &body)).await?;
        Ok(())
    }

    async fn attendees(
        &self,
        record: &RemoteRecord,
        ctx: &mut CycleContext,
    ) -> ProviderResult<Attendees> {
        let meeting_id = id_at(record.json(), "id")
            .ok_or_else(|| ProviderError::mapping("meeting has no id").with_provider(PROVIDER))?;
        let path = fill_template(&self.endpoints.meeting_contacts, &[("id", &meeting_id)]);
        let associations: AssociationList =
            decode(PROVIDER, self.api.send(ApiRequest::get(path)).await?)?;

        let mut contacts = Vec::with_capacity(associations.results.len());
        for association in associations.results {
            let Some(contact_id) = value_to_text(&association.id) else {
                continue;
            };
            if let Some(cached) = ctx.contacts.get(&contact_id) {
                contacts.push(cached.clone());
                continue;
            }
            if !self.detail_delay.is_zero() {
                tokio::time::sleep(self.detail_delay).await;
            }
            let contact = self.fetch_contact(&contact_id).await?;
            ctx.contacts.insert(contact.clone());
            contacts.push(contact);
        }

        debug!(meeting = %meeting_id, contacts = contacts.len(), "resolved meeting attendees");
        Ok(Attendees::Known(contacts))
    }
}

impl ProviderAdapter for CrmProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CrmMeetings
    }

    fn begin_cycle(&self, _direction: Direction) -> BoxFuture<'_, ProviderResult<CycleContext>> {
        Box::pin(async move { Ok(CycleContext::with_owner(self.owner_id.clone())) })
    }

    // The meetings listing has no date filter; the whole collection is paged.
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
        Box::pin(self.get_meeting(id))
    }

    fn create_remote_event<'a>(
        &'a self,
        payload: &'a RemotePayload,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(self.create_meeting(payload))
    }

    fn update_remote_event<'a>(
        &'a self,
        id: &'a str,
        payload: &'a RemotePayload,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.update_meeting(id, payload))
    }

    fn delete_remote_event<'a>(&'a self, id: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.delete_meeting(id))
    }

    fn contact_key_kind(&self) -> Option<ContactKeyKind> {
        Some(ContactKeyKind::Email)
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
        _ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(self.post_contact(fields))
    }

    fn update_contact<'a>(
        &'a self,
        id: &'a str,
        fields: &'a ContactFields,
        _ctx: &'a CycleContext,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(self.patch_contact(id, fields))
    }

    fn record_attendees<'a>(
        &'a self,
        record: &'a RemoteRecord,
        ctx: &'a mut CycleContext,
    ) -> BoxFuture<'a, ProviderResult<Attendees>> {
        Box::pin(self.attendees(record, ctx))
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
        let mut fields =
            LocalFields::from_event(event, "").map_err(|e| e.with_provider(PROVIDER))?;
        fields.subject.get_or_insert_with(|| DEFAULT_SUBJECT.to_string());

        let mut body = PUSH_FIELDS
            .to_remote(&fields, TimestampStyle::EpochMillis, &self.offset)
            .map_err(|e| e.with_provider(PROVIDER))?;

        if let Some(owner) = ctx.owner_id.as_ref().or(self.owner_id.as_ref()) {
            if let Some(Value::Object(properties)) = body.get_mut("properties") {
                properties.insert("hubspot_owner_id".into(), json!(owner));
            }
        }

        // Associations are only accepted when the meeting is created.
        if intent == PayloadIntent::Create {
            let associations: Vec<Value> = attendee_ids
                .iter()
                .map(|id| {
                    json!({
                        "to": {"id": id},
                        "types": [{
                            "associationCategory": "HUBSPOT_DEFINED",
                            "associationTypeId": MEETING_TO_CONTACT,
                        }],
                    })
                })
                .collect();
            body.insert("associations".into(), Value::Array(associations));
        }

        Ok(RemotePayload(Value::Object(body)))
    }
}
