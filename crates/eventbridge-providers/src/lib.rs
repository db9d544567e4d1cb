//! Provider adapters for external calendars.
//!
//! - [`ProviderAdapter`] - capability set the reconciler drives
//! - [`ApiClient`] - authenticated JSON client shared by the adapters
//! - [`FieldMap`] - table-driven field mapping in both directions
//! - [`ContactResolver`] - find-or-create of remote contacts
//! - [`build_adapter`] - picks the adapter for a [`CalendarLink`](eventbridge_core::CalendarLink)
//!
//! Three providers are implemented: CRM meetings ([`crm`]), a marketing
//! calendar ([`marketing`]) and an appointment API ([`appointment`]).

pub mod appointment;
pub mod crm;
pub mod error;
pub mod factory;
pub mod http;
pub mod mapping;
pub mod marketing;
pub mod provider;
pub mod resolver;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use factory::build_adapter;
pub use http::{ApiClient, ApiRequest, Credential, HttpSettings, SuccessCodes};
pub use mapping::{FieldKind, FieldMap, FieldRule, LocalField, LocalFields, TimestampStyle};
pub use provider::{
    Attendees, BoxFuture, ContactCache, ContactFields, CycleContext, PayloadIntent,
    ProviderAdapter, RemoteContact, RemotePage, RemotePayload, RemoteRecord,
    MAX_LISTING_PAGES, fetch_all_remote_events,
};
pub use resolver::{ContactResolver, NAME_PLACEHOLDER, ResolvedContact};
