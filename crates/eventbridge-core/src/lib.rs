//! Core types: calendar links, events, contacts, time conversion, tracing

pub mod calendar;
pub mod contact;
pub mod event;
pub mod phone;
pub mod stats;
pub mod time;
pub mod tracing;

pub use calendar::{CalendarLink, LinkError, ProviderKind};
pub use contact::{Contact, ContactKey, ContactKeyKind};
pub use event::{DEFAULT_DURATION_MINUTES, Event, Participant};
pub use phone::{normalize_phone, phone_matches};
pub use stats::{Direction, SyncReport, SyncResult, SyncStats};
pub use time::{TimeError, TimeRange};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
