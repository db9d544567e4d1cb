//! CRM meetings provider.

mod config;
mod provider;

pub use config::CrmEndpoints;
pub use provider::CrmProvider;
