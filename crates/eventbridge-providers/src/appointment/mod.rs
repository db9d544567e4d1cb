//! Appointment scheduling provider.

mod config;
mod provider;

pub use config::AppointmentEndpoints;
pub use provider::AppointmentProvider;
