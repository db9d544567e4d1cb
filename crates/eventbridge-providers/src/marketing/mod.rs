//! Marketing calendar provider.

mod config;
mod provider;

pub use config::MarketingEndpoints;
pub use provider::MarketingProvider;
