//! Builds the adapter for a calendar link.

use tracing::debug;

use eventbridge_core::{CalendarLink, ProviderKind};

use crate::appointment::AppointmentProvider;
use crate::crm::CrmProvider;
use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::http::HttpSettings;
use crate::marketing::MarketingProvider;
use crate::provider::ProviderAdapter;

/// Validates `link` and builds the adapter its provider tag selects.
///
/// # Errors
///
/// A link without a token yields `AuthenticationFailed`; any other invalid
/// field yields `ConfigurationError`.
pub fn build_adapter(
    link: &CalendarLink,
    settings: &HttpSettings,
) -> ProviderResult<Box<dyn ProviderAdapter>> {
    link.validate().map_err(|e| {
        let code = if e.is_auth() {
            ProviderErrorCode::AuthenticationFailed
        } else {
            ProviderErrorCode::ConfigurationError
        };
        ProviderError::new(code, e.to_string()).with_provider(link.provider.as_str())
    })?;

    debug!(calendar = %link.id, provider = %link.provider, "building adapter");
    let adapter: Box<dyn ProviderAdapter> = match link.provider {
        ProviderKind::CrmMeetings => Box::new(CrmProvider::new(link, settings)?),
        ProviderKind::MarketingCalendar => Box::new(MarketingProvider::new(link, settings)?),
        ProviderKind::AppointmentApi => Box::new(AppointmentProvider::new(link, settings)?),
    };
    Ok(adapter)
}
