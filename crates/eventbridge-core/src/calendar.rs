//! Calendar link configuration.
//!
//! A [`CalendarLink`] binds one external provider account to sync settings.
//! Sync cycles read links but never write them.

use std::fmt;
use std::str::FromStr;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::{TimeError, parse_utc_offset};

/// The external provider a link talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// CRM meetings API.
    CrmMeetings,
    /// Marketing-automation calendar API.
    MarketingCalendar,
    /// Custom appointment API.
    AppointmentApi,
}

impl ProviderKind {
    /// All known providers.
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::CrmMeetings,
        ProviderKind::MarketingCalendar,
        ProviderKind::AppointmentApi,
    ];

    /// Returns the configuration name of this provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrmMeetings => "crm-meetings",
            Self::MarketingCalendar => "marketing-calendar",
            Self::AppointmentApi => "appointment-api",
        }
    }

    /// The offset used when a link does not configure one.
    pub fn default_utc_offset(&self) -> &'static str {
        match self {
            Self::MarketingCalendar => "-05:00",
            Self::CrmMeetings | Self::AppointmentApi => "+00:00",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LinkError::UnknownProvider(s.to_string()))
    }
}

/// Problems with a link's configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    /// No access credential configured.
    #[error("calendar `{link}` has no access token")]
    MissingCredential { link: String },

    /// A setting the provider needs is absent.
    #[error("calendar `{link}` is missing `{field}`")]
    MissingField { link: String, field: &'static str },

    /// The provider name is not recognised.
    #[error("unknown provider `{0}`")]
    UnknownProvider(String),

    /// The configured offset does not parse.
    #[error("calendar `{link}`: {source}")]
    InvalidOffset {
        link: String,
        #[source]
        source: TimeError,
    },
}

impl LinkError {
    /// Returns true for errors caused by a missing or unusable credential.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::MissingCredential { .. })
    }
}

fn default_true() -> bool {
    true
}

/// One configured external calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarLink {
    /// Local identifier used by the sync entry points.
    pub id: String,
    /// Which provider this link talks to.
    pub provider: ProviderKind,
    /// Identifier of the calendar on the provider side.
    pub remote_calendar_id: String,
    /// Bearer token or API token.
    #[serde(default)]
    pub access_token: String,
    /// Import remote records.
    #[serde(default = "default_true")]
    pub pull_enabled: bool,
    /// Export local records.
    #[serde(default = "default_true")]
    pub push_enabled: bool,
    /// Owner assigned to created meetings and contacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Sub-account identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Extra session cookie sent with each request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
    /// Overrides the provider's REST base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Fixed UTC offset of the local wall clock, e.g. `-05:00`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset: Option<String>,
}

impl CalendarLink {
    /// Creates a link with both directions enabled.
    pub fn new(
        id: impl Into<String>,
        provider: ProviderKind,
        remote_calendar_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            remote_calendar_id: remote_calendar_id.into(),
            access_token: access_token.into(),
            pull_enabled: true,
            push_enabled: true,
            owner_id: None,
            location_id: None,
            session_cookie: None,
            base_url: None,
            utc_offset: None,
        }
    }

    /// Builder method to set the enabled directions.
    pub fn with_directions(mut self, pull: bool, push: bool) -> Self {
        self.pull_enabled = pull;
        self.push_enabled = push;
        self
    }

    /// Builder method to set the owner.
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    /// Builder method to set the session cookie.
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    /// Builder method to override the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builder method to set the UTC offset.
    pub fn with_utc_offset(mut self, offset: impl Into<String>) -> Self {
        self.utc_offset = Some(offset.into());
        self
    }

    /// The effective offset, falling back to the provider default.
    pub fn offset(&self) -> Result<FixedOffset, LinkError> {
        let raw = self
            .utc_offset
            .as_deref()
            .unwrap_or_else(|| self.provider.default_utc_offset());
        parse_utc_offset(raw).map_err(|source| LinkError::InvalidOffset {
            link: self.id.clone(),
            source,
        })
    }

    /// Checks that the link carries everything its provider needs.
    pub fn validate(&self) -> Result<(), LinkError> {
        if self.access_token.trim().is_empty() {
            return Err(LinkError::MissingCredential {
                link: self.id.clone(),
            });
        }
        if self.remote_calendar_id.trim().is_empty() {
            return Err(self.missing("remote_calendar_id"));
        }
        if self.provider == ProviderKind::MarketingCalendar
            && self.location_id.as_deref().is_none_or(|l| l.trim().is_empty())
        {
            return Err(self.missing("location_id"));
        }
        self.offset()?;
        Ok(())
    }

    fn missing(&self, field: &'static str) -> LinkError {
        LinkError::MissingField {
            link: self.id.clone(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.as_str().parse::<ProviderKind>().unwrap(), kind);
        }
        assert!("google".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn provider_serde_uses_kebab_case() {
        let json = serde_json::to_string(&ProviderKind::MarketingCalendar).unwrap();
        assert_eq!(json, "\"marketing-calendar\"");
    }

    #[test]
    fn validate_requires_token() {
        let link = CalendarLink::new("sales", ProviderKind::CrmMeetings, "default", " ");
        let err = link.validate().unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn validate_requires_location_for_marketing() {
        let link = CalendarLink::new("ghl", ProviderKind::MarketingCalendar, "cal-1", "tok");
        assert_eq!(
            link.validate(),
            Err(LinkError::MissingField {
                link: "ghl".into(),
                field: "location_id"
            })
        );
        assert!(link.with_location("loc-1").validate().is_ok());
    }

    #[test]
    fn offset_defaults_per_provider() {
        let crm = CalendarLink::new("a", ProviderKind::CrmMeetings, "c", "t");
        assert_eq!(crm.offset().unwrap().local_minus_utc(), 0);

        let ghl = CalendarLink::new("b", ProviderKind::MarketingCalendar, "c", "t");
        assert_eq!(ghl.offset().unwrap().local_minus_utc(), -5 * 3600);

        let custom = ghl.with_utc_offset("+01:00");
        assert_eq!(custom.offset().unwrap().local_minus_utc(), 3600);
    }

    #[test]
    fn invalid_offset_fails_validation() {
        let link = CalendarLink::new("a", ProviderKind::AppointmentApi, "c", "t")
            .with_utc_offset("EST");
        assert!(matches!(
            link.validate(),
            Err(LinkError::InvalidOffset { .. })
        ));
    }
}
