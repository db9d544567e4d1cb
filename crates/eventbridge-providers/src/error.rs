//! Error types for provider operations.
//!
//! Every failure crossing the provider boundary is a [`ProviderError`]. Remote
//! HTTP failures keep the status code and response body so a sync cycle can
//! log exactly what the provider said.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Credential missing, invalid or expired (401).
    AuthenticationFailed,
    /// Credential lacks permission (403).
    AuthorizationFailed,
    /// Connection failure or timeout.
    NetworkError,
    /// Too many requests (429).
    RateLimited,
    /// 5xx from the provider.
    ServerError,
    /// Body could not be parsed or lacks an expected field.
    InvalidResponse,
    /// Remote record does not exist (404).
    NotFound,
    /// Any other non-success status.
    BadRequest,
    /// Link or client misconfigured.
    ConfigurationError,
    /// A required field is missing while building a payload or reading a record.
    MappingFailed,
    /// A participant could not be matched to or created as a remote contact.
    ContactResolution,
    /// Operation not offered by this provider.
    CalendarError,
}

impl ProviderErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns true for credential problems.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::AuthorizationFailed)
    }

    /// Maps a non-success HTTP status to a code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::AuthenticationFailed,
            403 => Self::AuthorizationFailed,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::BadRequest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::MappingFailed => "mapping_failed",
            Self::ContactResolution => "contact_resolution",
            Self::CalendarError => "calendar_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while talking to a provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// Provider name, e.g. "crm-meetings".
    provider: Option<String>,
    /// HTTP status, when the provider answered.
    status: Option<u16>,
    /// Raw response body, when the provider answered.
    body: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            status: None,
            body: None,
            source: None,
        }
    }

    /// A non-success HTTP answer, classified by status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let code = ProviderErrorCode::from_status(status);
        let message = match code {
            ProviderErrorCode::AuthenticationFailed => "access token expired or invalid".into(),
            ProviderErrorCode::AuthorizationFailed => "access denied".into(),
            ProviderErrorCode::NotFound => "remote record not found".into(),
            ProviderErrorCode::RateLimited => "rate limit exceeded".into(),
            _ => format!("remote fetch failed with status {}", status),
        };
        let mut err = Self::new(code, message);
        err.status = Some(status);
        err.body = Some(body);
        err
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn mapping(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::MappingFailed, message)
    }

    pub fn contact_resolution(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ContactResolution, message)
    }

    /// Creates an error for an operation the provider does not offer.
    pub fn calendar(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::CalendarError, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// HTTP status of the failed call, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Response body of the failed call, if any.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ProviderErrorCode::NotFound
    }

    pub fn is_auth(&self) -> bool {
        self.code.is_auth()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref body) = self.body
            && !body.is_empty()
        {
            write!(f, " ({})", truncate_body(body))?;
        }
        Ok(())
    }
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
