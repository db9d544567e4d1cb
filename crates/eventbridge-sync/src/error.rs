//! Error types for the sync service.

use thiserror::Error;

use eventbridge_providers::ProviderError;

/// Errors from the event store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("store lock poisoned")]
    Poisoned,

    #[error("failed to access store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid store contents: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn event_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "event",
            id: id.into(),
        }
    }

    pub fn contact_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "contact",
            id: id.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the sync service.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unknown calendar: {0}")]
    UnknownCalendar(String),

    #[error("authentication failed for calendar {calendar}: {message}")]
    Auth { calendar: String, message: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Wraps a provider error, promoting credential failures to [`SyncError::Auth`].
    pub fn from_provider(calendar: &str, err: ProviderError) -> Self {
        if err.is_auth() {
            Self::Auth {
                calendar: calendar.to_string(),
                message: err.message().to_string(),
            }
        } else {
            Self::Provider(err)
        }
    }

    /// Returns true for a credential failure.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Auth { .. } => true,
            Self::Provider(e) => e.is_auth(),
            _ => false,
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, SyncError>;
