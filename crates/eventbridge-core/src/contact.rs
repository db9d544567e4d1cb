//! Local contacts and the keys used to correlate them with remote contacts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::phone::normalize_phone;

/// Which attribute a provider uses to correlate contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKeyKind {
    /// Exact email address.
    Email,
    /// Normalized phone number.
    Phone,
}

/// A correlating key for a contact.
///
/// Phone keys always hold the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContactKey {
    Email(String),
    Phone(String),
}

impl ContactKey {
    /// Builds an email key, returning `None` for blank input.
    pub fn email(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self::Email(trimmed.to_string()))
    }

    /// Builds a normalized phone key, returning `None` when no digits remain.
    pub fn phone(raw: &str) -> Option<Self> {
        let normalized = normalize_phone(raw);
        normalized
            .chars()
            .any(|c| c.is_ascii_digit())
            .then_some(Self::Phone(normalized))
    }

    /// Returns the kind of this key.
    pub fn kind(&self) -> ContactKeyKind {
        match self {
            Self::Email(_) => ContactKeyKind::Email,
            Self::Phone(_) => ContactKeyKind::Phone,
        }
    }

    /// Returns the key value.
    pub fn value(&self) -> &str {
        match self {
            Self::Email(v) | Self::Phone(v) => v,
        }
    }
}

impl fmt::Display for ContactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email(v) => write!(f, "email:{}", v),
            Self::Phone(v) => write!(f, "phone:{}", v),
        }
    }
}

/// A local contact record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Contact {
    /// Creates an empty contact with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the first name.
    pub fn with_first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    /// Builder method to set the last name.
    pub fn with_last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    /// Builder method to set the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Builder method to set the phone.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Returns the correlating key of the requested kind, if present.
    pub fn key(&self, kind: ContactKeyKind) -> Option<ContactKey> {
        match kind {
            ContactKeyKind::Email => self.email.as_deref().and_then(ContactKey::email),
            ContactKeyKind::Phone => self.phone.as_deref().and_then(ContactKey::phone),
        }
    }

    /// Returns true if this contact carries `key`.
    pub fn matches_key(&self, key: &ContactKey) -> bool {
        self.key(key.kind()).as_ref() == Some(key)
    }
}
