//! Contact commands: `contact import` and `contact add`.

use tracing::debug;

use eventbridge_core::Contact;
use eventbridge_sync::{HookOutcome, SyncService};

use crate::error::CliResult;

/// Fields of a contact entered on the command line.
#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewContact {
    fn into_contact(self) -> Contact {
        let mut contact = Contact::new("").with_first_name(self.first_name);
        contact.last_name = self.last_name;
        contact.email = self.email;
        contact.phone = self.phone;
        contact
    }
}

pub async fn import(service: &SyncService, calendar: &str) -> CliResult<bool> {
    let result = service.pull_contacts(calendar).await?;
    println!("[{}] {}", calendar, result.message);
    Ok(result.success)
}

/// Stores the contact, then pushes it to the calendar's CRM.
///
/// The local contact is kept whatever the push outcome.
pub async fn add(service: &SyncService, calendar: &str, fields: NewContact) -> CliResult<bool> {
    service.link(calendar)?;

    let mut contact = fields.into_contact();
    contact.id = service.store().insert_contact(contact.clone())?;
    debug!(contact = %contact.id, %calendar, "contact stored");

    let outcome = service.hooks().on_contact_created(&contact, calendar).await;
    match &outcome {
        HookOutcome::Applied => println!("contact {}: created remotely", contact.id),
        HookOutcome::Skipped(reason) => {
            println!("contact {}: not pushed ({})", contact.id, reason)
        }
        HookOutcome::Failed(error) => println!("contact {}: push failed: {}", contact.id, error),
    }
    Ok(!outcome.is_failure())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventbridge_core::ContactKey;
    use eventbridge_sync::SyncError;

    use crate::commands::test_support::offline_service;
    use crate::error::CliError;

    fn ana() -> NewContact {
        NewContact {
            first_name: "Ana".into(),
            email: Some("ana@example.com".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn add_keeps_contact_when_push_fails() {
        let dir = tempfile::tempdir().unwrap();
        let service = offline_service(dir.path());

        assert!(!add(&service, "sales", ana()).await.unwrap());
        let key = ContactKey::email("ana@example.com").unwrap();
        let stored = service.store().find_contact(&key).unwrap().unwrap();
        assert_eq!(stored.first_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn add_to_unknown_calendar_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let service = offline_service(dir.path());

        assert!(matches!(
            add(&service, "nope", ana()).await,
            Err(CliError::Sync(SyncError::UnknownCalendar(_)))
        ));
        let key = ContactKey::email("ana@example.com").unwrap();
        assert!(service.store().find_contact(&key).unwrap().is_none());
    }

    #[tokio::test]
    async fn import_without_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let service = offline_service(dir.path());
        assert!(!import(&service, "sales").await.unwrap());
    }
}
