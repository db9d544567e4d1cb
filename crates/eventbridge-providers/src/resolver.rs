//! Find-or-create resolution of remote contacts.

use std::collections::HashMap;

use tracing::{debug, warn};

use eventbridge_core::{Contact, ContactKey, phone_matches};

use crate::error::ProviderResult;
use crate::provider::{ContactFields, CycleContext, ProviderAdapter, RemoteContact};

/// Placeholder sent for missing name parts.
pub const NAME_PLACEHOLDER: &str = "X";

/// Returns true if `candidate` is a usable match for `key`.
///
/// Emails must be equal after trimming. Phones match when the candidate's
/// normalized number contains the key and is at least as long.
pub fn is_match(candidate: &RemoteContact, key: &ContactKey) -> bool {
    match key {
        ContactKey::Email(email) => candidate
            .email
            .as_deref()
            .is_some_and(|c| c.trim() == email),
        ContactKey::Phone(phone) => candidate
            .phone
            .as_deref()
            .is_some_and(|c| phone_matches(c, phone)),
    }
}

/// A remote contact found or created for a local one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContact {
    pub id: String,
    /// True when this resolution created the remote contact.
    pub created: bool,
}

/// Maps local participants to remote contact ids for one cycle.
///
/// Keys resolved earlier in the cycle are reused, so participants sharing an
/// email or phone never produce two remote contacts.
pub struct ContactResolver<'a> {
    adapter: &'a dyn ProviderAdapter,
    ctx: &'a CycleContext,
    resolved: HashMap<ContactKey, String>,
}

impl<'a> ContactResolver<'a> {
    pub fn new(adapter: &'a dyn ProviderAdapter, ctx: &'a CycleContext) -> Self {
        Self {
            adapter,
            ctx,
            resolved: HashMap::new(),
        }
    }

    /// Returns the remote id for `contact`, creating the remote contact if needed.
    ///
    /// `Ok(None)` means the contact has no correlating key or the provider
    /// has no contacts; a warning is logged in the first case.
    pub async fn resolve_or_create(&mut self, contact: &Contact) -> ProviderResult<Option<String>> {
        Ok(self.resolve(contact).await?.map(|resolved| resolved.id))
    }

    /// Like [`resolve_or_create`](Self::resolve_or_create), but also says
    /// whether the remote contact was created.
    pub async fn resolve(&mut self, contact: &Contact) -> ProviderResult<Option<ResolvedContact>> {
        let Some(kind) = self.adapter.contact_key_kind() else {
            return Ok(None);
        };
        let Some(key) = contact.key(kind) else {
            warn!(contact = %contact.id, key = ?kind, "participant has no correlating key, skipping");
            return Ok(None);
        };

        if let Some(id) = self.resolved.get(&key) {
            return Ok(Some(ResolvedContact {
                id: id.clone(),
                created: false,
            }));
        }

        let fields = self.contact_fields(contact, &key);
        let candidates = self.adapter.find_contacts(&key, self.ctx).await?;

        let (id, created) = match candidates.into_iter().find(|c| is_match(c, &key)) {
            Some(existing) => {
                debug!(contact = %contact.id, remote = %existing.id, %key, "matched remote contact");
                if self.adapter.refreshes_matched_contacts() {
                    self.refresh(&existing, &fields).await;
                }
                (existing.id, false)
            }
            None => {
                let id = self.adapter.create_contact(&fields, self.ctx).await?;
                debug!(contact = %contact.id, remote = %id, %key, "created remote contact");
                (id, true)
            }
        };

        self.resolved.insert(key, id.clone());
        Ok(Some(ResolvedContact { id, created }))
    }

    /// Resolves every contact, dropping failures after logging them.
    ///
    /// The returned ids keep participant order without duplicates.
    pub async fn resolve_all(&mut self, contacts: &[Contact]) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(contacts.len());
        for contact in contacts {
            match self.resolve_or_create(contact).await {
                Ok(Some(id)) if !ids.contains(&id) => ids.push(id),
                Ok(_) => {}
                Err(e) => {
                    warn!(contact = %contact.id, op = "resolve_contact", error = %e, "contact resolution failed");
                }
            }
        }
        ids
    }

    async fn refresh(&self, existing: &RemoteContact, fields: &ContactFields) {
        if let (Some(current), Some(owner)) = (&existing.assigned_to, &self.ctx.owner_id)
            && current != owner
        {
            warn!(
                remote = %existing.id,
                from = %current,
                to = %owner,
                "reassigning remote contact"
            );
        }
        if let Err(e) = self
            .adapter
            .update_contact(&existing.id, fields, self.ctx)
            .await
        {
            warn!(remote = %existing.id, op = "update_contact", error = %e, "failed to refresh remote contact");
        }
    }

    fn contact_fields(&self, contact: &Contact, key: &ContactKey) -> ContactFields {
        let name = |part: &Option<String>| {
            part.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(NAME_PLACEHOLDER)
                .to_string()
        };
        ContactFields {
            first_name: name(&contact.first_name),
            last_name: name(&contact.last_name),
            email: match key {
                ContactKey::Email(email) => Some(email.clone()),
                ContactKey::Phone(_) => contact.email.clone(),
            },
            // The normalized key is only for matching; providers get the number as entered.
            phone: contact
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from),
            owner_id: self.ctx.owner_id.clone(),
        }
    }
}
