//! Address book CRUD.

use super::{Record, Store};
use chrono::Utc;
use wasend_core::error::WasendError;
use wasend_core::records::{Contact, ContactInput};

impl Record for Contact {
    const KIND: &'static str = "contact";
    const FILE: &'static str = "contacts.json";

    fn id(&self) -> u64 {
        self.id
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Store {
    pub async fn list_contacts(&self) -> Result<Vec<Contact>, WasendError> {
        self.contacts.list().await
    }

    pub async fn get_contact(&self, id: u64) -> Result<Contact, WasendError> {
        self.contacts.get(id).await
    }

    /// Contacts for the given ids, in the given order. Unknown ids are skipped.
    pub async fn get_contacts(&self, ids: &[u64]) -> Result<Vec<Contact>, WasendError> {
        self.contacts
            .read(|doc| {
                ids.iter()
                    .filter_map(|id| doc.items.iter().find(|c| c.id == *id).cloned())
                    .collect()
            })
            .await
    }

    pub async fn create_contact(&self, input: ContactInput) -> Result<Contact, WasendError> {
        input.validate()?;
        self.contacts
            .insert(|id| Contact {
                id,
                first_name: input.first_name.trim().to_string(),
                last_name: input.last_name.trim().to_string(),
                nickname: trimmed(input.nickname),
                phone: input.phone.trim().to_string(),
                email: trimmed(input.email),
                created_at: Utc::now(),
                updated_at: None,
            })
            .await
    }

    /// Replace every editable field of a contact.
    pub async fn update_contact(
        &self,
        id: u64,
        input: ContactInput,
    ) -> Result<Contact, WasendError> {
        input.validate()?;
        self.contacts
            .update(id, |c| {
                c.first_name = input.first_name.trim().to_string();
                c.last_name = input.last_name.trim().to_string();
                c.nickname = trimmed(input.nickname);
                c.phone = input.phone.trim().to_string();
                c.email = trimmed(input.email);
                c.updated_at = Some(Utc::now());
            })
            .await
    }

    /// Delete a contact. Groups that list it are left untouched.
    pub async fn delete_contact(&self, id: u64) -> Result<Contact, WasendError> {
        self.contacts.remove(id).await
    }
}
