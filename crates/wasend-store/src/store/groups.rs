//! Named contact sets.

use super::{Record, Store};
use chrono::Utc;
use wasend_core::error::WasendError;
use wasend_core::records::{Contact, Group, GroupInput};

impl Record for Group {
    const KIND: &'static str = "group";
    const FILE: &'static str = "groups.json";

    fn id(&self) -> u64 {
        self.id
    }
}

/// Member ids in first-seen order, duplicates dropped.
fn dedup_members(members: Vec<u64>) -> Vec<u64> {
    let mut out = Vec::with_capacity(members.len());
    for m in members {
        if !out.contains(&m) {
            out.push(m);
        }
    }
    out
}

impl Store {
    pub async fn list_groups(&self) -> Result<Vec<Group>, WasendError> {
        self.groups.list().await
    }

    pub async fn get_group(&self, id: u64) -> Result<Group, WasendError> {
        self.groups.get(id).await
    }

    pub async fn create_group(&self, input: GroupInput) -> Result<Group, WasendError> {
        input.validate()?;
        self.groups
            .insert(|id| Group {
                id,
                name: input.name.trim().to_string(),
                description: input.description.trim().to_string(),
                members: dedup_members(input.members),
                created_at: Utc::now(),
                updated_at: None,
            })
            .await
    }

    pub async fn update_group(&self, id: u64, input: GroupInput) -> Result<Group, WasendError> {
        input.validate()?;
        self.groups
            .update(id, |g| {
                g.name = input.name.trim().to_string();
                g.description = input.description.trim().to_string();
                g.members = dedup_members(input.members);
                g.updated_at = Some(Utc::now());
            })
            .await
    }

    pub async fn delete_group(&self, id: u64) -> Result<Group, WasendError> {
        self.groups.remove(id).await
    }

    /// Contacts of a group that still exist, in member order.
    pub async fn group_members(&self, id: u64) -> Result<Vec<Contact>, WasendError> {
        let group = self.get_group(id).await?;
        self.get_contacts(&group.members).await
    }
}
