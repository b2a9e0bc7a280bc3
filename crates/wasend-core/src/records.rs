//! Persisted record types: contacts, groups, templates, and message logs.
//!
//! Field names serialize in camelCase to match the JSON files and the
//! browser front end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WasendError;

/// An address book entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: u64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Contact {
    /// First and last name joined by a space, without stray whitespace.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Create/update payload for a contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl ContactInput {
    pub fn validate(&self) -> Result<(), WasendError> {
        if self.first_name.trim().is_empty() {
            return Err(WasendError::Validation("firstName is required".into()));
        }
        if self.phone.trim().is_empty() {
            return Err(WasendError::Validation("phone is required".into()));
        }
        if !self.phone.chars().any(|c| c.is_ascii_digit()) {
            return Err(WasendError::Validation(format!(
                "phone '{}' contains no digits",
                self.phone
            )));
        }
        Ok(())
    }
}

/// A named set of contacts.
///
/// Members are contact ids; nothing keeps them in sync with deletions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<u64>,
}

impl GroupInput {
    pub fn validate(&self) -> Result<(), WasendError> {
        if self.name.trim().is_empty() {
            return Err(WasendError::Validation("name is required".into()));
        }
        Ok(())
    }
}

/// A stored message body with `{placeholder}` tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub body: String,
    #[serde(default)]
    pub variables: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "content")]
    pub body: String,
    /// Explicit variable list; extracted from `body` when absent.
    #[serde(default)]
    pub variables: Option<Vec<String>>,
}

impl TemplateInput {
    pub fn validate(&self) -> Result<(), WasendError> {
        if self.name.trim().is_empty() {
            return Err(WasendError::Validation("name is required".into()));
        }
        if self.body.trim().is_empty() {
            return Err(WasendError::Validation("body is required".into()));
        }
        Ok(())
    }
}

/// Outcome recorded in a message log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Single,
    Bulk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecipient {
    #[serde(default)]
    pub name: Option<String>,
    pub phone: String,
    /// Per-recipient failure, bulk entries only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate counts of a bulk send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Append-only record of a send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageLog {
    /// Assigned by the store on append.
    #[serde(default)]
    pub id: u64,
    pub recipients: Vec<LogRecipient>,
    pub message: String,
    pub status: LogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "type")]
    pub kind: LogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<BulkSummary>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_full_name_trims() {
        let contact = Contact {
            id: 1,
            first_name: "Ana".into(),
            last_name: String::new(),
            nickname: None,
            phone: "5511999887766".into(),
            email: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        assert_eq!(contact.full_name(), "Ana");
    }

    #[test]
    fn test_contact_input_validation() {
        let mut input = ContactInput {
            first_name: "Ana".into(),
            phone: "+55 11 99988-7766".into(),
            ..Default::default()
        };
        assert!(input.validate().is_ok());

        input.phone = "  ".into();
        assert!(input.validate().is_err());

        input.phone = "n/a".into();
        assert!(input.validate().is_err());

        input.phone = "123".into();
        input.first_name = String::new();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_template_input_accepts_content_alias() {
        let input: TemplateInput =
            serde_json::from_str(r#"{"name":"hi","content":"Hello {firstName}"}"#).unwrap();
        assert_eq!(input.body, "Hello {firstName}");
        assert!(input.variables.is_none());
    }

    #[test]
    fn test_message_log_uses_type_field() {
        let log = MessageLog {
            id: 7,
            recipients: vec![LogRecipient {
                name: None,
                phone: "1@s.whatsapp.net".into(),
                error: None,
            }],
            message: "hi".into(),
            status: LogStatus::Sent,
            error: None,
            kind: LogKind::Bulk,
            template_id: None,
            message_id: None,
            summary: Some(BulkSummary {
                total: 1,
                successful: 1,
                failed: 0,
            }),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["type"], "bulk");
        assert_eq!(json["status"], "sent");
        assert_eq!(json["summary"]["successful"], 1);
        assert!(json.get("error").is_none());
    }
}
