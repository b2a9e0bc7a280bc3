//! Recipient normalization: phone numbers to WhatsApp addresses (JIDs).

use crate::error::WasendError;

/// Server part for personal chats.
pub const USER_SERVER: &str = "s.whatsapp.net";

/// Server part for group chats.
pub const GROUP_SERVER: &str = "g.us";

/// Turn user input into a JID string.
///
/// Anything already containing `@` is taken as a JID and passed through.
/// Otherwise every non-digit (`+`, spaces, dashes, parentheses) is dropped
/// and the personal-chat server appended.
pub fn normalize_recipient(raw: &str) -> Result<String, WasendError> {
    let trimmed = raw.trim();
    if trimmed.contains('@') {
        let (user, server) = trimmed.split_once('@').unwrap_or((trimmed, ""));
        if user.is_empty() || server.is_empty() {
            return Err(WasendError::InvalidRecipient(raw.to_string()));
        }
        return Ok(trimmed.to_string());
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(WasendError::InvalidRecipient(raw.to_string()));
    }
    Ok(format!("{digits}@{USER_SERVER}"))
}

/// Whether a JID addresses a group chat.
pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with(&format!("@{GROUP_SERVER}"))
}
