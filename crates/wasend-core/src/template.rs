//! `{placeholder}` substitution for message templates.
//!
//! A token is `{` + one or more ASCII letters, digits or `_` + `}`.
//! Unknown tokens and missing fields render as the empty string; braces
//! around anything else are left alone.

use std::collections::HashMap;

use crate::records::Contact;

/// Values available to a template at send time.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Full display name, split into first/last when those are absent.
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Caller-supplied values; these win over the fields above.
    pub extra: HashMap<String, String>,
}

impl TemplateContext {
    pub fn from_contact(contact: &Contact) -> Self {
        Self {
            first_name: Some(contact.first_name.clone()),
            last_name: Some(contact.last_name.clone()),
            name: Some(contact.full_name()),
            nickname: contact.nickname.clone(),
            phone: Some(contact.phone.clone()),
            email: contact.email.clone(),
            extra: HashMap::new(),
        }
    }

    pub fn with_extra(mut self, extra: HashMap<String, String>) -> Self {
        self.extra.extend(extra);
        self
    }

    /// Resolve a token name to its value.
    pub fn lookup(&self, key: &str) -> Option<String> {
        if let Some(v) = self.extra.get(key) {
            return Some(v.clone());
        }
        match key {
            "firstName" => self
                .first_name
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| self.split_name().0),
            "lastName" => self
                .last_name
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| self.split_name().1),
            "name" | "fullName" => self.name.clone().filter(|s| !s.is_empty()).or_else(|| {
                let joined = format!(
                    "{} {}",
                    self.first_name.as_deref().unwrap_or_default(),
                    self.last_name.as_deref().unwrap_or_default()
                );
                let joined = joined.trim();
                (!joined.is_empty()).then(|| joined.to_string())
            }),
            "nickname" => self.nickname.clone(),
            "phone" => self.phone.clone(),
            "email" => self.email.clone(),
            _ => None,
        }
    }

    fn split_name(&self) -> (Option<String>, Option<String>) {
        let Some(name) = self.name.as_deref() else {
            return (None, None);
        };
        let name = name.trim();
        match name.split_once(' ') {
            Some((first, rest)) => (Some(first.to_string()), Some(rest.trim().to_string())),
            None if !name.is_empty() => (Some(name.to_string()), None),
            None => (None, None),
        }
    }
}

fn is_token(inner: &str) -> bool {
    !inner.is_empty() && inner.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Substitute every `{token}` in `body`.
pub fn render(body: &str, ctx: &TemplateContext) -> String {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_token(&after[..close]) => {
                if let Some(value) = ctx.lookup(&after[..close]) {
                    out.push_str(&value);
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Whether `body` contains at least one token.
pub fn has_tokens(body: &str) -> bool {
    !extract_variables(body).is_empty()
}

/// Token names in order of first appearance, without duplicates.
pub fn extract_variables(body: &str) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    let mut rest = body;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_token(&after[..close]) => {
                let name = &after[..close];
                if !vars.iter().any(|v| v == name) {
                    vars.push(name.to_string());
                }
                rest = &after[close + 1..];
            }
            _ => rest = after,
        }
    }
    vars
}
