//! Single and bulk sends: template rendering, recipient expansion, the
//! paced bulk loop, and message logging.

#[cfg(test)]
mod tests;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use wasend_core::config::MessagingConfig;
use wasend_core::error::WasendError;
use wasend_core::event::ServerEvent;
use wasend_core::recipient::{is_group_jid, normalize_recipient};
use wasend_core::records::{
    BulkSummary, Contact, LogKind, LogRecipient, LogStatus, MessageLog,
};
use wasend_core::template::{has_tokens, render, TemplateContext};
use wasend_core::traits::MessagingClient;
use wasend_store::Store;

/// A bulk recipient: a bare phone number (string or JSON number) or a record
/// with personalization fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipientInput {
    Phone(String),
    Number(u64),
    Detailed(RecipientDetail),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientDetail {
    #[serde(default, alias = "number")]
    pub phone: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Fill missing fields from this stored contact.
    #[serde(default)]
    pub contact_id: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct SingleRequest {
    pub recipient: Option<String>,
    pub message: String,
    pub template_id: Option<u64>,
    pub contact_id: Option<u64>,
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct BulkRequest {
    pub recipients: Vec<RecipientInput>,
    pub message: String,
    /// Pause between sends; the configured default when absent.
    pub delay_ms: Option<u64>,
    pub template_id: Option<u64>,
    pub group_id: Option<u64>,
    pub contact_ids: Vec<u64>,
    pub variables: HashMap<String, String>,
}

/// Per-recipient result of a bulk send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub success: bool,
    /// Target is a group chat rather than a person.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleReport {
    pub recipient: String,
    pub message_id: String,
    pub log_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
    pub results: Vec<SendOutcome>,
    pub summary: BulkSummary,
    pub log_id: Option<u64>,
}

/// One resolved bulk target.
struct Target {
    phone: String,
    name: Option<String>,
    ctx: TemplateContext,
}

impl Target {
    fn from_phone(phone: String) -> Self {
        Self {
            ctx: TemplateContext {
                phone: Some(phone.clone()),
                ..Default::default()
            },
            phone,
            name: None,
        }
    }

    fn from_contact(contact: &Contact) -> Self {
        Self {
            phone: contact.phone.clone(),
            name: Some(contact.full_name()),
            ctx: TemplateContext::from_contact(contact),
        }
    }
}

/// Sends messages through the client and records every send.
pub struct Dispatcher {
    client: Arc<dyn MessagingClient>,
    store: Store,
    config: MessagingConfig,
    events: broadcast::Sender<ServerEvent>,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn MessagingClient>,
        store: Store,
        config: MessagingConfig,
        events: broadcast::Sender<ServerEvent>,
    ) -> Self {
        Self {
            client,
            store,
            config,
            events,
        }
    }

    /// Message body from the template or the request, checked for size.
    async fn resolve_body(
        &self,
        message: &str,
        template_id: Option<u64>,
    ) -> Result<String, WasendError> {
        let body = match template_id {
            Some(id) => self.store.get_template(id).await?.body,
            None => message.to_string(),
        };
        if body.trim().is_empty() {
            return Err(WasendError::Validation("message is required".into()));
        }
        if body.chars().count() > self.config.max_message_len {
            return Err(WasendError::Validation(format!(
                "message exceeds {} characters",
                self.config.max_message_len
            )));
        }
        Ok(body)
    }

    async fn require_connected(&self) -> Result<(), WasendError> {
        if self.client.is_connected().await {
            Ok(())
        } else {
            Err(WasendError::NotConnected)
        }
    }

    /// Store a log entry and announce it. A storage failure is logged, not raised:
    /// the message has already gone out.
    async fn record(&self, log: MessageLog) -> Option<u64> {
        match self.store.append_log(log).await {
            Ok(saved) => {
                let id = saved.id;
                let _ = self.events.send(ServerEvent::NewMessageLog(saved));
                Some(id)
            }
            Err(e) => {
                warn!("failed to store message log: {e}");
                None
            }
        }
    }

    pub async fn send_single(&self, req: SingleRequest) -> Result<SingleReport, WasendError> {
        let body = self.resolve_body(&req.message, req.template_id).await?;
        let contact = match req.contact_id {
            Some(id) => Some(self.store.get_contact(id).await?),
            None => None,
        };

        let raw = req
            .recipient
            .filter(|r| !r.trim().is_empty())
            .or_else(|| contact.as_ref().map(|c| c.phone.clone()))
            .ok_or_else(|| WasendError::Validation("number is required".into()))?;
        let jid = normalize_recipient(&raw)?;
        self.require_connected().await?;

        let text = if has_tokens(&body) {
            let ctx = contact
                .as_ref()
                .map(TemplateContext::from_contact)
                .unwrap_or_else(|| TemplateContext {
                    phone: Some(raw.clone()),
                    ..Default::default()
                })
                .with_extra(req.variables);
            render(&body, &ctx)
        } else {
            body
        };

        let result = self.client.send_text(&jid, &text).await;
        let (status, error, message_id) = match &result {
            Ok(id) => (LogStatus::Sent, None, Some(id.clone())),
            Err(e) => (LogStatus::Failed, Some(e.to_string()), None),
        };
        let log_id = self
            .record(MessageLog {
                id: 0,
                recipients: vec![LogRecipient {
                    name: contact.as_ref().map(Contact::full_name),
                    phone: jid.clone(),
                    error: None,
                }],
                message: text,
                status,
                error,
                kind: LogKind::Single,
                template_id: req.template_id,
                message_id,
                summary: None,
                timestamp: Utc::now(),
            })
            .await;

        let message_id = result?;
        info!("sent message {message_id} to {jid}");
        Ok(SingleReport {
            recipient: jid,
            message_id,
            log_id,
        })
    }

    /// Explicit recipients first, then `contactIds`, then group members.
    async fn expand_targets(&self, req: &BulkRequest) -> Result<Vec<Target>, WasendError> {
        let mut targets = Vec::new();

        for input in &req.recipients {
            match input {
                RecipientInput::Phone(phone) => targets.push(Target::from_phone(phone.clone())),
                RecipientInput::Number(number) => {
                    targets.push(Target::from_phone(number.to_string()))
                }
                RecipientInput::Detailed(detail) => {
                    targets.push(self.target_from_detail(detail).await?);
                }
            }
        }

        for contact in self.store.get_contacts(&req.contact_ids).await? {
            targets.push(Target::from_contact(&contact));
        }

        if let Some(group_id) = req.group_id {
            for contact in self.store.group_members(group_id).await? {
                targets.push(Target::from_contact(&contact));
            }
        }

        Ok(targets)
    }

    async fn target_from_detail(&self, detail: &RecipientDetail) -> Result<Target, WasendError> {
        let mut target = match detail.contact_id {
            Some(id) => Target::from_contact(&self.store.get_contact(id).await?),
            None => Target {
                phone: String::new(),
                name: None,
                ctx: TemplateContext::default(),
            },
        };
        if let Some(phone) = detail.phone.as_ref().filter(|p| !p.trim().is_empty()) {
            target.phone = phone.clone();
            target.ctx.phone = Some(phone.clone());
        }
        if let Some(name) = &detail.name {
            target.name = Some(name.clone());
            target.ctx.name = Some(name.clone());
        }
        if detail.first_name.is_some() {
            target.ctx.first_name = detail.first_name.clone();
        }
        if detail.last_name.is_some() {
            target.ctx.last_name = detail.last_name.clone();
        }
        if detail.email.is_some() {
            target.ctx.email = detail.email.clone();
        }
        if target.name.is_none() {
            target.name = target.ctx.lookup("name");
        }
        Ok(target)
    }

    /// Send to every target in order, pausing between sends.
    ///
    /// Per-recipient failures are recorded and never stop the loop. The loop
    /// is not cancelled by a session reset.
    pub async fn send_bulk(&self, req: BulkRequest) -> Result<BulkReport, WasendError> {
        let body = self.resolve_body(&req.message, req.template_id).await?;
        let targets = self.expand_targets(&req).await?;

        if targets.is_empty() {
            return Err(WasendError::Validation("no recipients given".into()));
        }
        if targets.len() > self.config.max_bulk_recipients {
            return Err(WasendError::Validation(format!(
                "{} recipients exceeds the limit of {}",
                targets.len(),
                self.config.max_bulk_recipients
            )));
        }
        self.require_connected().await?;

        let delay = Duration::from_millis(req.delay_ms.unwrap_or(self.config.bulk_delay_ms));
        let personalized = has_tokens(&body);
        let total = targets.len();
        info!(
            "bulk send to {total} recipients ({}ms apart)",
            delay.as_millis()
        );

        let mut results = Vec::with_capacity(total);
        for (i, target) in targets.into_iter().enumerate() {
            let outcome = match normalize_recipient(&target.phone) {
                Ok(jid) => {
                    let group = is_group_jid(&jid);
                    let text = if personalized {
                        render(&body, &target.ctx.clone().with_extra(req.variables.clone()))
                    } else {
                        body.clone()
                    };
                    match self.client.send_text(&jid, &text).await {
                        Ok(id) => SendOutcome {
                            recipient: jid,
                            name: target.name,
                            success: true,
                            group,
                            message_id: Some(id),
                            error: None,
                        },
                        Err(e) => {
                            warn!("bulk send {}/{total} to {jid} failed: {e}", i + 1);
                            SendOutcome {
                                recipient: jid,
                                name: target.name,
                                success: false,
                                group,
                                message_id: None,
                                error: Some(e.to_string()),
                            }
                        }
                    }
                }
                Err(e) => SendOutcome {
                    recipient: target.phone,
                    name: target.name,
                    success: false,
                    group: false,
                    message_id: None,
                    error: Some(e.to_string()),
                },
            };
            results.push(outcome);

            if i + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let successful = results.iter().filter(|r| r.success).count();
        let summary = BulkSummary {
            total,
            successful,
            failed: total - successful,
        };
        info!(
            "bulk send done: {}/{} delivered",
            summary.successful, summary.total
        );

        let log_id = self
            .record(MessageLog {
                id: 0,
                recipients: results
                    .iter()
                    .map(|r| LogRecipient {
                        name: r.name.clone(),
                        phone: r.recipient.clone(),
                        error: r.error.clone(),
                    })
                    .collect(),
                message: body,
                status: if successful > 0 {
                    LogStatus::Sent
                } else {
                    LogStatus::Failed
                },
                error: (successful == 0).then(|| "all sends failed".to_string()),
                kind: LogKind::Bulk,
                template_id: req.template_id,
                message_id: None,
                summary: Some(summary),
                timestamp: Utc::now(),
            })
            .await;

        Ok(BulkReport {
            results,
            summary,
            log_id,
        })
    }
}
