//! Append-only message log.

use super::{Record, Store};
use serde::Serialize;
use wasend_core::error::WasendError;
use wasend_core::records::{LogKind, LogStatus, MessageLog};

impl Record for MessageLog {
    const KIND: &'static str = "message log";
    const FILE: &'static str = "message-logs.json";

    fn id(&self) -> u64 {
        self.id
    }
}

/// One page of log entries, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    pub items: Vec<MessageLog>,
    pub total: usize,
    pub has_more: bool,
}

/// Aggregate log counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub single: usize,
    pub bulk: usize,
    /// Individual messages delivered by bulk sends.
    pub bulk_messages_sent: usize,
}

impl Store {
    /// Append a log entry, assigning its id.
    pub async fn append_log(&self, mut log: MessageLog) -> Result<MessageLog, WasendError> {
        self.logs
            .write(|doc| {
                log.id = doc.next_id();
                doc.items.push(log.clone());
                Ok(log)
            })
            .await
    }

    /// Entries newest first, skipping `offset` and returning at most `limit`.
    pub async fn list_logs(&self, limit: usize, offset: usize) -> Result<LogPage, WasendError> {
        self.logs
            .read(|doc| {
                let total = doc.items.len();
                let items: Vec<MessageLog> = doc
                    .items
                    .iter()
                    .rev()
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect();
                LogPage {
                    has_more: offset.saturating_add(items.len()) < total,
                    items,
                    total,
                }
            })
            .await
    }

    pub async fn get_log(&self, id: u64) -> Result<MessageLog, WasendError> {
        self.logs.get(id).await
    }

    pub async fn log_stats(&self) -> Result<LogStats, WasendError> {
        self.logs
            .read(|doc| {
                let mut stats = LogStats {
                    total: doc.items.len(),
                    ..Default::default()
                };
                for log in &doc.items {
                    match log.status {
                        LogStatus::Sent => stats.sent += 1,
                        LogStatus::Failed => stats.failed += 1,
                    }
                    match log.kind {
                        LogKind::Single => stats.single += 1,
                        LogKind::Bulk => {
                            stats.bulk += 1;
                            stats.bulk_messages_sent +=
                                log.summary.map(|s| s.successful).unwrap_or_default();
                        }
                    }
                }
                stats
            })
            .await
    }

    /// Drop every entry. Returns how many were removed; ids keep counting.
    pub async fn clear_logs(&self) -> Result<usize, WasendError> {
        self.logs
            .write(|doc| {
                let n = doc.items.len();
                doc.items.clear();
                Ok(n)
            })
            .await
    }
}
