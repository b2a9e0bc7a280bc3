use serde::{Deserialize, Serialize};

use super::defaults::*;

/// How the cooldown window grows with consecutive attempts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same window after every attempt.
    #[default]
    Fixed,
    /// Window doubles per consecutive attempt, capped at `max_cooldown_secs`.
    Exponential,
}

/// Connection lifecycle policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Minimum wait between two connection attempts.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Consecutive attempts allowed before an explicit reset is required.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff: Backoff,
    #[serde(default = "default_max_cooldown_secs")]
    pub max_cooldown_secs: u64,
    /// Delay before an automatic reconnect after a recoverable disconnect.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Automatic reconnects stop once this many attempts were made.
    #[serde(default = "default_max_auto_retries")]
    pub max_auto_retries: u32,
    /// Pixels per QR module in the rendered data URL.
    #[serde(default = "default_qr_scale")]
    pub qr_scale: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            max_attempts: default_max_attempts(),
            backoff: Backoff::default(),
            max_cooldown_secs: default_max_cooldown_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            max_auto_retries: default_max_auto_retries(),
            qr_scale: default_qr_scale(),
        }
    }
}

/// WhatsApp client config.
///
/// Session data is stored at `{data_dir}/whatsapp_session/`.
/// Pairing is done by scanning a QR code (like WhatsApp Web).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Device name shown under "Linked devices" on the phone.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Also render each QR code to the terminal log.
    #[serde(default)]
    pub print_qr: bool,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            print_qr: false,
        }
    }
}

/// Sending limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Pause between consecutive bulk sends when the request gives none.
    #[serde(default = "default_bulk_delay_ms")]
    pub bulk_delay_ms: u64,
    #[serde(default = "default_max_bulk_recipients")]
    pub max_bulk_recipients: usize,
    /// Upper bound on message length in characters.
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            bulk_delay_ms: default_bulk_delay_ms(),
            max_bulk_recipients: default_max_bulk_recipients(),
            max_message_len: default_max_message_len(),
        }
    }
}
