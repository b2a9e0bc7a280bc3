//! Connection lifecycle types and the events that flow between the
//! messaging client, the session manager, and realtime subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::records::MessageLog;

/// Connection state as seen by the UI.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    QrReady,
    Connected,
    Cooldown,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::QrReady => "qr-ready",
            Self::Connected => "connected",
            Self::Cooldown => "cooldown",
            Self::Error => "error",
        }
    }

    /// Whether a new connection attempt may start from this state.
    pub fn accepts_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Error | Self::Cooldown)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisconnectReason {
    LoggedOut,
    BadSession,
    MultideviceMismatch,
    /// Another client took over the session.
    Replaced,
    RestartRequired,
    ConnectionLost,
    ConnectionClosed,
    TimedOut,
    /// Account temporarily banned or forbidden.
    Banned,
    /// Client version rejected by the server.
    Outdated,
    Unknown(u16),
}

/// What the session manager does after a disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectAction {
    /// Wipe stored auth material and reset counters; next connect re-pairs.
    ClearSession,
    /// Reset counters, wait for a manual connect.
    ResetCounters,
    /// Retry automatically while the attempt budget allows it.
    Retry,
    /// Surface as an error, wait for a manual connect.
    Fail,
    /// Do nothing; a manual connect is required.
    Manual,
}

impl DisconnectReason {
    /// Map a numeric close code to a reason.
    ///
    /// Codes follow the WhatsApp Web stream error numbering.
    pub fn from_code(code: u16) -> Self {
        match code {
            401 => Self::LoggedOut,
            403 => Self::Banned,
            405 => Self::Outdated,
            408 => Self::TimedOut,
            411 => Self::MultideviceMismatch,
            428 => Self::ConnectionClosed,
            440 => Self::Replaced,
            500 => Self::BadSession,
            503 => Self::ConnectionLost,
            515 => Self::RestartRequired,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::LoggedOut => 401,
            Self::Banned => 403,
            Self::Outdated => 405,
            Self::TimedOut => 408,
            Self::MultideviceMismatch => 411,
            Self::ConnectionClosed => 428,
            Self::Replaced => 440,
            Self::BadSession => 500,
            Self::ConnectionLost => 503,
            Self::RestartRequired => 515,
            Self::Unknown(code) => *code,
        }
    }

    pub fn action(&self) -> DisconnectAction {
        match self {
            Self::LoggedOut | Self::BadSession | Self::MultideviceMismatch => {
                DisconnectAction::ClearSession
            }
            Self::Replaced => DisconnectAction::ResetCounters,
            Self::Banned | Self::Outdated => DisconnectAction::Fail,
            Self::RestartRequired
            | Self::ConnectionLost
            | Self::ConnectionClosed
            | Self::TimedOut => DisconnectAction::Retry,
            Self::Unknown(_) => DisconnectAction::Manual,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => f.write_str("logged out"),
            Self::BadSession => f.write_str("bad session"),
            Self::MultideviceMismatch => f.write_str("multi-device mismatch"),
            Self::Replaced => f.write_str("replaced by another session"),
            Self::RestartRequired => f.write_str("restart required"),
            Self::ConnectionLost => f.write_str("connection lost"),
            Self::ConnectionClosed => f.write_str("connection closed"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Banned => f.write_str("banned"),
            Self::Outdated => f.write_str("client outdated"),
            Self::Unknown(code) => write!(f, "unknown ({code})"),
        }
    }
}

/// Lifecycle events emitted by a `MessagingClient` session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Handshake in progress.
    Connecting,
    /// New pairing code (raw QR payload) to display.
    Qr(String),
    /// Session authenticated and ready to send.
    Open,
    /// Session ended.
    Closed(DisconnectReason),
    /// Session could not be set up.
    Failed(String),
}

/// Payload of the `pong` realtime event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pong {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub whatsapp_status: ConnectionStatus,
}

/// Events pushed to realtime subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    ConnectionStatus(ConnectionStatus),
    /// QR image as a PNG data URL; `None` clears a previously shown code.
    QrCode(Option<String>),
    Pong(Pong),
    NewMessageLog(MessageLog),
}
