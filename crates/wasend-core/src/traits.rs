use crate::{error::WasendError, event::ClientEvent};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Messaging client trait: the wire.
///
/// Wraps a messaging-protocol library behind the handful of calls the
/// session manager and dispatcher need, so that both can run against a
/// scripted client in tests.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Human-readable client name.
    fn name(&self) -> &str;

    /// Open a protocol session.
    ///
    /// Lifecycle events (QR codes, open, close) for this session arrive on
    /// the returned receiver. A previous session, if any, is torn down first.
    async fn connect(&self) -> Result<mpsc::Receiver<ClientEvent>, WasendError>;

    /// Send a text message to a normalized JID. Returns the message id.
    async fn send_text(&self, jid: &str, text: &str) -> Result<String, WasendError>;

    /// Whether a session is currently open.
    async fn is_connected(&self) -> bool;

    /// Close the socket, keeping stored credentials.
    async fn disconnect(&self) -> Result<(), WasendError>;

    /// Delete stored credentials so the next connect pairs from scratch.
    async fn clear_session(&self) -> Result<(), WasendError>;
}
