//! MessagingClient trait implementation for WhatsApp.

use super::{remove_session, WhatsAppClient};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};
use wacore_binary::jid::Jid;
use wasend_core::{error::WasendError, event::ClientEvent, traits::MessagingClient};

#[async_trait]
impl MessagingClient for WhatsAppClient {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn connect(&self) -> Result<mpsc::Receiver<ClientEvent>, WasendError> {
        // One bot at a time; a new session replaces the old one.
        self.teardown().await;

        let (tx, rx) = mpsc::channel(16);
        self.build_and_run_bot(tx).await?;
        Ok(rx)
    }

    /// Send a text message to a JID string (phone@s.whatsapp.net).
    async fn send_text(&self, jid: &str, text: &str) -> Result<String, WasendError> {
        let client = self
            .live
            .lock()
            .await
            .clone()
            .ok_or(WasendError::NotConnected)?;

        let parsed: Jid = jid
            .parse()
            .map_err(|e| WasendError::InvalidRecipient(format!("'{jid}': {e}")))?;

        let msg = waproto::whatsapp::Message {
            conversation: Some(text.to_string()),
            ..Default::default()
        };

        let msg_id = client
            .send_message(parsed, msg)
            .await
            .map_err(|e| WasendError::Client(format!("whatsapp send failed: {e}")))?;
        debug!("whatsapp sent {msg_id} to {jid}");
        Ok(msg_id)
    }

    async fn is_connected(&self) -> bool {
        self.live.lock().await.is_some()
    }

    async fn disconnect(&self) -> Result<(), WasendError> {
        self.teardown().await;
        info!("WhatsApp client disconnected");
        Ok(())
    }

    async fn clear_session(&self) -> Result<(), WasendError> {
        self.teardown().await;
        remove_session(&self.session_dir)?;
        Ok(())
    }
}
