//! WhatsApp client: pure Rust implementation via `whatsapp-rust`.
//!
//! Uses the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done by scanning a QR code, like WhatsApp Web.
//! Session is persisted to `{session_dir}/whatsapp.db`.

mod bot;
mod channel;
mod events;
mod qr;

#[cfg(test)]
mod tests;

pub use qr::{generate_qr_image, generate_qr_terminal, qr_data_url};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;
use wasend_core::config::WhatsAppConfig;
use wasend_core::error::WasendError;
use whatsapp_rust::client::Client;

/// A bot started by `connect()` and not yet torn down.
pub(super) struct RunningBot {
    pub(super) client: Arc<Client>,
    pub(super) handle: JoinHandle<()>,
}

/// WhatsApp client using the WhatsApp Web protocol.
pub struct WhatsAppClient {
    pub(super) config: WhatsAppConfig,
    pub(super) session_dir: PathBuf,
    /// Client handle for sending: set on `Connected`, cleared on any close.
    pub(super) live: Arc<Mutex<Option<Arc<Client>>>>,
    pub(super) bot: Mutex<Option<RunningBot>>,
}

impl WhatsAppClient {
    /// Create a new WhatsApp client storing its session under `session_dir`.
    pub fn new(config: WhatsAppConfig, session_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            session_dir: session_dir.into(),
            live: Arc::new(Mutex::new(None)),
            bot: Mutex::new(None),
        }
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Get the session database path, creating its directory.
    pub(super) fn session_db_path(&self) -> Result<String, WasendError> {
        std::fs::create_dir_all(&self.session_dir)?;
        Ok(self
            .session_dir
            .join("whatsapp.db")
            .to_string_lossy()
            .to_string())
    }

    /// Stop the running bot, if any.
    pub(super) async fn teardown(&self) {
        *self.live.lock().await = None;
        if let Some(running) = self.bot.lock().await.take() {
            running.client.disconnect().await;
            running.handle.abort();
            info!("WhatsApp bot stopped");
        }
    }
}

/// Delete the session directory at `dir`, if present.
///
/// Safe to call while no bot is running; the next connect pairs from scratch.
pub fn remove_session(dir: &Path) -> Result<bool, WasendError> {
    if !dir.exists() {
        return Ok(false);
    }
    info!("deleting WhatsApp session at {}", dir.display());
    std::fs::remove_dir_all(dir)?;
    Ok(true)
}
