//! Bot lifecycle: building and running the WhatsApp bot.

use super::events::translate;
use super::qr::generate_qr_terminal;
use super::{RunningBot, WhatsAppClient};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use wasend_core::{error::WasendError, event::ClientEvent};
use whatsapp_rust::bot::Bot;
use whatsapp_rust::store::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

impl WhatsAppClient {
    /// Build a WhatsApp bot whose events feed `tx`, and run it in the background.
    pub(super) async fn build_and_run_bot(
        &self,
        tx: mpsc::Sender<ClientEvent>,
    ) -> Result<(), WasendError> {
        let db_path = self.session_db_path()?;
        info!("WhatsApp bot building (session: {db_path})...");

        let backend = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .map_err(|e| WasendError::Client(format!("whatsapp store init failed: {e}")))?,
        );

        let live_for_event = self.live.clone();
        let print_qr = self.config.print_qr;

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_device_props(
                Some(self.config.device_name.clone()),
                None,
                Some(waproto::whatsapp::device_props::PlatformType::Desktop),
            )
            .on_event(move |event, client| {
                let tx = tx.clone();
                let live = live_for_event.clone();
                async move {
                    let Some(translated) = translate(event) else {
                        return;
                    };
                    match &translated {
                        ClientEvent::Qr(code) => {
                            info!("WhatsApp QR code generated (scan to pair)");
                            if print_qr {
                                match generate_qr_terminal(code) {
                                    Ok(art) => info!("\n{art}"),
                                    Err(e) => warn!("terminal QR render failed: {e}"),
                                }
                            }
                        }
                        ClientEvent::Open => {
                            info!("WhatsApp connected");
                            *live.lock().await = Some(client);
                        }
                        ClientEvent::Closed(reason) => {
                            warn!("WhatsApp closed: {reason}");
                            *live.lock().await = None;
                        }
                        ClientEvent::Failed(msg) => {
                            warn!("WhatsApp failure: {msg}");
                            *live.lock().await = None;
                        }
                        ClientEvent::Connecting => {}
                    }
                    if tx.send(translated).await.is_err() {
                        warn!("WhatsApp event dropped: session listener gone");
                    }
                }
            })
            .build()
            .await
            .map_err(|e| WasendError::Client(format!("whatsapp bot build failed: {e}")))?;

        let client = bot.client();

        let handle = bot
            .run()
            .await
            .map_err(|e| WasendError::Client(format!("whatsapp bot run failed: {e}")))?;

        *self.bot.lock().await = Some(RunningBot { client, handle });

        info!("WhatsApp bot started");
        Ok(())
    }
}

