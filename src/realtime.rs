//! Realtime channel: a WebSocket at `/ws` carrying `{ "event", "data" }` frames.
//!
//! Server to client: `connection-status`, `qr-code`, `pong`, `new-message-log`.
//! Client to server: `connect-whatsapp`, `reset-connection`,
//! `disconnect-whatsapp`, `ping`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wasend_core::event::{Pong, ServerEvent};

use crate::api::{check_auth, token_matches, AppState};

/// Commands a browser may send.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientCommand {
    ConnectWhatsapp,
    ResetConnection,
    DisconnectWhatsapp,
    Ping,
}

#[derive(Debug, Deserialize)]
pub struct WsAuth {
    token: Option<String>,
}

/// `GET /ws`: upgrade. Browsers cannot set headers here, so `?token=` is
/// accepted in place of the bearer header.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(auth): Query<WsAuth>,
) -> Response {
    let query_ok = auth
        .token
        .as_deref()
        .is_some_and(|t| token_matches(t, &state.api_key));
    if !query_ok {
        if let Some(err) = check_auth(&headers, &state.api_key) {
            return err.into_response();
        }
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!("realtime event serialization failed: {e}");
            Ok(())
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    info!("realtime client {client_id} connected");

    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.session.subscribe();

    // Current state first, so a fresh page does not wait for the next change.
    let status = ServerEvent::ConnectionStatus(state.session.status().await);
    if send_event(&mut sender, &status).await.is_err() {
        return;
    }
    if let Some(qr) = state.session.current_qr().await {
        if send_event(&mut sender, &ServerEvent::QrCode(Some(qr)))
            .await
            .is_err()
        {
            return;
        }
    }

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("realtime client {client_id} lagged, {n} events skipped");
                }
                Err(RecvError::Closed) => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_command(&state, text.as_str()).await {
                        if send_event(&mut sender, &reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("realtime client {client_id} read error: {e}");
                    break;
                }
            },
        }
    }

    info!("realtime client {client_id} disconnected");
}

/// Act on one client frame. Returns a reply meant for that client only.
pub async fn handle_command(state: &AppState, frame: &str) -> Option<ServerEvent> {
    let command: ClientCommand = match serde_json::from_str(frame) {
        Ok(c) => c,
        Err(e) => {
            warn!("ignoring realtime frame: {e}");
            return None;
        }
    };
    debug!("realtime command {command:?}");

    match command {
        ClientCommand::ConnectWhatsapp => {
            match state.session.request_connect().await {
                Ok(outcome) => info!("connect requested: {}", outcome.message()),
                Err(e) => warn!("connect request failed: {e}"),
            }
            None
        }
        ClientCommand::ResetConnection => {
            if let Err(e) = state.session.reset().await {
                warn!("reset failed: {e}");
            }
            None
        }
        ClientCommand::DisconnectWhatsapp => {
            if let Err(e) = state.session.disconnect().await {
                warn!("disconnect failed: {e}");
            }
            None
        }
        ClientCommand::Ping => Some(ServerEvent::Pong(Pong {
            timestamp: Utc::now().timestamp_millis(),
            whatsapp_status: state.session.status().await,
        })),
    }
}
