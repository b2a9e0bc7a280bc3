//! Connection lifecycle: one messaging session, its status, QR code and
//! reconnect policy.
//!
//! Every accepted connect bumps a generation counter. Events and scheduled
//! retries carry the generation they belong to, so anything left over from
//! a torn-down session is dropped instead of overwriting fresh state.

mod policy;


pub use policy::{AttemptTracker, Denied};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, warn};
use wasend_channels::whatsapp::qr_data_url;
use wasend_core::config::ConnectionConfig;
use wasend_core::error::WasendError;
use wasend_core::event::{
    ClientEvent, ConnectionStatus, DisconnectAction, DisconnectReason, ServerEvent,
};
use wasend_core::traits::MessagingClient;

/// Result of a connect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new attempt started.
    Started,
    /// A session is already connecting, waiting for a scan, or open.
    AlreadyActive(ConnectionStatus),
    /// Too soon after the previous attempt.
    Cooldown(Duration),
    /// Attempt cap reached; a reset is required.
    AttemptLimit,
}

impl ConnectOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::Started => "connection attempt started".to_string(),
            Self::AlreadyActive(status) => format!("connection already active ({status})"),
            Self::Cooldown(left) => format!(
                "cooling down, try again in {}s",
                left.as_secs() + u64::from(left.subsec_nanos() > 0)
            ),
            Self::AttemptLimit => "too many attempts, reset the connection first".to_string(),
        }
    }
}

/// Point-in-time view of the session for status endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    #[serde(rename = "hasQR")]
    pub has_qr: bool,
    pub is_connecting: bool,
    pub attempts: u32,
    pub max_attempts: u32,
    pub can_attempt: bool,
    pub cooldown_remaining_secs: u64,
    pub last_error: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

struct SessionState {
    status: ConnectionStatus,
    /// Current QR as a PNG data URL.
    qr: Option<String>,
    tracker: AttemptTracker,
    generation: u64,
    last_error: Option<String>,
    last_attempt_at: Option<DateTime<Utc>>,
}

/// Owns the messaging client's lifecycle and broadcasts its changes.
pub struct SessionManager {
    client: Arc<dyn MessagingClient>,
    config: ConnectionConfig,
    events: broadcast::Sender<ServerEvent>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(
        client: Arc<dyn MessagingClient>,
        config: ConnectionConfig,
        events: broadcast::Sender<ServerEvent>,
    ) -> Arc<Self> {
        let tracker = AttemptTracker::new(&config);
        Arc::new(Self {
            client,
            config,
            events,
            state: Mutex::new(SessionState {
                status: ConnectionStatus::Disconnected,
                qr: None,
                tracker,
                generation: 0,
                last_error: None,
                last_attempt_at: None,
            }),
        })
    }

    pub fn client(&self) -> &Arc<dyn MessagingClient> {
        &self.client
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.state.lock().await.status
    }

    /// Current QR code as a data URL, if one is waiting to be scanned.
    pub async fn current_qr(&self) -> Option<String> {
        self.state.lock().await.qr.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let st = self.state.lock().await;
        let now = Instant::now();
        let remaining = st.tracker.cooldown_remaining(now);
        SessionSnapshot {
            status: st.status,
            has_qr: st.qr.is_some(),
            is_connecting: matches!(
                st.status,
                ConnectionStatus::Connecting | ConnectionStatus::QrReady
            ),
            attempts: st.tracker.attempts(),
            max_attempts: st.tracker.max_attempts(),
            can_attempt: st.status.accepts_connect() && st.tracker.can_attempt(now),
            cooldown_remaining_secs: remaining.as_secs()
                + u64::from(remaining.subsec_nanos() > 0),
            last_error: st.last_error.clone(),
            last_attempt_at: st.last_attempt_at,
        }
    }

    fn emit(&self, event: ServerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn set_status(&self, st: &mut SessionState, status: ConnectionStatus) {
        if st.status != status {
            debug!("session status {} -> {status}", st.status);
        }
        st.status = status;
        self.emit(ServerEvent::ConnectionStatus(status));
    }

    fn set_qr(&self, st: &mut SessionState, qr: Option<String>) {
        if st.qr.is_none() && qr.is_none() {
            return;
        }
        st.qr = qr.clone();
        self.emit(ServerEvent::QrCode(qr));
    }

    /// Start a connection attempt if the state and the policy allow one.
    pub async fn request_connect(self: &Arc<Self>) -> Result<ConnectOutcome, WasendError> {
        let generation = {
            let mut st = self.state.lock().await;
            if !st.status.accepts_connect() {
                return Ok(ConnectOutcome::AlreadyActive(st.status));
            }

            let now = Instant::now();
            match st.tracker.check(now) {
                Ok(()) => {}
                // Refusals are announced, not stored.
                Err(Denied::Cooldown(left)) => {
                    info!("connect refused: cooldown ({}s left)", left.as_secs());
                    self.emit(ServerEvent::ConnectionStatus(ConnectionStatus::Cooldown));
                    return Ok(ConnectOutcome::Cooldown(left));
                }
                Err(Denied::AttemptCap) => {
                    warn!(
                        "connect refused: {} attempts made, reset required",
                        st.tracker.attempts()
                    );
                    self.emit(ServerEvent::ConnectionStatus(ConnectionStatus::Cooldown));
                    return Ok(ConnectOutcome::AttemptLimit);
                }
            }

            st.tracker.record(now);
            st.last_attempt_at = Some(Utc::now());
            st.last_error = None;
            st.generation += 1;
            self.set_qr(&mut st, None);
            self.set_status(&mut st, ConnectionStatus::Connecting);
            info!(
                "connecting via {} (attempt {}/{})",
                self.client.name(),
                st.tracker.attempts(),
                st.tracker.max_attempts()
            );
            st.generation
        };

        match self.client.connect().await {
            Ok(rx) => {
                let st = self.state.lock().await;
                if st.generation != generation {
                    // Reset or disconnect ran while the client was connecting.
                    // The lock stays held so no newer connect can start meanwhile.
                    info!("session {generation} superseded while connecting, closing it");
                    if let Err(e) = self.client.disconnect().await {
                        warn!("closing superseded session failed: {e}");
                    }
                    return Ok(ConnectOutcome::AlreadyActive(st.status));
                }
                drop(st);
                tokio::spawn(Arc::clone(self).pump(generation, rx));
                Ok(ConnectOutcome::Started)
            }
            Err(e) => {
                error!("connect failed: {e}");
                let mut st = self.state.lock().await;
                if st.generation == generation {
                    st.last_error = Some(e.to_string());
                    self.set_status(&mut st, ConnectionStatus::Error);
                }
                Err(e)
            }
        }
    }

    /// Drain a session's events until it ends or is superseded.
    async fn pump(self: Arc<Self>, generation: u64, mut rx: mpsc::Receiver<ClientEvent>) {
        while let Some(event) = rx.recv().await {
            if !self.handle_event(generation, event).await {
                break;
            }
        }
        debug!("session {generation} event stream ended");
    }

    /// Apply one client event. Returns `false` once the session is finished.
    async fn handle_event(self: &Arc<Self>, generation: u64, event: ClientEvent) -> bool {
        let mut st = self.state.lock().await;
        if st.generation != generation {
            debug!("dropping event from stale session {generation}: {event:?}");
            return false;
        }

        match event {
            ClientEvent::Connecting => {
                self.set_status(&mut st, ConnectionStatus::Connecting);
            }
            ClientEvent::Qr(code) => match qr_data_url(&code, self.config.qr_scale) {
                Ok(url) => {
                    self.set_qr(&mut st, Some(url));
                    self.set_status(&mut st, ConnectionStatus::QrReady);
                }
                Err(e) => {
                    warn!("QR render failed: {e}");
                    st.last_error = Some(e.to_string());
                }
            },
            ClientEvent::Open => {
                st.tracker.reset();
                st.last_error = None;
                self.set_qr(&mut st, None);
                self.set_status(&mut st, ConnectionStatus::Connected);
                info!("session open");
            }
            ClientEvent::Failed(msg) => {
                warn!("session failed: {msg}");
                st.last_error = Some(msg);
                self.set_qr(&mut st, None);
                self.set_status(&mut st, ConnectionStatus::Error);
            }
            ClientEvent::Closed(reason) => {
                self.set_qr(&mut st, None);
                self.set_status(&mut st, ConnectionStatus::Disconnected);
                drop(st);
                return self.apply_disconnect(generation, reason).await;
            }
        }
        true
    }

    async fn apply_disconnect(self: &Arc<Self>, generation: u64, reason: DisconnectReason) -> bool {
        let action = reason.action();
        info!("session closed: {reason} (code {}, {action:?})", reason.code());

        match action {
            DisconnectAction::ClearSession => {
                {
                    let mut st = self.state.lock().await;
                    st.generation += 1;
                    st.tracker.reset();
                    st.last_error = Some(reason.to_string());
                }
                if let Err(e) = self.client.clear_session().await {
                    error!("failed to clear session after {reason}: {e}");
                }
                false
            }
            DisconnectAction::ResetCounters => {
                let mut st = self.state.lock().await;
                st.tracker.reset();
                st.last_error = Some(reason.to_string());
                true
            }
            DisconnectAction::Fail => {
                {
                    let mut st = self.state.lock().await;
                    st.generation += 1;
                    st.last_error = Some(reason.to_string());
                    self.set_status(&mut st, ConnectionStatus::Error);
                }
                if let Err(e) = self.client.disconnect().await {
                    warn!("disconnect after {reason} failed: {e}");
                }
                false
            }
            DisconnectAction::Retry => {
                let st = self.state.lock().await;
                let attempts = st.tracker.attempts();
                if attempts < self.config.max_auto_retries {
                    let delay = Duration::from_secs(self.config.retry_delay_secs)
                        .max(st.tracker.cooldown_remaining(Instant::now()));
                    drop(st);
                    self.schedule_retry(generation, delay);
                } else {
                    info!("auto-retry budget spent ({attempts} attempts), waiting for manual connect");
                }
                true
            }
            DisconnectAction::Manual => {
                self.state.lock().await.last_error = Some(reason.to_string());
                true
            }
        }
    }

    fn schedule_retry(self: &Arc<Self>, generation: u64, delay: Duration) {
        info!("reconnecting in {}s", delay.as_secs());
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let st = this.state.lock().await;
                if st.generation != generation || !st.status.accepts_connect() {
                    debug!("scheduled retry for session {generation} no longer needed");
                    return;
                }
            }
            match this.request_connect().await {
                Ok(outcome) => info!("auto-retry: {}", outcome.message()),
                Err(e) => warn!("auto-retry failed: {e}"),
            }
        });
    }

    /// Tear down the session, wipe stored credentials and start over.
    pub async fn reset(&self) -> Result<(), WasendError> {
        {
            let mut st = self.state.lock().await;
            st.generation += 1;
            st.tracker.reset();
            st.last_error = None;
            st.last_attempt_at = None;
            self.set_qr(&mut st, None);
            self.set_status(&mut st, ConnectionStatus::Disconnected);
        }
        info!("session reset");
        self.client.clear_session().await
    }

    /// Close the socket but keep credentials; counters are reset.
    pub async fn disconnect(&self) -> Result<(), WasendError> {
        {
            let mut st = self.state.lock().await;
            st.generation += 1;
            st.tracker.reset();
            self.set_qr(&mut st, None);
            self.set_status(&mut st, ConnectionStatus::Disconnected);
        }
        info!("session disconnected on request");
        self.client.disconnect().await
    }

    /// Stop the session for process exit without emitting anything.
    pub async fn shutdown(&self) {
        self.state.lock().await.generation += 1;
        if let Err(e) = self.client.disconnect().await {
            warn!("session shutdown: {e}");
        }
    }
}
