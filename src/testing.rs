//! Scripted `MessagingClient` shared by the session, dispatch and API tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use wasend_core::config::{Config, StorageBackend};
use wasend_core::error::WasendError;
use wasend_core::event::ClientEvent;
use wasend_core::traits::MessagingClient;
use wasend_store::Store;

use crate::api::AppState;
use crate::dispatch::Dispatcher;
use crate::session::SessionManager;

#[derive(Default)]
pub struct MockClient {
    connected: AtomicBool,
    fail_connect: AtomicBool,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub clears: AtomicUsize,
    /// Sender for the most recent session.
    session: Mutex<Option<mpsc::Sender<ClientEvent>>>,
    /// JIDs whose sends fail.
    failing: Mutex<HashSet<String>>,
    /// `(jid, text)` of every successful send, in order.
    pub sent: Mutex<Vec<(String, String)>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected() -> Self {
        let client = Self::default();
        client.set_connected(true);
        client
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends_to(&self, jid: &str) {
        self.failing.lock().unwrap().insert(jid.to_string());
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn session_sender(&self) -> Option<mpsc::Sender<ClientEvent>> {
        self.session.lock().unwrap().clone()
    }

    /// Push an event into the current session, as the protocol library would.
    pub async fn emit(&self, event: ClientEvent) {
        if matches!(event, ClientEvent::Open) {
            self.set_connected(true);
        }
        if matches!(event, ClientEvent::Closed(_)) {
            self.set_connected(false);
        }
        let tx = self.session.lock().unwrap().clone();
        tx.expect("no session open").send(event).await.unwrap();
    }
}

#[async_trait]
impl MessagingClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self) -> Result<mpsc::Receiver<ClientEvent>, WasendError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            self.connects.fetch_add(1, Ordering::SeqCst);
            return Err(WasendError::Client("socket refused".into()));
        }
        let (tx, rx) = mpsc::channel(16);
        *self.session.lock().unwrap() = Some(tx);
        // Counted last so a test that sees the count can emit into this session.
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    async fn send_text(&self, jid: &str, text: &str) -> Result<String, WasendError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(WasendError::NotConnected);
        }
        if self.failing.lock().unwrap().contains(jid) {
            return Err(WasendError::Client(format!("send to {jid} rejected")));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((jid.to_string(), text.to_string()));
        Ok(format!("MSG{}", sent.len()))
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<(), WasendError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.set_connected(false);
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    async fn clear_session(&self) -> Result<(), WasendError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.disconnect().await
    }
}

/// Poll `check` until it holds, failing the test after two seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..400 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 2s");
}

/// API state over a memory store, a zero-delay dispatcher and `client`.
pub fn app_state(client: &Arc<MockClient>, api_key: Option<&str>) -> AppState {
    let mut config = Config::default();
    config.storage.backend = StorageBackend::Memory;
    config.api.api_key = api_key.unwrap_or_default().to_string();
    config.messaging.bulk_delay_ms = 0;
    config.connection.cooldown_secs = 0;

    let (events, _) = broadcast::channel(64);
    let dyn_client: Arc<dyn MessagingClient> = client.clone();
    let store = Store::memory();
    let session = SessionManager::new(dyn_client.clone(), config.connection.clone(), events.clone());
    let dispatcher = Arc::new(Dispatcher::new(
        dyn_client,
        store.clone(),
        config.messaging.clone(),
        events,
    ));
    AppState::new(&config, session, dispatcher, store)
}
