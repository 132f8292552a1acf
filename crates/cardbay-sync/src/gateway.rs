//! Connection manager.
//!
//! Holds exactly one live transport per authenticated session, gated by the
//! session token: setting a session connects, clearing it disconnects and
//! tears the caches down. Event bindings are one reader task spawned once per
//! session — the transport reconnecting does NOT respawn it, so a handler can
//! never run twice for one delivery no matter how often the link flaps.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cardbay_types::events::{ClientCommand, ServerEvent, TransportEvent};

use crate::effects::{EffectSink, run_effects};
use crate::engine::{Session, SyncEngine};
use crate::transport::Transport;

/// Credentials for one authenticated session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: Uuid,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Re-emit `join_order` for the open conversation when the transport
    /// reconnects, so the server re-sends `order_history` and the room view
    /// converges without a manual re-entry.
    pub rejoin_on_reconnect: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rejoin_on_reconnect: true,
        }
    }
}

/// The owned connection instance for one browser-session equivalent. Clones
/// share the same engine and transport.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn EffectSink>,
    config: GatewayConfig,
    engine: Mutex<SyncEngine>,
    connected_tx: watch::Sender<bool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Gateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn EffectSink>,
        config: GatewayConfig,
    ) -> Self {
        let (connected_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(GatewayInner {
                transport,
                sink,
                config,
                engine: Mutex::new(SyncEngine::new()),
                connected_tx,
                reader: Mutex::new(None),
            }),
        }
    }

    /// Auth gate. `Some`: store the session, bind the reader task (once), and
    /// connect with the token attached. `None`: unbind, force-disconnect, and
    /// clear session state and caches.
    pub fn set_session(&self, session: Option<AuthSession>) {
        match session {
            Some(auth) => {
                info!("session established for {}", auth.user_id);
                self.with_engine(|engine| {
                    engine.set_session(Session {
                        user_id: auth.user_id,
                        is_admin: auth.is_admin,
                    });
                });

                // Bind before connecting so the Connected signal is never
                // missed; bind at most once per session.
                self.spawn_reader();

                if let Err(err) = self.inner.transport.connect(&auth.token) {
                    warn!("gateway connect failed: {}", err);
                    self.inner.connected_tx.send_replace(false);
                }
            }
            None => {
                info!("session cleared, disconnecting gateway");
                if let Some(handle) = self
                    .inner
                    .reader
                    .lock()
                    .expect("reader lock poisoned")
                    .take()
                {
                    handle.abort();
                }
                self.inner.transport.disconnect();
                self.with_engine(SyncEngine::clear_session);
                self.inner.connected_tx.send_replace(false);
            }
        }
    }

    /// Connection status for UI indicators.
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.inner.connected_tx.subscribe()
    }

    /// Run a closure against the engine (cache seeding, reads, assertions).
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut SyncEngine) -> R) -> R {
        let mut engine = self.inner.engine.lock().expect("engine lock poisoned");
        f(&mut engine)
    }

    // ---- UI actions ----

    pub fn send_typing(&self, order_id: Uuid, is_typing: bool) {
        self.emit(ClientCommand::Typing {
            order_id,
            is_typing,
        });
    }

    /// Open a conversation view and join its room; the server answers with
    /// `order_history`.
    pub fn open_conversation(&self, order_id: Uuid) {
        self.with_engine(|engine| engine.open_conversation(order_id));
        self.emit(ClientCommand::JoinOrder { order_id });
    }

    pub fn enter_room(&self) {
        self.with_engine(SyncEngine::enter_room);
    }

    pub fn leave_room(&self) {
        self.with_engine(SyncEngine::leave_room);
    }

    /// Leave a conversation: drop its room membership and typing entry. The
    /// cached messages stay for fast re-entry.
    pub fn leave_conversation(&self, order_id: Uuid) {
        self.with_engine(|engine| engine.leave_conversation(order_id));
        self.emit(ClientCommand::LeaveOrder { order_id });
    }

    fn emit(&self, command: ClientCommand) {
        if let Err(err) = self.inner.transport.emit(command) {
            debug!("emit dropped: {}", err);
        }
    }

    /// Spawn the single reader task for this session, if not already running.
    fn spawn_reader(&self) {
        let mut reader = self.inner.reader.lock().expect("reader lock poisoned");
        if reader.is_some() {
            return;
        }

        let inner = self.inner.clone();
        let mut events = inner.transport.subscribe();
        *reader = Some(tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("gateway receiver lagged by {} events", n);
                        continue;
                    }
                    Err(_) => break,
                };

                match event {
                    TransportEvent::Connected => {
                        inner.connected_tx.send_replace(true);
                        if inner.config.rejoin_on_reconnect {
                            let open = {
                                let engine =
                                    inner.engine.lock().expect("engine lock poisoned");
                                engine.view().open_order
                            };
                            if let Some(order_id) = open {
                                debug!("rejoining conversation {} after reconnect", order_id);
                                if let Err(err) =
                                    inner.transport.emit(ClientCommand::JoinOrder { order_id })
                                {
                                    debug!("rejoin emit dropped: {}", err);
                                }
                            }
                        }
                    }
                    TransportEvent::Disconnected => {
                        inner.connected_tx.send_replace(false);
                    }
                    TransportEvent::ConnectError(err) => {
                        warn!("gateway connect error: {}", err);
                        inner.connected_tx.send_replace(false);
                    }
                    TransportEvent::Frame { event, payload } => {
                        match ServerEvent::decode(&event, payload) {
                            Some(decoded) => {
                                let effects = {
                                    let mut engine =
                                        inner.engine.lock().expect("engine lock poisoned");
                                    engine.handle(decoded)
                                };
                                run_effects(inner.sink.as_ref(), effects);
                            }
                            None => debug!("dropping undecodable frame '{}'", event),
                        }
                    }
                }
            }
        }));
    }
}

impl Drop for GatewayInner {
    fn drop(&mut self) {
        if let Some(handle) = self.reader.lock().expect("reader lock poisoned").take() {
            handle.abort();
        }
    }
}
