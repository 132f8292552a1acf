//! The connection seam.
//!
//! The gateway never talks to a socket directly; it drives a [`Transport`]
//! injected at session start. The production implementation wraps the host
//! application's realtime client; [`FakeTransport`] is an in-memory stand-in
//! that lets every lifecycle path be exercised without a server.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::broadcast;

use cardbay_types::events::{ClientCommand, TransportEvent};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,
    #[error("connect failed: {0}")]
    Connect(String),
}

/// A persistent bidirectional connection. Implementations own their own
/// retry/backoff; the caller only ever sees the lifecycle signals and frames
/// surfaced through [`Transport::subscribe`].
pub trait Transport: Send + Sync + 'static {
    /// Establish (or re-use) the connection, attaching the session token to
    /// the handshake.
    fn connect(&self, token: &str) -> Result<(), TransportError>;

    /// Drop the connection if there is one.
    fn disconnect(&self);

    /// Send a command. Fire-and-forget from the caller's point of view.
    fn emit(&self, command: ClientCommand) -> Result<(), TransportError>;

    /// Subscribe to lifecycle signals and inbound frames. Each call returns
    /// an independent receiver that sees events from this point on.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;
}

/// In-memory transport for tests. Records emitted commands and lets the test
/// inject frames and lifecycle signals as if a server had pushed them.
pub struct FakeTransport {
    events_tx: broadcast::Sender<TransportEvent>,
    connected: AtomicBool,
    tokens: Mutex<Vec<String>>,
    sent: Mutex<Vec<ClientCommand>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            events_tx,
            connected: AtomicBool::new(false),
            tokens: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Inject a raw transport event, as if pushed by the server side.
    pub fn push(&self, event: TransportEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Inject a named frame.
    pub fn push_frame(&self, event: &str, payload: serde_json::Value) {
        self.push(TransportEvent::Frame {
            event: event.to_string(),
            payload,
        });
    }

    /// Simulate the transport dropping and re-establishing the connection on
    /// its own (its built-in retry), without any client call.
    pub fn reconnect(&self) {
        self.push(TransportEvent::Disconnected);
        self.push(TransportEvent::Connected);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Tokens seen by `connect`, in call order.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().expect("token lock poisoned").clone()
    }

    /// Commands emitted so far, in call order.
    pub fn sent(&self) -> Vec<ClientCommand> {
        self.sent.lock().expect("sent lock poisoned").clone()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().expect("sent lock poisoned").clear();
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for FakeTransport {
    fn connect(&self, token: &str) -> Result<(), TransportError> {
        self.tokens
            .lock()
            .expect("token lock poisoned")
            .push(token.to_string());
        self.connected.store(true, Ordering::Release);
        self.push(TransportEvent::Connected);
        Ok(())
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::AcqRel) {
            self.push(TransportEvent::Disconnected);
        }
    }

    fn emit(&self, command: ClientCommand) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        self.sent
            .lock()
            .expect("sent lock poisoned")
            .push(command);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events_tx.subscribe()
    }
}
