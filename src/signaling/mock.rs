//! Mock signaling transport
//!
//! In-memory implementation of [`SignalingTransport`] with a server-side
//! handle for tests: inbound messages can be injected, the connection can
//! be dropped to simulate a network failure, and connect attempts can be
//! scripted to fail.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{SessionError, SessionResult};
use crate::signaling::protocol::{ClientMessage, ServerMessage};
use crate::signaling::transport::{SignalingConnection, SignalingTransport};

struct ServerSide {
    inbound_tx: mpsc::Sender<ServerMessage>,
    outbound_rx: mpsc::Receiver<ClientMessage>,
}

#[derive(Default)]
struct MockState {
    /// Connect attempts that will fail before one succeeds
    failures_remaining: u32,
    /// Fail every connect attempt, regardless of count
    always_fail: bool,
    /// Artificial latency before each connect resolves
    connect_delay: Option<std::time::Duration>,
    connect_count: u32,
    server: Option<ServerSide>,
}

/// Scriptable in-memory signaling server endpoint
#[derive(Default)]
pub struct MockSignalingTransport {
    state: Mutex<MockState>,
}

impl MockSignalingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `n` connect attempts with `SignalingUnavailable`
    pub fn fail_next_connects(&self, n: u32) {
        self.state.lock().failures_remaining = n;
    }

    /// Fail every connect attempt until cleared
    pub fn fail_all_connects(&self, fail: bool) {
        self.state.lock().always_fail = fail;
    }

    /// Delay each connect attempt by `delay` before it resolves
    pub fn set_connect_delay(&self, delay: Option<std::time::Duration>) {
        self.state.lock().connect_delay = delay;
    }

    /// Total connect attempts observed, including failed ones
    pub fn connect_count(&self) -> u32 {
        self.state.lock().connect_count
    }

    /// Deliver a message to the client over the current connection
    pub async fn push(&self, message: ServerMessage) {
        let tx = {
            let state = self.state.lock();
            state.server.as_ref().map(|s| s.inbound_tx.clone())
        };
        if let Some(tx) = tx {
            let _ = tx.send(message).await;
        }
    }

    /// Drop the current connection, as a network failure would
    pub fn drop_connection(&self) {
        self.state.lock().server = None;
    }

    /// Whether a connection is currently established
    pub fn is_connected(&self) -> bool {
        self.state.lock().server.is_some()
    }

    /// Drain every message the client has sent on the current connection
    pub fn take_sent(&self) -> Vec<ClientMessage> {
        let mut state = self.state.lock();
        let mut sent = Vec::new();
        if let Some(server) = state.server.as_mut() {
            while let Ok(msg) = server.outbound_rx.try_recv() {
                sent.push(msg);
            }
        }
        sent
    }
}

#[async_trait]
impl SignalingTransport for MockSignalingTransport {
    async fn connect(&self, _url: &str) -> SessionResult<SignalingConnection> {
        let delay = self.state.lock().connect_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock();
        state.connect_count += 1;
        if state.always_fail {
            return Err(SessionError::signaling_unavailable("connection refused"));
        }
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(SessionError::signaling_unavailable("connection refused"));
        }
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        state.server = Some(ServerSide { inbound_tx, outbound_rx });
        Ok(SignalingConnection {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
