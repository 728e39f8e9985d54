//! Signaling connection lifecycle
//!
//! [`SignalingClient`] owns the persistent channel to the coordination
//! server: the `disconnected / connecting / connected / reconnecting`
//! state machine, the reader task for inbound messages, and the
//! reconnection driver for unexpected drops. At most one connection
//! attempt is outstanding at any time, and a user-initiated disconnect
//! cancels any pending reconnect timer so a zombie connection can never
//! resurrect a session the user already closed.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ReconnectConfig;
use crate::error::{SessionError, SessionResult};
use crate::signaling::backoff::BackoffPolicy;
use crate::signaling::protocol::{ClientMessage, ServerMessage};
use crate::signaling::transport::{SignalingConnection, SignalingTransport};

/// Connection states of the signaling channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        write!(f, "{}", s)
    }
}

/// Notifications pushed to the session controller
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingNotice {
    /// An inbound server message
    Message(ServerMessage),
    /// The channel recovered after an unexpected drop
    Reconnected,
    /// Every reconnect attempt failed; live updates have stopped
    ///
    /// Non-fatal: local media and existing transports keep working in a
    /// degraded mode until a manual reconnect or leave.
    Exhausted { attempts: u32 },
}

/// Owner of the signaling connection lifecycle
pub struct SignalingClient {
    transport: Arc<dyn SignalingTransport>,
    url: String,
    reconnect_config: ReconnectConfig,
    state_tx: watch::Sender<ConnectionState>,
    outbound: Mutex<Option<mpsc::Sender<ClientMessage>>>,
    notices: mpsc::UnboundedSender<SignalingNotice>,
    shutdown_tx: watch::Sender<bool>,
    attempt_counter: AtomicU32,
    reconnect_in_flight: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SignalingClient {
    /// Create a client over the given transport
    ///
    /// The returned receiver carries inbound messages and lifecycle
    /// notices for the session controller.
    pub fn new(
        transport: Arc<dyn SignalingTransport>,
        url: impl Into<String>,
        reconnect_config: ReconnectConfig,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SignalingNotice>) {
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, _) = watch::channel(false);
        let client = Arc::new(Self {
            transport,
            url: url.into(),
            reconnect_config,
            state_tx,
            outbound: Mutex::new(None),
            notices: notices_tx,
            shutdown_tx,
            attempt_counter: AtomicU32::new(0),
            reconnect_in_flight: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        });
        (client, notices_rx)
    }

    /// Establish the connection
    ///
    /// Fails with `SignalingUnavailable` if the transport cannot connect,
    /// and with `InvalidState` if a connection or attempt already exists
    /// (at most one outstanding attempt is permitted).
    pub async fn connect(self: &Arc<Self>) -> SessionResult<()> {
        let current = self.state();
        if current != ConnectionState::Disconnected {
            return Err(SessionError::invalid_state("disconnected", current.to_string()));
        }
        let _ = self.shutdown_tx.send(false);
        self.set_state(ConnectionState::Connecting);
        match self.transport.connect(&self.url).await {
            Ok(conn) => {
                self.install(conn);
                self.set_state(ConnectionState::Connected);
                info!(url = %self.url, "Signaling connected");
                Ok(())
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                warn!(url = %self.url, error = %e, "Signaling connect failed");
                Err(e)
            }
        }
    }

    /// Send a message over the current connection
    pub async fn send(&self, message: ClientMessage) -> SessionResult<()> {
        let tx = self.outbound.lock().clone();
        let Some(tx) = tx else {
            return Err(SessionError::signaling_unavailable("not connected"));
        };
        tx.send(message)
            .await
            .map_err(|_| SessionError::signaling_unavailable("connection closed"))
    }

    /// User-initiated teardown
    ///
    /// Cancels the reader and any pending reconnect timer. Idempotent.
    pub fn disconnect(&self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        *self.outbound.lock() = None;
        self.reconnect_in_flight.store(false, Ordering::SeqCst);
        self.attempt_counter.store(0, Ordering::SeqCst);
        self.set_state(ConnectionState::Disconnected);
        debug!("Signaling disconnected by user");
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Watch connection state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Reconnect attempts made in the current recovery cycle; zero once
    /// connected or idle
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempt_counter.load(Ordering::SeqCst)
    }

    /// Tasks (reader or reconnect driver) that have not finished
    pub fn pending_task_count(&self) -> usize {
        self.tasks.lock().iter().filter(|t| !t.is_finished()).count()
    }

    fn set_state(&self, state: ConnectionState) {
        let _ = self.state_tx.send(state);
    }

    /// Wire up an established connection: store the sink and spawn the
    /// reader. When the inbound stream closes without a user-initiated
    /// shutdown, the reader hands off to the reconnect driver.
    fn install(self: &Arc<Self>, conn: SignalingConnection) {
        *self.outbound.lock() = Some(conn.outbound);
        let client = Arc::clone(self);
        let mut inbound = conn.inbound;
        let handle = tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                let _ = client.notices.send(SignalingNotice::Message(message));
            }
            if !*client.shutdown_tx.borrow() {
                warn!("Signaling connection lost, starting recovery");
                client.spawn_reconnect();
            }
        });
        self.prune_tasks();
        self.tasks.lock().push(handle);
    }

    fn spawn_reconnect(self: &Arc<Self>) {
        // Single-driver guard: a second drop while recovery is already
        // running must not start a competing attempt loop.
        if self.reconnect_in_flight.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.outbound.lock() = None;
        let client = Arc::clone(self);
        let handle = tokio::spawn(async move { client.run_reconnect().await });
        self.tasks.lock().push(handle);
    }

    async fn run_reconnect(self: Arc<Self>) {
        let mut policy = BackoffPolicy::new(&self.reconnect_config);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            let Some(delay) = policy.next_delay() else {
                self.set_state(ConnectionState::Disconnected);
                error!(
                    attempts = policy.attempts_made(),
                    "Signaling reconnection exhausted"
                );
                let _ = self
                    .notices
                    .send(SignalingNotice::Exhausted { attempts: policy.attempts_made() });
                break;
            };
            self.set_state(ConnectionState::Reconnecting);
            self.attempt_counter.store(policy.attempts_made(), Ordering::SeqCst);
            debug!(
                attempt = policy.attempts_made(),
                delay_ms = delay.as_millis() as u64,
                "Reconnect attempt scheduled"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.changed() => break,
            }
            if *shutdown_rx.borrow() {
                break;
            }
            match self.transport.connect(&self.url).await {
                Ok(conn) => {
                    self.install(conn);
                    self.set_state(ConnectionState::Connected);
                    self.attempt_counter.store(0, Ordering::SeqCst);
                    info!(attempts = policy.attempts_made(), "Signaling reconnected");
                    let _ = self.notices.send(SignalingNotice::Reconnected);
                    break;
                }
                Err(e) => {
                    warn!(
                        attempt = policy.attempts_made(),
                        error = %e,
                        "Reconnect attempt failed"
                    );
                }
            }
        }
        self.reconnect_in_flight.store(false, Ordering::SeqCst);
    }

    fn prune_tasks(&self) {
        self.tasks.lock().retain(|t| !t.is_finished());
    }
}
