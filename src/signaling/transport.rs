//! Signaling transport abstraction
//!
//! The coordination layer does not own a socket; it owns a connection
//! *lifecycle* over whatever bidirectional channel the embedding provides
//! (a WebSocket in the browser build, a plain TCP stream in tests). A
//! connection is a pair of channels: the outbound sink and the inbound
//! stream. The transport signals an unexpected disconnect by closing the
//! inbound channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SessionResult;
use crate::signaling::protocol::{ClientMessage, ServerMessage};

/// One established signaling connection
#[derive(Debug)]
pub struct SignalingConnection {
    /// Sink for messages to the server
    pub outbound: mpsc::Sender<ClientMessage>,
    /// Stream of messages from the server; closes on disconnect
    pub inbound: mpsc::Receiver<ServerMessage>,
}

/// Factory for signaling connections
///
/// `connect` failures map to `SignalingUnavailable`, which is recoverable
/// and therefore feeds the reconnection policy.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    async fn connect(&self, url: &str) -> SessionResult<SignalingConnection>;
}
