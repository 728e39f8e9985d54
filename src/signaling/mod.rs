//! Signaling channel
//!
//! The out-of-band coordination channel: wire protocol types, the
//! transport seam, the linear backoff policy, and the client that owns
//! the connection lifecycle and reconnection driver.

pub mod backoff;
pub mod client;
pub mod mock;
pub mod protocol;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use client::{ConnectionState, SignalingClient, SignalingNotice};
pub use protocol::{ClientMessage, ParticipantInfo, ServerMessage};
pub use transport::{SignalingConnection, SignalingTransport};
