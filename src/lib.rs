//! # Roomcast Client Core
//!
//! Session coordination layer for Roomcast multi-party calls. The crate
//! owns everything between the application and the platform primitives:
//! the call lifecycle state machine, local device and track management,
//! the signaling channel with its reconnection policy, per-participant
//! media transports, the participant roster, and the session-scoped chat
//! bridge.
//!
//! The platform itself (capture APIs, the WebSocket-like signaling
//! transport, the peer-connection library, the chat store) is consumed
//! through trait seams, so the whole layer runs unmodified against the
//! in-crate mocks in tests.
//!
//! ## Architecture
//!
//! - [`session::CallSessionController`] - top-level state machine and
//!   public control surface (join, leave, toggles)
//! - [`media::MediaDeviceManager`] - exclusive owner of local capture
//!   tracks; one outgoing video slot, camera or screen, never both
//! - [`signaling::SignalingClient`] - connection lifecycle and linear
//!   backoff reconnection
//! - [`peer::PeerConnectionRegistry`] - per-participant media transports
//! - [`roster::ParticipantRoster`] - derived participant list
//! - [`chat::ChatStreamBridge`] - ordered, deduplicated session chat
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomcast_client_core::config::SessionConfig;
//! use roomcast_client_core::session::{LocalIdentity, SessionControllerBuilder, SessionId, SessionKind};
//! use roomcast_client_core::media::mock::MockMediaDevices;
//! use roomcast_client_core::signaling::mock::MockSignalingTransport;
//! use roomcast_client_core::peer::mock::MockPeerFactory;
//! use roomcast_client_core::chat::mock::MockChatFeed;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = SessionControllerBuilder::new()
//!         .config(SessionConfig::new("wss://signal.roomcast.app/ws"))
//!         .identity(LocalIdentity::new("u-1", "Alice"))
//!         .media_devices(MockMediaDevices::new())
//!         .signaling_transport(MockSignalingTransport::new())
//!         .peer_factory(MockPeerFactory::new())
//!         .chat_feed(MockChatFeed::new())
//!         .build()?;
//!
//!     let call = controller.join(SessionId::from("room-7"), SessionKind::Video).await?;
//!     println!("joined {}", call.session_id);
//!
//!     controller.toggle_microphone().await?;
//!     controller.leave().await;
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod peer;
pub mod roster;
pub mod session;
pub mod signaling;

pub use chat::{ChatMessage, ChatStreamBridge, DeliveryState};
pub use config::{MediaConstraints, ReconnectConfig, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use events::{EventEmitter, EventSubscription, SessionEvent, SessionEventHandler};
pub use media::MediaDeviceManager;
pub use peer::PeerConnectionRegistry;
pub use roster::{Participant, ParticipantRoster};
pub use session::{
    CallSession, CallSessionController, LocalIdentity, LocalMediaState, SessionControllerBuilder,
    SessionId, SessionKind, SessionState,
};
pub use signaling::{ConnectionState, SignalingClient};
