//! Controller assembly
//!
//! The builder wires the platform seams (capture backend, signaling
//! transport, peer transport factory, chat store) together with the
//! configuration and local identity into a running controller.
//!
//! # Examples
//!
//! ```rust,no_run
//! use roomcast_client_core::config::SessionConfig;
//! use roomcast_client_core::session::{SessionControllerBuilder, LocalIdentity};
//! use roomcast_client_core::media::mock::MockMediaDevices;
//! use roomcast_client_core::signaling::mock::MockSignalingTransport;
//! use roomcast_client_core::peer::mock::MockPeerFactory;
//! use roomcast_client_core::chat::mock::MockChatFeed;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let rt = tokio::runtime::Runtime::new()?;
//! # rt.block_on(async {
//! let controller = SessionControllerBuilder::new()
//!     .config(SessionConfig::new("wss://signal.roomcast.app/ws"))
//!     .identity(LocalIdentity::new("u-1", "Alice"))
//!     .media_devices(MockMediaDevices::new())
//!     .signaling_transport(MockSignalingTransport::new())
//!     .peer_factory(MockPeerFactory::new())
//!     .chat_feed(MockChatFeed::new())
//!     .build()?;
//! # Ok::<(), roomcast_client_core::error::SessionError>(())
//! # })?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use url::Url;

use crate::chat::feed::{AttachmentUploader, ChatFeed};
use crate::chat::ChatStreamBridge;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::media::devices::MediaDevices;
use crate::media::MediaDeviceManager;
use crate::peer::registry::PeerTransportFactory;
use crate::peer::PeerConnectionRegistry;
use crate::session::controller::CallSessionController;
use crate::session::types::LocalIdentity;
use crate::signaling::transport::SignalingTransport;
use crate::signaling::SignalingClient;

/// Builder for [`CallSessionController`]
#[derive(Default)]
pub struct SessionControllerBuilder {
    config: Option<SessionConfig>,
    identity: Option<LocalIdentity>,
    media_devices: Option<Arc<dyn MediaDevices>>,
    signaling_transport: Option<Arc<dyn SignalingTransport>>,
    peer_factory: Option<Arc<dyn PeerTransportFactory>>,
    chat_feed: Option<Arc<dyn ChatFeed>>,
    uploader: Option<Arc<dyn AttachmentUploader>>,
}

impl SessionControllerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Local user identity from the identity provider
    pub fn identity(mut self, identity: LocalIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Platform capture backend
    pub fn media_devices(mut self, devices: Arc<dyn MediaDevices>) -> Self {
        self.media_devices = Some(devices);
        self
    }

    /// Signaling channel transport
    pub fn signaling_transport(mut self, transport: Arc<dyn SignalingTransport>) -> Self {
        self.signaling_transport = Some(transport);
        self
    }

    /// Factory for per-participant media transports
    pub fn peer_factory(mut self, factory: Arc<dyn PeerTransportFactory>) -> Self {
        self.peer_factory = Some(factory);
        self
    }

    /// Persistent chat store
    pub fn chat_feed(mut self, feed: Arc<dyn ChatFeed>) -> Self {
        self.chat_feed = Some(feed);
        self
    }

    /// Attachment upload service; optional, chat sends without
    /// attachments work regardless
    pub fn attachment_uploader(mut self, uploader: Arc<dyn AttachmentUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Validate the configuration and assemble a running controller
    pub fn build(self) -> SessionResult<Arc<CallSessionController>> {
        let config = self
            .config
            .ok_or_else(|| SessionError::invalid_config("config", "is required"))?;
        let identity = self
            .identity
            .ok_or_else(|| SessionError::invalid_config("identity", "is required"))?;
        let devices = self
            .media_devices
            .ok_or_else(|| SessionError::invalid_config("media_devices", "is required"))?;
        let transport = self
            .signaling_transport
            .ok_or_else(|| SessionError::invalid_config("signaling_transport", "is required"))?;
        let factory = self
            .peer_factory
            .ok_or_else(|| SessionError::invalid_config("peer_factory", "is required"))?;
        let feed = self
            .chat_feed
            .ok_or_else(|| SessionError::invalid_config("chat_feed", "is required"))?;

        Url::parse(&config.signaling_url).map_err(|e| {
            SessionError::invalid_config("signaling_url", format!("not a valid URL: {}", e))
        })?;
        if config.join_timeout.is_zero() {
            return Err(SessionError::invalid_config("join_timeout", "must be non-zero"));
        }
        if config.reconnect.max_attempts == 0 {
            return Err(SessionError::invalid_config(
                "reconnect.max_attempts",
                "must be at least 1",
            ));
        }

        let (media, media_rx) = MediaDeviceManager::new(devices, config.constraints.clone());
        let (signaling, signaling_rx) = SignalingClient::new(
            transport,
            config.signaling_url.clone(),
            config.reconnect.clone(),
        );
        let registry = Arc::new(PeerConnectionRegistry::new(factory));
        let chat = Arc::new(ChatStreamBridge::new(feed, self.uploader, identity.clone()));

        let controller = Arc::new(CallSessionController::assemble(
            config, identity, media, signaling, registry, chat,
        ));
        controller.spawn_pumps(media_rx, signaling_rx);
        Ok(controller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::mock::MockChatFeed;
    use crate::media::mock::MockMediaDevices;
    use crate::peer::mock::MockPeerFactory;
    use crate::signaling::mock::MockSignalingTransport;

    fn full_builder() -> SessionControllerBuilder {
        SessionControllerBuilder::new()
            .config(SessionConfig::new("wss://signal.test/ws"))
            .identity(LocalIdentity::new("u-1", "Alice"))
            .media_devices(MockMediaDevices::new())
            .signaling_transport(MockSignalingTransport::new())
            .peer_factory(MockPeerFactory::new())
            .chat_feed(MockChatFeed::new())
    }

    #[tokio::test]
    async fn build_with_all_seams_succeeds() {
        let controller = full_builder().build().unwrap();
        assert_eq!(
            controller.state(),
            crate::session::types::SessionState::Idle
        );
    }

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let err = SessionControllerBuilder::new()
            .config(SessionConfig::new("wss://signal.test/ws"))
            .media_devices(MockMediaDevices::new())
            .signaling_transport(MockSignalingTransport::new())
            .peer_factory(MockPeerFactory::new())
            .chat_feed(MockChatFeed::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfiguration { .. }));
    }

    #[tokio::test]
    async fn malformed_signaling_url_is_rejected() {
        let err = full_builder()
            .config(SessionConfig::new("not a url"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfiguration { .. }));
    }
}
