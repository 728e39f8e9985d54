//! Shared harness for the integration suites

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use roomcast_client_core::chat::mock::{MockChatFeed, MockUploader};
use roomcast_client_core::chat::ChatFeedMessage;
use roomcast_client_core::config::SessionConfig;
use roomcast_client_core::events::{SessionEvent, SessionEventHandler};
use roomcast_client_core::media::mock::MockMediaDevices;
use roomcast_client_core::peer::mock::MockPeerFactory;
use roomcast_client_core::session::{
    CallSessionController, LocalIdentity, MessageId, ParticipantId, SessionControllerBuilder,
};
use roomcast_client_core::signaling::mock::MockSignalingTransport;
use roomcast_client_core::signaling::ParticipantInfo;

pub struct Harness {
    pub devices: Arc<MockMediaDevices>,
    pub transport: Arc<MockSignalingTransport>,
    pub peers: Arc<MockPeerFactory>,
    pub feed: Arc<MockChatFeed>,
    pub uploader: Arc<MockUploader>,
    pub controller: Arc<CallSessionController>,
}

pub fn harness() -> Harness {
    harness_with(SessionConfig::new("wss://signal.test/ws"))
}

pub fn harness_with(config: SessionConfig) -> Harness {
    let devices = MockMediaDevices::new();
    let transport = MockSignalingTransport::new();
    let peers = MockPeerFactory::new();
    let feed = MockChatFeed::new();
    let uploader = MockUploader::new();
    let controller = SessionControllerBuilder::new()
        .config(config)
        .identity(LocalIdentity::new("local-user", "Alice"))
        .media_devices(devices.clone())
        .signaling_transport(transport.clone())
        .peer_factory(peers.clone())
        .chat_feed(feed.clone())
        .attachment_uploader(uploader.clone())
        .build()
        .expect("harness build");
    Harness {
        devices,
        transport,
        peers,
        feed,
        uploader,
        controller,
    }
}

/// Let the controller pumps drain their channels (paused-clock tests
/// auto-advance through the sleep)
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

pub fn remote(id: &str, name: &str) -> ParticipantInfo {
    ParticipantInfo {
        user_id: ParticipantId::from(id),
        display_name: name.to_string(),
        photo_url: None,
        audio_muted: false,
        video_off: false,
    }
}

pub fn chat_msg(id: &str, sender: &str, ts: i64, content: &str) -> ChatFeedMessage {
    ChatFeedMessage {
        id: MessageId::from(id),
        sender_id: ParticipantId::from(sender),
        sender_name: sender.to_string(),
        content: content.to_string(),
        image_url: None,
        timestamp_seconds: ts,
    }
}

/// Event handler that records everything it sees
pub struct RecordingHandler {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl SessionEventHandler for RecordingHandler {
    async fn on_session_event(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}
