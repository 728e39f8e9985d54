//! In-memory chat feed and uploader for tests
//!
//! `MockChatFeed` echoes every published message back to subscribers,
//! matching how a persistent store confirms a send, and lets a test
//! inject appends and snapshots directly. `MockUploader` returns a
//! deterministic URL per upload.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use url::Url;

use crate::chat::feed::{AttachmentUploader, ChatFeed, ChatFeedEvent, ChatFeedMessage};
use crate::error::{SessionError, SessionResult};
use crate::session::types::SessionId;

#[derive(Default)]
struct FeedState {
    subscribers: Vec<(SessionId, mpsc::UnboundedSender<ChatFeedEvent>)>,
    published: Vec<(SessionId, ChatFeedMessage)>,
}

/// Test double for the chat store
#[derive(Default)]
pub struct MockChatFeed {
    state: Mutex<FeedState>,
    fail_publish: AtomicBool,
    fail_subscribe: AtomicBool,
    /// When set, published messages are not echoed back to subscribers
    suppress_echo: AtomicBool,
}

impl MockChatFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make all subsequent `publish` calls fail
    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Make all subsequent `subscribe` calls fail
    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Stop echoing published messages back to subscribers
    pub fn suppress_echo(&self, suppress: bool) {
        self.suppress_echo.store(suppress, Ordering::SeqCst);
    }

    /// Deliver an append to every subscriber of the room
    pub fn push_append(&self, room: &SessionId, message: ChatFeedMessage) {
        self.deliver(room, ChatFeedEvent::Append(message));
    }

    /// Deliver a whole-history snapshot to every subscriber of the room
    pub fn push_snapshot(&self, room: &SessionId, messages: Vec<ChatFeedMessage>) {
        self.deliver(room, ChatFeedEvent::Snapshot(messages));
    }

    /// Messages accepted by `publish`, in order
    pub fn published(&self) -> Vec<ChatFeedMessage> {
        self.state
            .lock()
            .published
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn subscriber_count(&self, room: &SessionId) -> usize {
        self.state
            .lock()
            .subscribers
            .iter()
            .filter(|(r, tx)| r == room && !tx.is_closed())
            .count()
    }

    fn deliver(&self, room: &SessionId, event: ChatFeedEvent) {
        let state = self.state.lock();
        for (r, tx) in &state.subscribers {
            if r == room {
                let _ = tx.send(event.clone());
            }
        }
    }
}

#[async_trait]
impl ChatFeed for MockChatFeed {
    async fn subscribe(&self, room: &SessionId) -> SessionResult<BoxStream<'static, ChatFeedEvent>> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(SessionError::internal("mock feed: subscribe refused"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().subscribers.push((room.clone(), tx));
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn publish(&self, room: &SessionId, message: &ChatFeedMessage) -> SessionResult<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(SessionError::internal("mock feed: publish refused"));
        }
        self.state
            .lock()
            .published
            .push((room.clone(), message.clone()));
        if !self.suppress_echo.load(Ordering::SeqCst) {
            self.deliver(room, ChatFeedEvent::Append(message.clone()));
        }
        Ok(())
    }
}

/// Test double for the attachment upload service
#[derive(Default)]
pub struct MockUploader {
    uploads: AtomicUsize,
    fail: AtomicBool,
}

impl MockUploader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttachmentUploader for MockUploader {
    async fn upload(&self, _data: Vec<u8>, _content_type: &str) -> SessionResult<Url> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SessionError::internal("mock uploader: upload refused"));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        let url = format!("https://uploads.example.com/attachment-{}", n);
        Url::parse(&url).map_err(|e| SessionError::internal(format!("mock url: {}", e)))
    }
}
