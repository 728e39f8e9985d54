//! Chat stream bridge
//!
//! Connects the active session to its chat room: one live subscription at
//! a time, incoming messages merged into an ordered, deduplicated local
//! set, and an optimistic publish path where a failed send is marked
//! failed rather than silently dropped.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::chat::feed::{AttachmentUploader, ChatFeed, ChatFeedEvent, ChatFeedMessage};
use crate::error::{SessionError, SessionResult};
use crate::session::types::{LocalIdentity, MessageId, ParticipantId, SessionId};

/// Delivery status of a locally visible message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Optimistically appended, server echo not yet seen
    Sending,
    /// Confirmed by the feed
    Delivered,
    /// The transport rejected the send; entry is kept visible
    Failed,
}

/// One message as presented to the application
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: ParticipantId,
    pub sender_name: String,
    pub content: String,
    pub attachment_url: Option<Url>,
    pub timestamp: DateTime<Utc>,
    pub delivery: DeliveryState,
}

impl ChatMessage {
    fn from_feed(msg: ChatFeedMessage) -> Self {
        let timestamp = Utc
            .timestamp_opt(msg.timestamp_seconds, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self {
            id: msg.id,
            sender_id: msg.sender_id,
            sender_name: msg.sender_name,
            content: msg.content,
            attachment_url: msg.image_url,
            timestamp,
            delivery: DeliveryState::Delivered,
        }
    }
}

/// Attachment bytes handed to [`ChatStreamBridge::send`]
#[derive(Debug, Clone)]
pub struct Attachment {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct BridgeState {
    room: Option<SessionId>,
    /// Ordered by non-decreasing timestamp; same-id arrivals update in
    /// place without moving
    messages: Vec<ChatMessage>,
}

/// Bridge between the active session and its chat room
pub struct ChatStreamBridge {
    feed: Arc<dyn ChatFeed>,
    uploader: Option<Arc<dyn AttachmentUploader>>,
    identity: LocalIdentity,
    state: Arc<Mutex<BridgeState>>,
    subscription: Mutex<Option<JoinHandle<()>>>,
}

impl ChatStreamBridge {
    pub fn new(
        feed: Arc<dyn ChatFeed>,
        uploader: Option<Arc<dyn AttachmentUploader>>,
        identity: LocalIdentity,
    ) -> Self {
        Self {
            feed,
            uploader,
            identity,
            state: Arc::new(Mutex::new(BridgeState::default())),
            subscription: Mutex::new(None),
        }
    }

    /// Subscribe to the session's chat room
    ///
    /// Replaces any prior subscription: at most one is active per bridge.
    /// The local message set is reset to the new room's feed.
    pub async fn attach(&self, room: SessionId) -> SessionResult<()> {
        self.detach();
        let stream = self.feed.subscribe(&room).await?;
        {
            let mut state = self.state.lock();
            state.room = Some(room.clone());
            state.messages.clear();
        }
        let shared = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            let mut stream = stream;
            while let Some(event) = stream.next().await {
                let mut state = shared.lock();
                match event {
                    ChatFeedEvent::Append(msg) => {
                        Self::merge(&mut state.messages, ChatMessage::from_feed(msg));
                    }
                    ChatFeedEvent::Snapshot(msgs) => {
                        Self::reconcile_snapshot(&mut state.messages, msgs);
                    }
                }
            }
        });
        *self.subscription.lock() = Some(handle);
        info!(room = %room, "Chat bridge attached");
        Ok(())
    }

    /// Drop the active subscription, if any; part of session teardown
    pub fn detach(&self) {
        if let Some(handle) = self.subscription.lock().take() {
            handle.abort();
            debug!("Chat bridge detached");
        }
        self.state.lock().room = None;
    }

    /// Whether a subscription is currently active
    pub fn is_attached(&self) -> bool {
        self.state.lock().room.is_some()
    }

    /// Publish a message with an optimistic local append
    ///
    /// The entry appears immediately with [`DeliveryState::Sending`]. If
    /// the upload or the publish fails it is marked failed and the error
    /// returned; the entry is never silently removed. Returns the locally
    /// generated message id.
    pub async fn send(
        &self,
        content: impl Into<String>,
        attachment: Option<Attachment>,
    ) -> SessionResult<MessageId> {
        let content = content.into();
        let id = MessageId::generate();
        let timestamp = Utc::now();
        let room = self.state.lock().room.clone().ok_or_else(|| {
            SessionError::MessageSendFailed {
                message_id: id.clone(),
                reason: "chat bridge is not attached".to_string(),
            }
        })?;

        {
            let mut state = self.state.lock();
            Self::merge(
                &mut state.messages,
                ChatMessage {
                    id: id.clone(),
                    sender_id: self.identity.user_id.clone(),
                    sender_name: self.identity.display_name.clone(),
                    content: content.clone(),
                    attachment_url: None,
                    timestamp,
                    delivery: DeliveryState::Sending,
                },
            );
        }

        let mut image_url = None;
        if let Some(attachment) = attachment {
            let uploader = self.uploader.as_ref().ok_or_else(|| {
                self.mark_failed(&id);
                SessionError::MessageSendFailed {
                    message_id: id.clone(),
                    reason: "no attachment uploader configured".to_string(),
                }
            })?;
            match uploader.upload(attachment.data, &attachment.content_type).await {
                Ok(url) => {
                    self.set_attachment_url(&id, url.clone());
                    image_url = Some(url);
                }
                Err(e) => {
                    warn!(message_id = %id, error = %e, "Attachment upload failed");
                    self.mark_failed(&id);
                    return Err(SessionError::MessageSendFailed {
                        message_id: id,
                        reason: format!("attachment upload failed: {}", e),
                    });
                }
            }
        }

        let wire = ChatFeedMessage {
            id: id.clone(),
            sender_id: self.identity.user_id.clone(),
            sender_name: self.identity.display_name.clone(),
            content,
            image_url,
            timestamp_seconds: timestamp.timestamp(),
        };
        if let Err(e) = self.feed.publish(&room, &wire).await {
            warn!(message_id = %id, error = %e, "Message publish failed");
            self.mark_failed(&id);
            return Err(SessionError::MessageSendFailed {
                message_id: id,
                reason: e.to_string(),
            });
        }
        Ok(id)
    }

    /// Current ordered view of the room's messages
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().messages.clone()
    }

    fn mark_failed(&self, id: &MessageId) {
        let mut state = self.state.lock();
        if let Some(entry) = state.messages.iter_mut().find(|m| &m.id == id) {
            entry.delivery = DeliveryState::Failed;
        }
    }

    fn set_attachment_url(&self, id: &MessageId, url: Url) {
        let mut state = self.state.lock();
        if let Some(entry) = state.messages.iter_mut().find(|m| &m.id == id) {
            entry.attachment_url = Some(url);
        }
    }

    /// Merge one message into the ordered set
    ///
    /// A known id updates fields in place, keeping its position (a server
    /// echo confirms the optimistic entry without reordering it). A new id
    /// is inserted at the last position keeping timestamps non-decreasing.
    fn merge(messages: &mut Vec<ChatMessage>, incoming: ChatMessage) {
        if let Some(existing) = messages.iter_mut().find(|m| m.id == incoming.id) {
            existing.content = incoming.content;
            existing.attachment_url = incoming.attachment_url;
            existing.delivery = incoming.delivery;
            return;
        }
        let at = messages.partition_point(|m| m.timestamp <= incoming.timestamp);
        messages.insert(at, incoming);
    }

    /// Rebuild the set from a full-snapshot replace
    ///
    /// Messages present in the snapshot take the snapshot's fields, but an
    /// id we already show keeps its position. Local in-flight entries
    /// (`Sending`) missing from the snapshot are kept: their echo has not
    /// arrived yet, and dropping them would lose the optimistic append.
    fn reconcile_snapshot(messages: &mut Vec<ChatMessage>, snapshot: Vec<ChatFeedMessage>) {
        let pending: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| {
                m.delivery != DeliveryState::Delivered
                    && !snapshot.iter().any(|s| s.id == m.id)
            })
            .cloned()
            .collect();

        let mut rebuilt: Vec<ChatMessage> = Vec::with_capacity(snapshot.len() + pending.len());
        let mut ordered = snapshot;
        ordered.sort_by_key(|m| m.timestamp_seconds);
        for msg in ordered {
            Self::merge(&mut rebuilt, ChatMessage::from_feed(msg));
        }
        for msg in pending {
            Self::merge(&mut rebuilt, msg);
        }
        *messages = rebuilt;
    }
}

impl Drop for ChatStreamBridge {
    fn drop(&mut self) {
        if let Some(handle) = self.subscription.lock().take() {
            handle.abort();
        }
    }
}
