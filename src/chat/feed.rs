//! Realtime chat feed contract
//!
//! The bridge consumes a persistent chat store through this trait pair:
//! a subscription stream of feed events (appends or whole-snapshot
//! replaces, depending on what the backend delivers) and a publish call.
//! Attachment bytes go through the upload service first; only the
//! resulting URL travels in the feed message.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SessionResult;
use crate::session::types::{MessageId, ParticipantId, SessionId};

/// Wire shape of one feed message
///
/// `timestamp_seconds` is the ordering key; `id` is globally unique and
/// drives deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFeedMessage {
    pub id: MessageId,
    pub sender_id: ParticipantId,
    pub sender_name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Url>,
    pub timestamp_seconds: i64,
}

/// What the feed delivers on the subscription stream
#[derive(Debug, Clone, PartialEq)]
pub enum ChatFeedEvent {
    /// One new message
    Append(ChatFeedMessage),
    /// Full replacement of the room's visible history
    Snapshot(Vec<ChatFeedMessage>),
}

/// Subscribe/publish contract of the persistent chat store
#[async_trait]
pub trait ChatFeed: Send + Sync {
    /// Subscribe to the room's feed; the stream ends when the
    /// subscription is dropped server-side
    async fn subscribe(&self, room: &SessionId) -> SessionResult<BoxStream<'static, ChatFeedEvent>>;

    /// Durably publish a message to the room
    async fn publish(&self, room: &SessionId, message: &ChatFeedMessage) -> SessionResult<()>;
}

/// Opaque async upload of an attachment, yielding its URL
#[async_trait]
pub trait AttachmentUploader: Send + Sync {
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> SessionResult<Url>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_message_wire_shape() {
        let msg = ChatFeedMessage {
            id: MessageId::from("m-1"),
            sender_id: ParticipantId::from("u-1"),
            sender_name: "Alice".to_string(),
            content: "hi".to_string(),
            image_url: None,
            timestamp_seconds: 1_700_000_000,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["id"], "m-1");
        assert_eq!(json["senderId"], "u-1");
        assert_eq!(json["senderName"], "Alice");
        assert_eq!(json["timestampSeconds"], 1_700_000_000);
        assert!(json.get("imageUrl").is_none());
    }
}
