//! Chat bridging
//!
//! Session-scoped chat: the bridge subscribes to the active room's feed,
//! keeps an ordered and deduplicated local message set, and publishes
//! composed messages optimistically. Attachments are uploaded out of
//! band and referenced by URL.

pub mod bridge;
pub mod feed;
pub mod mock;

pub use bridge::{Attachment, ChatMessage, ChatStreamBridge, DeliveryState};
pub use feed::{AttachmentUploader, ChatFeed, ChatFeedEvent, ChatFeedMessage};
