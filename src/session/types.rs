//! Type definitions for call sessions
//!
//! Value types shared across the coordination layer: identifiers, the
//! session state machine states, and snapshots of local media state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Identifier of one call session, assigned by the caller on join
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a participant, supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Globally unique chat message identifier, used for deduplication
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate a fresh id for a locally composed message
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of call being established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Microphone only; no camera permission is requested
    Audio,
    /// Camera and microphone
    Video,
}

/// States of the session lifecycle
///
/// `Idle` is both the initial and the terminal state; a controller can be
/// reused for a new session after `leave()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session; the controller accepts `join()`
    Idle,
    /// `join()` in progress: acquiring devices and announcing presence
    Connecting,
    /// Local media acquired and presence announced
    Active,
    /// Teardown in progress
    Ending,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Ending => "ending",
        };
        write!(f, "{}", s)
    }
}

/// One active call, owned exclusively by the session controller
#[derive(Debug, Clone)]
pub struct CallSession {
    /// Session identifier supplied on join
    pub session_id: SessionId,
    /// Audio-only or audio+video
    pub kind: SessionKind,
    /// When the session became active
    pub started_at: DateTime<Utc>,
}

/// Which capture source currently feeds the outgoing video slot
///
/// At most one source is bound at any time: camera and screen capture are
/// mutually exclusive on the slot, while the microphone track is unaffected
/// by transitions between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSourceKind {
    Camera,
    Screen,
}

/// Snapshot of the local media flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalMediaState {
    /// Whether the microphone track is enabled (track-level flag; the
    /// hardware capture is never stopped on mute, keeping unmute latency
    /// near zero)
    pub microphone_enabled: bool,
    /// Whether the camera is feeding the outgoing video slot
    pub camera_enabled: bool,
    /// Whether a screen capture is active
    pub screen_share_active: bool,
    /// The source currently bound to the outgoing video slot, if any
    pub active_video_source: Option<VideoSourceKind>,
}

impl Default for LocalMediaState {
    fn default() -> Self {
        Self {
            microphone_enabled: false,
            camera_enabled: false,
            screen_share_active: false,
            active_video_source: None,
        }
    }
}

/// Read-only identity of the local user, supplied by the identity provider
#[derive(Debug, Clone)]
pub struct LocalIdentity {
    pub user_id: ParticipantId,
    pub display_name: String,
    pub photo_url: Option<Url>,
}

impl LocalIdentity {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: ParticipantId::new(user_id),
            display_name: display_name.into(),
            photo_url: None,
        }
    }

    pub fn with_photo_url(mut self, url: Url) -> Self {
        self.photo_url = Some(url);
        self
    }
}
