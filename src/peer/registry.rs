//! Peer transport registry
//!
//! Maps each remote participant to their media transport session. The
//! registry is the only writer for remote streams; every other consumer
//! (roster, rendering) holds a non-owning [`RemoteStreamRef`]. Attach and
//! detach are idempotent because the signaling layer may deliver join and
//! leave events more than once, and possibly out of order.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SessionResult;
use crate::session::types::ParticipantId;

/// Identifier of a remote media stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(Uuid);

impl StreamId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote stream payload, owned by the transport session
#[derive(Debug)]
pub struct RemoteStream {
    pub stream_id: StreamId,
    pub participant: ParticipantId,
}

impl RemoteStream {
    pub fn new(participant: ParticipantId) -> Arc<Self> {
        Arc::new(Self {
            stream_id: StreamId::generate(),
            participant,
        })
    }
}

/// Non-owning reference to a remote stream
///
/// Upgrading fails once the owning transport session is torn down; holders
/// observe the stream as gone rather than keeping it alive.
#[derive(Debug, Clone)]
pub struct RemoteStreamRef {
    inner: Weak<RemoteStream>,
}

impl RemoteStreamRef {
    pub fn new(stream: &Arc<RemoteStream>) -> Self {
        Self { inner: Arc::downgrade(stream) }
    }

    /// Whether the owning transport still holds the stream
    pub fn is_active(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn stream_id(&self) -> Option<StreamId> {
        self.inner.upgrade().map(|s| s.stream_id)
    }
}

/// One participant's media transport session
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Non-owning reference to the remote stream
    fn remote_stream(&self) -> RemoteStreamRef;

    /// Whether the transport is still exchanging media
    fn is_alive(&self) -> bool;

    /// Tear the transport down, releasing the remote stream
    async fn close(&self);
}

/// Creates transport sessions for newly joined participants
#[async_trait]
pub trait PeerTransportFactory: Send + Sync {
    async fn create(&self, participant: &ParticipantId) -> SessionResult<Box<dyn PeerTransport>>;
}

struct PeerEntry {
    transport: Box<dyn PeerTransport>,
    audio_muted: bool,
    video_off: bool,
    attached_at: DateTime<Utc>,
    /// Set the first time the transport is observed dead; drives reaping
    dead_since: Option<DateTime<Utc>>,
}

/// Registry of per-participant transport sessions
pub struct PeerConnectionRegistry {
    factory: Arc<dyn PeerTransportFactory>,
    entries: DashMap<ParticipantId, PeerEntry>,
}

impl PeerConnectionRegistry {
    pub fn new(factory: Arc<dyn PeerTransportFactory>) -> Self {
        Self {
            factory,
            entries: DashMap::new(),
        }
    }

    /// Create a transport session for a participant
    ///
    /// Idempotent: attaching an already-attached id is a no-op, since join
    /// events may be delivered more than once. Returns whether a new
    /// session was created. A creation failure affects only this
    /// participant; callers log it and keep the rest of the roster intact.
    pub async fn attach(&self, participant: &ParticipantId) -> SessionResult<bool> {
        if self.entries.contains_key(participant) {
            debug!(participant = %participant, "Transport already attached, ignoring");
            return Ok(false);
        }
        let transport = self.factory.create(participant).await?;
        self.entries.insert(
            participant.clone(),
            PeerEntry {
                transport,
                audio_muted: false,
                video_off: false,
                attached_at: Utc::now(),
                dead_since: None,
            },
        );
        info!(participant = %participant, "Transport session attached");
        Ok(true)
    }

    /// Tear down a participant's transport session
    ///
    /// A no-op (not an error) for unknown ids: a leave may race a join we
    /// never applied, or be delivered twice.
    pub async fn detach(&self, participant: &ParticipantId) {
        if let Some((_, entry)) = self.entries.remove(participant) {
            entry.transport.close().await;
            info!(participant = %participant, "Transport session detached");
        } else {
            debug!(participant = %participant, "Detach for unknown participant, ignoring");
        }
    }

    /// Tear down every remaining transport session
    pub async fn detach_all(&self) {
        let ids: Vec<ParticipantId> = self.entries.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.detach(&id).await;
        }
    }

    /// Non-owning reference to a participant's remote stream
    pub fn remote_stream(&self, participant: &ParticipantId) -> Option<RemoteStreamRef> {
        self.entries.get(participant).map(|e| e.transport.remote_stream())
    }

    /// Record the remote participant's reported media flags
    pub fn set_media_flags(&self, participant: &ParticipantId, audio_muted: bool, video_off: bool) {
        if let Some(mut entry) = self.entries.get_mut(participant) {
            entry.audio_muted = audio_muted;
            entry.video_off = video_off;
        }
    }

    /// The remote participant's media flags, `(audio_muted, video_off)`
    pub fn media_flags(&self, participant: &ParticipantId) -> Option<(bool, bool)> {
        self.entries.get(participant).map(|e| (e.audio_muted, e.video_off))
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.entries.contains_key(participant)
    }

    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove entries whose transport has been dead longer than `max_age`
    ///
    /// Covers participants whose transport terminated without an explicit
    /// leave event. Called when signaling events are applied; returns the
    /// reaped ids so the roster can converge.
    pub async fn reap_dead(&self, max_age: chrono::Duration) -> Vec<ParticipantId> {
        let now = Utc::now();
        let mut expired = Vec::new();
        for mut entry in self.entries.iter_mut() {
            if entry.transport.is_alive() {
                entry.dead_since = None;
                continue;
            }
            let dead_since = *entry.dead_since.get_or_insert(now);
            if now - dead_since >= max_age {
                expired.push(entry.key().clone());
            }
        }
        for id in &expired {
            warn!(participant = %id, "Reaping dead transport without explicit leave");
            self.detach(id).await;
        }
        expired
    }

    /// When the participant's transport was attached
    pub fn attached_at(&self, participant: &ParticipantId) -> Option<DateTime<Utc>> {
        self.entries.get(participant).map(|e| e.attached_at)
    }
}
