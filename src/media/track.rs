//! Media track abstraction
//!
//! A [`TrackHandle`] represents one live capture track (microphone, camera,
//! or screen). The handle owning component is the only one allowed to stop
//! or replace the track; everything else (rendering surfaces, the roster)
//! receives a [`ReadOnlyTrack`] derived from it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

/// What a track carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Microphone audio
    Audio,
    /// Camera video
    Video,
    /// Display capture video
    Screen,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Screen => "screen",
        };
        write!(f, "{}", s)
    }
}

/// Identifier of a track, stable for the lifetime of the capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(Uuid);

impl TrackId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct TrackInner {
    id: TrackId,
    kind: TrackKind,
    label: String,
    enabled: AtomicBool,
    live: AtomicBool,
}

/// Owning handle to a live capture track
///
/// Cloning the handle does not duplicate the capture; all clones refer to
/// the same underlying track. Liveness must be checked with [`is_live`]
/// before any reuse decision: a handle stored across a screen-share cycle
/// or a camera toggle may refer to a track the platform has since closed.
///
/// [`is_live`]: TrackHandle::is_live
#[derive(Debug, Clone)]
pub struct TrackHandle {
    inner: Arc<TrackInner>,
}

impl TrackHandle {
    /// Create a new live, enabled track
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                id: TrackId::generate(),
                kind,
                label: label.into(),
                enabled: AtomicBool::new(true),
                live: AtomicBool::new(true),
            }),
        }
    }

    pub fn id(&self) -> TrackId {
        self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    /// Device label, as reported by the platform
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Whether the underlying capture is still running
    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Whether samples currently flow into the outgoing slot
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Flip the transmission flag without touching the hardware capture
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Stop the capture; the track is permanently ended afterwards
    pub fn stop(&self) {
        self.inner.live.store(false, Ordering::SeqCst);
    }

    /// Derive a non-owning reference for display consumers
    pub fn read_only(&self) -> ReadOnlyTrack {
        ReadOnlyTrack {
            inner: Arc::downgrade(&self.inner),
            id: self.inner.id,
            kind: self.inner.kind,
        }
    }

    /// Whether two handles refer to the same underlying track
    pub fn same_track(&self, other: &TrackHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Non-owning view of a track, handed to rendering surfaces
///
/// Holds a weak reference: if the owning manager stops and drops the track,
/// the view observes it as ended rather than keeping the capture alive.
#[derive(Debug, Clone)]
pub struct ReadOnlyTrack {
    inner: std::sync::Weak<TrackInner>,
    id: TrackId,
    kind: TrackKind,
}

impl ReadOnlyTrack {
    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.inner
            .upgrade()
            .map(|t| t.live.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner
            .upgrade()
            .map(|t| t.enabled.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}
