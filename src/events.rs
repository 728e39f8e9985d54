//! Event handling for session operations
//!
//! Typed observer channel owned by the session controller. Consumers
//! implement [`SessionEventHandler`] and register a subscription; the
//! controller emits [`SessionEvent`]s on lifecycle transitions, roster
//! changes, local media changes, and signaling health changes.
//!
//! # Basic Event Handler
//!
//! ```rust
//! use roomcast_client_core::events::{SessionEvent, SessionEventHandler};
//! use async_trait::async_trait;
//!
//! struct LoggingHandler;
//!
//! #[async_trait]
//! impl SessionEventHandler for LoggingHandler {
//!     async fn on_session_event(&self, event: SessionEvent) {
//!         println!("session event: {:?}", event);
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::error;

use crate::roster::Participant;
use crate::session::types::{LocalMediaState, ParticipantId, SessionState};
use crate::signaling::ConnectionState;

/// Event priority levels for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventPriority {
    /// Routine updates (participant counts, media flag changes)
    Low,
    /// State changes and roster membership
    Normal,
    /// Signaling health transitions
    High,
    /// Unrecoverable conditions (retry exhaustion)
    Critical,
}

/// Everything the controller reports to observers
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Session lifecycle transition
    StateChanged {
        previous: SessionState,
        current: SessionState,
        timestamp: DateTime<Utc>,
    },
    /// A remote participant joined the session
    ParticipantJoined { participant: Participant },
    /// A remote participant left or was reaped
    ParticipantLeft { user_id: ParticipantId },
    /// A remote participant's mute/video flags changed
    ParticipantMediaChanged {
        user_id: ParticipantId,
        audio_enabled: bool,
        video_enabled: bool,
    },
    /// Local media flags changed (mute, camera, screen share)
    LocalMediaChanged { state: LocalMediaState },
    /// Screen share ended from the platform side; reports whether the
    /// camera was restored to the outgoing slot
    ScreenShareEnded { restored_camera: bool },
    /// Signaling connection state transition
    SignalingStateChanged { state: ConnectionState },
    /// Reconnection gave up; live updates stop until leave or manual
    /// reconnect, the call itself continues
    SignalingExhausted { attempts: u32 },
}

impl SessionEvent {
    /// Priority used by subscription filters
    pub fn priority(&self) -> EventPriority {
        match self {
            Self::StateChanged { .. } => EventPriority::Normal,
            Self::ParticipantJoined { .. } | Self::ParticipantLeft { .. } => EventPriority::Normal,
            Self::ParticipantMediaChanged { .. } | Self::LocalMediaChanged { .. } => {
                EventPriority::Low
            }
            Self::ScreenShareEnded { .. } => EventPriority::Normal,
            Self::SignalingStateChanged { .. } => EventPriority::High,
            Self::SignalingExhausted { .. } => EventPriority::Critical,
        }
    }
}

/// Filter criteria for a subscription
///
/// The default filter passes every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    /// Only deliver events at or above this priority
    pub min_priority: Option<EventPriority>,
}

impl EventFilter {
    pub fn passes(&self, event: &SessionEvent) -> bool {
        match self.min_priority {
            Some(min) => event.priority() >= min,
            None => true,
        }
    }
}

/// Observer of session events
///
/// The unified `on_session_event` is the only required method; the
/// per-kind methods are convenience hooks with empty defaults for
/// handlers that only care about a subset.
#[async_trait]
pub trait SessionEventHandler: Send + Sync {
    /// Receive every event the subscription's filter passes
    async fn on_session_event(&self, event: SessionEvent);

    /// Session lifecycle transition hook
    async fn on_state_changed(&self, _previous: SessionState, _current: SessionState) {}

    /// Roster membership hook
    async fn on_participant_joined(&self, _participant: Participant) {}

    /// Roster membership hook
    async fn on_participant_left(&self, _user_id: ParticipantId) {}
}

/// One registered observer plus its filter
pub struct EventSubscription {
    handler: Arc<dyn SessionEventHandler>,
    filter: EventFilter,
    id: uuid::Uuid,
}

impl EventSubscription {
    pub fn new(handler: Arc<dyn SessionEventHandler>, filter: EventFilter) -> Self {
        Self {
            handler,
            filter,
            id: uuid::Uuid::new_v4(),
        }
    }

    /// Subscription with no filtering
    pub fn all_events(handler: Arc<dyn SessionEventHandler>) -> Self {
        Self::new(handler, EventFilter::default())
    }

    /// Subscription for high and critical priority events only
    pub fn high_priority_events(handler: Arc<dyn SessionEventHandler>) -> Self {
        Self::new(
            handler,
            EventFilter {
                min_priority: Some(EventPriority::High),
            },
        )
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn should_receive(&self, event: &SessionEvent) -> bool {
        self.filter.passes(event)
    }

    async fn deliver(&self, event: SessionEvent) {
        if self.should_receive(&event) {
            if let SessionEvent::StateChanged {
                previous, current, ..
            } = &event
            {
                self.handler.on_state_changed(*previous, *current).await;
            }
            match &event {
                SessionEvent::ParticipantJoined { participant } => {
                    self.handler.on_participant_joined(participant.clone()).await;
                }
                SessionEvent::ParticipantLeft { user_id } => {
                    self.handler.on_participant_left(user_id.clone()).await;
                }
                _ => {}
            }
            self.handler.on_session_event(event).await;
        }
    }
}

impl Clone for EventSubscription {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            filter: self.filter,
            id: self.id,
        }
    }
}

/// Central delivery hub for session events
#[derive(Default)]
pub struct EventEmitter {
    subscriptions: RwLock<Vec<EventSubscription>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription; returns its id for later removal
    pub fn subscribe(&self, subscription: EventSubscription) -> uuid::Uuid {
        let id = subscription.id();
        self.subscriptions.write().push(subscription);
        id
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, subscription_id: uuid::Uuid) -> bool {
        let mut subs = self.subscriptions.write();
        match subs.iter().position(|s| s.id() == subscription_id) {
            Some(pos) => {
                subs.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Deliver an event to every matching subscription
    ///
    /// Deliveries run concurrently; a panicking handler is logged and does
    /// not affect the others.
    pub async fn emit(&self, event: SessionEvent) {
        let subscriptions = self.subscriptions.read().clone();
        let tasks: Vec<_> = subscriptions
            .into_iter()
            .map(|subscription| {
                let event = event.clone();
                tokio::spawn(async move {
                    subscription.deliver(event).await;
                })
            })
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Event handler failed");
            }
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        received: AtomicUsize,
    }

    #[async_trait]
    impl SessionEventHandler for CountingHandler {
        async fn on_session_event(&self, _event: SessionEvent) {
            self.received.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn handler() -> Arc<CountingHandler> {
        Arc::new(CountingHandler {
            received: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn emit_reaches_unfiltered_subscription() {
        let emitter = EventEmitter::new();
        let h = handler();
        emitter.subscribe(EventSubscription::all_events(h.clone()));

        emitter
            .emit(SessionEvent::SignalingStateChanged {
                state: ConnectionState::Connected,
            })
            .await;

        assert_eq!(h.received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn priority_filter_drops_low_events() {
        let emitter = EventEmitter::new();
        let h = handler();
        emitter.subscribe(EventSubscription::high_priority_events(h.clone()));

        emitter
            .emit(SessionEvent::LocalMediaChanged {
                state: LocalMediaState::default(),
            })
            .await;
        emitter
            .emit(SessionEvent::SignalingExhausted { attempts: 5 })
            .await;

        assert_eq!(h.received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let emitter = EventEmitter::new();
        let h = handler();
        let id = emitter.subscribe(EventSubscription::all_events(h.clone()));
        assert!(emitter.unsubscribe(id));
        assert!(!emitter.unsubscribe(id));

        emitter
            .emit(SessionEvent::SignalingExhausted { attempts: 5 })
            .await;

        assert_eq!(h.received.load(Ordering::SeqCst), 0);
        assert_eq!(emitter.subscription_count(), 0);
    }
}
