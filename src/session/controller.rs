//! Call session controller
//!
//! Top-level state machine composing the media manager, signaling client,
//! peer registry, roster, and chat bridge into one control surface. The
//! controller owns the `Idle / Connecting / Active / Ending` lifecycle,
//! drives teardown in a fixed order, and republishes component
//! notifications as typed [`SessionEvent`]s.
//!
//! [`SessionEvent`]: crate::events::SessionEvent

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chat::ChatStreamBridge;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::{EventEmitter, EventSubscription, SessionEvent, SessionEventHandler};
use crate::media::{MediaDeviceManager, MediaNotice};
use crate::peer::PeerConnectionRegistry;
use crate::roster::ParticipantRoster;
use crate::session::types::{
    CallSession, LocalIdentity, LocalMediaState, SessionId, SessionKind, SessionState,
};
use crate::signaling::{ClientMessage, ServerMessage, SignalingClient, SignalingNotice};

/// Public control surface of one call session
///
/// A controller is reusable: after `leave()` it returns to `Idle` and
/// accepts a new `join()`.
pub struct CallSessionController {
    config: SessionConfig,
    identity: LocalIdentity,
    media: Arc<MediaDeviceManager>,
    signaling: Arc<SignalingClient>,
    registry: Arc<PeerConnectionRegistry>,
    roster: Arc<ParticipantRoster>,
    chat: Arc<ChatStreamBridge>,
    events: Arc<EventEmitter>,
    state_tx: watch::Sender<SessionState>,
    session: RwLock<Option<CallSession>>,
    /// Bumped by every join and leave; a suspended join whose epoch no
    /// longer matches has been superseded and must release, not bind
    epoch: AtomicU64,
    pumps: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for CallSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSessionController")
            .field("identity", &self.identity)
            .field("state", &*self.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl CallSessionController {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        config: SessionConfig,
        identity: LocalIdentity,
        media: Arc<MediaDeviceManager>,
        signaling: Arc<SignalingClient>,
        registry: Arc<PeerConnectionRegistry>,
        chat: Arc<ChatStreamBridge>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            config,
            identity,
            media,
            signaling,
            registry,
            roster: Arc::new(ParticipantRoster::new()),
            chat,
            events: Arc::new(EventEmitter::new()),
            state_tx,
            session: RwLock::new(None),
            epoch: AtomicU64::new(0),
            pumps: Mutex::new(Vec::new()),
        }
    }

    /// Forward component notification channels into the controller
    pub(crate) fn spawn_pumps(
        self: &Arc<Self>,
        mut media_rx: mpsc::UnboundedReceiver<MediaNotice>,
        mut signaling_rx: mpsc::UnboundedReceiver<SignalingNotice>,
    ) {
        let controller = Arc::clone(self);
        let media_pump = tokio::spawn(async move {
            while let Some(notice) = media_rx.recv().await {
                controller.handle_media_notice(notice).await;
            }
        });
        let controller = Arc::clone(self);
        let signaling_pump = tokio::spawn(async move {
            while let Some(notice) = signaling_rx.recv().await {
                controller.handle_signaling_notice(notice).await;
            }
        });
        let mut pumps = self.pumps.lock();
        pumps.push(media_pump);
        pumps.push(signaling_pump);
    }

    /// Join a session
    ///
    /// Acquires local media for `kind`, connects signaling, and announces
    /// presence, all under the configured join deadline. On any failure
    /// the partial setup is rolled back completely; no half-joined session
    /// is ever left behind. Fails with `InvalidState` unless the
    /// controller is `Idle`.
    pub async fn join(&self, session_id: SessionId, kind: SessionKind) -> SessionResult<CallSession> {
        let current = self.state();
        if current != SessionState::Idle {
            return Err(SessionError::invalid_state("idle", current.to_string()));
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_state(SessionState::Connecting).await;
        info!(session = %session_id, kind = ?kind, "Joining session");

        let setup = async {
            self.media.acquire_for(kind).await?;
            self.signaling.connect().await?;
            self.signaling
                .send(ClientMessage::Join {
                    session_id: session_id.clone(),
                    user_id: self.identity.user_id.clone(),
                    user_name: self.identity.display_name.clone(),
                    photo_url: self.identity.photo_url.clone(),
                })
                .await?;
            Ok::<(), SessionError>(())
        };
        match tokio::time::timeout(self.config.join_timeout, setup).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(session = %session_id, error = %e, "Join failed, rolling back");
                self.teardown().await;
                self.set_state(SessionState::Idle).await;
                return Err(e);
            }
            Err(_) => {
                warn!(session = %session_id, "Join deadline exceeded, rolling back");
                self.teardown().await;
                self.set_state(SessionState::Idle).await;
                return Err(SessionError::SessionTimeout {
                    duration_ms: self.config.join_timeout.as_millis() as u64,
                });
            }
        }

        // A leave() issued while the setup was suspended has already torn
        // everything down; the acquired resources must not outlive it.
        if self.epoch.load(Ordering::SeqCst) != epoch {
            warn!(session = %session_id, "Join superseded by leave, releasing");
            self.media.release_all().await;
            self.signaling.disconnect();
            return Err(SessionError::invalid_state("connecting", "superseded"));
        }

        let call = CallSession {
            session_id: session_id.clone(),
            kind,
            started_at: Utc::now(),
        };
        *self.session.write().await = Some(call.clone());
        let media_state = self.media.media_state().await;
        self.roster.set_local(&self.identity, &media_state);
        if let Err(e) = self.chat.attach(session_id.clone()).await {
            // Chat is auxiliary; the call proceeds without the feed.
            warn!(session = %session_id, error = %e, "Chat attach failed");
        }
        self.set_state(SessionState::Active).await;
        info!(session = %session_id, "Session active");
        Ok(call)
    }

    /// Leave the session
    ///
    /// Best-effort teardown in a fixed order: screen share, then local
    /// tracks, then peer transports, then signaling, then roster, with the
    /// media flags reset to defaults at the end. Idempotent; a `leave()`
    /// while `Idle` is a no-op.
    pub async fn leave(&self) {
        if self.state() == SessionState::Idle {
            debug!("Leave while idle ignored");
            return;
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.set_state(SessionState::Ending).await;
        self.teardown().await;
        self.set_state(SessionState::Idle).await;
        info!("Session left");
    }

    /// Flip microphone transmission; returns the new enabled flag
    pub async fn toggle_microphone(&self) -> SessionResult<bool> {
        self.require_active()?;
        let enabled = !self.media.media_state().await.microphone_enabled;
        self.media.set_microphone_enabled(enabled).await?;
        self.publish_local_media().await;
        Ok(enabled)
    }

    /// Flip the camera video source; returns the new enabled flag
    ///
    /// Re-enabling reuses the warm capture when it is still live, so no
    /// permission prompt is shown for a plain off-and-on.
    pub async fn toggle_camera(&self) -> SessionResult<bool> {
        self.require_active()?;
        let enabled = !self.media.media_state().await.camera_enabled;
        self.media.set_camera_enabled(enabled).await?;
        self.publish_local_media().await;
        Ok(enabled)
    }

    /// Start or stop the screen share; returns whether a share is active
    /// afterwards
    pub async fn toggle_screen_share(&self) -> SessionResult<bool> {
        self.require_active()?;
        let active = if self.media.media_state().await.screen_share_active {
            self.media.stop_screen_share().await?;
            false
        } else {
            self.media.start_screen_share().await?;
            true
        };
        self.publish_local_media().await;
        Ok(active)
    }

    /// Manually restart signaling after retry exhaustion
    ///
    /// Reconnects the channel and re-announces presence for the active
    /// session. A no-op error outside `Active`.
    pub async fn reconnect_signaling(&self) -> SessionResult<()> {
        self.require_active()?;
        self.signaling.connect().await?;
        self.announce_presence().await;
        Ok(())
    }

    /// Register an event handler observing this controller
    pub fn subscribe(&self, handler: Arc<dyn SessionEventHandler>) -> uuid::Uuid {
        self.events.subscribe(EventSubscription::all_events(handler))
    }

    /// Register a pre-built subscription (e.g. priority-filtered)
    pub fn subscribe_with(&self, subscription: EventSubscription) -> uuid::Uuid {
        self.events.subscribe(subscription)
    }

    pub fn unsubscribe(&self, subscription_id: uuid::Uuid) -> bool {
        self.events.unsubscribe(subscription_id)
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// The active call, if any
    pub async fn session(&self) -> Option<CallSession> {
        self.session.read().await.clone()
    }

    /// Snapshot of the local media flags
    pub async fn media_state(&self) -> LocalMediaState {
        self.media.media_state().await
    }

    /// The participant roster
    pub fn roster(&self) -> &ParticipantRoster {
        &self.roster
    }

    /// The chat bridge for the active session
    pub fn chat(&self) -> &Arc<ChatStreamBridge> {
        &self.chat
    }

    /// The signaling client, for connection state observation
    pub fn signaling(&self) -> &Arc<SignalingClient> {
        &self.signaling
    }

    /// The peer transport registry
    pub fn registry(&self) -> &Arc<PeerConnectionRegistry> {
        &self.registry
    }

    fn require_active(&self) -> SessionResult<()> {
        let current = self.state();
        if current != SessionState::Active {
            return Err(SessionError::invalid_state("active", current.to_string()));
        }
        Ok(())
    }

    async fn set_state(&self, state: SessionState) {
        let previous = *self.state_tx.borrow();
        if previous == state {
            return;
        }
        let _ = self.state_tx.send(state);
        self.events
            .emit(SessionEvent::StateChanged {
                previous,
                current: state,
                timestamp: Utc::now(),
            })
            .await;
    }

    /// Fixed-order teardown shared by leave and join rollback
    async fn teardown(&self) {
        self.media.release_all().await;
        self.registry.detach_all().await;
        if let Some(call) = self.session.write().await.take() {
            let _ = self
                .signaling
                .send(ClientMessage::Leave {
                    session_id: call.session_id,
                    user_id: self.identity.user_id.clone(),
                })
                .await;
        }
        self.signaling.disconnect();
        self.chat.detach();
        self.roster.clear();
    }

    /// Mirror the local flags into the roster, announce them over
    /// signaling, and notify observers
    async fn publish_local_media(&self) {
        let state = self.media.media_state().await;
        self.roster.update_local_media(&state);
        self.announce_media_state(&state).await;
        self.events
            .emit(SessionEvent::LocalMediaChanged { state })
            .await;
    }

    async fn announce_media_state(&self, state: &LocalMediaState) {
        let Some(call) = self.session.read().await.clone() else { return };
        let video_enabled = state.camera_enabled || state.screen_share_active;
        if let Err(e) = self
            .signaling
            .send(ClientMessage::MediaState {
                session_id: call.session_id,
                user_id: self.identity.user_id.clone(),
                audio_enabled: state.microphone_enabled,
                video_enabled,
            })
            .await
        {
            // Degraded signaling never blocks a local toggle.
            warn!(error = %e, "Media state announcement failed");
        }
    }

    async fn announce_presence(&self) {
        let Some(call) = self.session.read().await.clone() else { return };
        let result = self
            .signaling
            .send(ClientMessage::Join {
                session_id: call.session_id,
                user_id: self.identity.user_id.clone(),
                user_name: self.identity.display_name.clone(),
                photo_url: self.identity.photo_url.clone(),
            })
            .await;
        if let Err(e) = result {
            warn!(error = %e, "Presence announcement failed");
            return;
        }
        let state = self.media.media_state().await;
        self.announce_media_state(&state).await;
    }

    async fn handle_media_notice(&self, notice: MediaNotice) {
        match notice {
            MediaNotice::ScreenShareEnded { restored_camera } => {
                info!(restored_camera, "Screen share ended externally");
                self.publish_local_media().await;
                self.events
                    .emit(SessionEvent::ScreenShareEnded { restored_camera })
                    .await;
            }
        }
    }

    async fn handle_signaling_notice(&self, notice: SignalingNotice) {
        match notice {
            SignalingNotice::Message(message) => {
                if matches!(self.state(), SessionState::Idle | SessionState::Ending) {
                    debug!("Dropping signaling message outside a session");
                    return;
                }
                self.handle_server_message(message).await;
                self.converge_roster().await;
            }
            SignalingNotice::Reconnected => {
                info!("Signaling recovered, re-announcing presence");
                self.announce_presence().await;
                self.events
                    .emit(SessionEvent::SignalingStateChanged {
                        state: self.signaling.state(),
                    })
                    .await;
            }
            SignalingNotice::Exhausted { attempts } => {
                warn!(attempts, "Signaling retries exhausted, live updates stopped");
                self.events
                    .emit(SessionEvent::SignalingExhausted { attempts })
                    .await;
            }
        }
    }

    async fn handle_server_message(&self, message: ServerMessage) {
        match message {
            ServerMessage::ParticipantJoined { participant } => {
                // One participant's transport failure never cascades into
                // the rest of the roster.
                match self.registry.attach(&participant.user_id).await {
                    Ok(_) => {
                        let stream = self.registry.remote_stream(&participant.user_id);
                        self.roster.apply_joined(&participant, stream);
                        if let Some(entry) = self.roster.get(&participant.user_id) {
                            self.events
                                .emit(SessionEvent::ParticipantJoined { participant: entry })
                                .await;
                        }
                    }
                    Err(e) => {
                        warn!(
                            participant = %participant.user_id,
                            error = %e,
                            "Transport attach failed, participant skipped"
                        );
                    }
                }
            }
            ServerMessage::ParticipantLeft { user_id } => {
                self.registry.detach(&user_id).await;
                self.roster.apply_left(&user_id);
                self.events
                    .emit(SessionEvent::ParticipantLeft { user_id })
                    .await;
            }
            ServerMessage::ParticipantCount { counts } => {
                self.roster.set_channel_counts(counts);
            }
            ServerMessage::MediaStateChanged {
                user_id,
                audio_enabled,
                video_enabled,
            } => {
                self.registry
                    .set_media_flags(&user_id, !audio_enabled, !video_enabled);
                self.roster
                    .apply_media_flags(&user_id, audio_enabled, video_enabled);
                self.events
                    .emit(SessionEvent::ParticipantMediaChanged {
                        user_id,
                        audio_enabled,
                        video_enabled,
                    })
                    .await;
            }
        }
    }

    /// Reap dead transports and reconcile the roster onto the registry
    async fn converge_roster(&self) {
        let max_age =
            chrono::Duration::milliseconds(self.config.participant_reap_timeout.as_millis() as i64);
        let reaped = self.registry.reap_dead(max_age).await;
        for user_id in reaped {
            self.roster.apply_left(&user_id);
            self.events
                .emit(SessionEvent::ParticipantLeft { user_id })
                .await;
        }
        self.roster.reconcile(&self.registry);
    }
}

impl Drop for CallSessionController {
    fn drop(&mut self) {
        for pump in self.pumps.lock().drain(..) {
            pump.abort();
        }
    }
}
