//! Media Device Manager
//!
//! Owns every local capture track. The manager is the single writer for
//! track lifecycle (stop/replace); all other components see tracks through
//! [`ReadOnlyTrack`] views. It presents one outgoing video slot bound to
//! either the camera or a screen capture, never both, and guarantees the
//! microphone track is untouched by transitions between those two sources.
//!
//! [`ReadOnlyTrack`]: crate::media::track::ReadOnlyTrack

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::MediaConstraints;
use crate::error::{SessionError, SessionResult};
use crate::media::devices::MediaDevices;
use crate::media::track::{ReadOnlyTrack, TrackHandle};
use crate::session::types::{LocalMediaState, SessionKind, VideoSourceKind};

/// Push notifications from the manager to the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaNotice {
    /// The platform ended the screen share (native "stop sharing" control);
    /// the manager has already rebound the video slot
    ScreenShareEnded { restored_camera: bool },
}

#[derive(Default)]
struct MediaInner {
    microphone: Option<TrackHandle>,
    camera: Option<TrackHandle>,
    screen: Option<TrackHandle>,
    microphone_enabled: bool,
    camera_enabled: bool,
    screen_share_active: bool,
    /// Camera flag captured when a share starts, restored when it ends
    camera_enabled_before_share: bool,
    /// Watches for platform-initiated share termination
    stop_watcher: Option<JoinHandle<()>>,
}

/// Exclusive owner of all local capture tracks
pub struct MediaDeviceManager {
    devices: Arc<dyn MediaDevices>,
    constraints: MediaConstraints,
    inner: RwLock<MediaInner>,
    notices: mpsc::UnboundedSender<MediaNotice>,
}

impl MediaDeviceManager {
    /// Create a manager over the given capture backend
    ///
    /// The returned receiver carries push notifications (currently only
    /// externally ended screen shares) for the controller to react to.
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        constraints: MediaConstraints,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<MediaNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Arc::new(Self {
            devices,
            constraints,
            inner: RwLock::new(MediaInner::default()),
            notices: tx,
        });
        (manager, rx)
    }

    /// Acquire the local tracks appropriate for the session kind
    ///
    /// Video sessions prompt for camera and microphone together; audio
    /// sessions prompt for the microphone only.
    pub async fn acquire_for(&self, kind: SessionKind) -> SessionResult<()> {
        match kind {
            SessionKind::Video => {
                let set = self.devices.acquire_camera_and_mic(&self.constraints).await?;
                debug!(mic = %set.microphone.id(), camera = %set.camera.id(), "Acquired camera and microphone");
                let mut inner = self.inner.write().await;
                inner.microphone = Some(set.microphone);
                inner.camera = Some(set.camera);
                inner.microphone_enabled = true;
                inner.camera_enabled = true;
            }
            SessionKind::Audio => {
                let mic = self.devices.acquire_microphone(&self.constraints.audio).await?;
                debug!(mic = %mic.id(), "Acquired microphone");
                let mut inner = self.inner.write().await;
                inner.microphone = Some(mic);
                inner.microphone_enabled = true;
                inner.camera_enabled = false;
            }
        }
        Ok(())
    }

    /// Flip microphone transmission
    ///
    /// Only the track-level enabled flag changes; the hardware capture is
    /// never stopped or restarted, so the flip is effectively instant.
    pub async fn set_microphone_enabled(&self, enabled: bool) -> SessionResult<()> {
        let mut inner = self.inner.write().await;
        let mic = inner
            .microphone
            .as_ref()
            .ok_or_else(|| SessionError::invalid_state("microphone acquired", "no microphone"))?;
        mic.set_enabled(enabled);
        inner.microphone_enabled = enabled;
        debug!(enabled, "Microphone flag updated");
        Ok(())
    }

    /// Enable or disable the camera as the outgoing video source
    ///
    /// Disabling stops sending (track disabled, capture kept warm);
    /// enabling resumes the previously acquired track when it is still
    /// live, and re-acquires a fresh camera+mic pair otherwise. A stored
    /// handle is never reused without a liveness check.
    pub async fn set_camera_enabled(&self, enabled: bool) -> SessionResult<()> {
        if !enabled {
            let mut inner = self.inner.write().await;
            if let Some(camera) = inner.camera.as_ref() {
                camera.set_enabled(false);
            }
            inner.camera_enabled = false;
            debug!("Camera disabled");
            return Ok(());
        }

        let needs_fresh = {
            let inner = self.inner.read().await;
            match inner.camera.as_ref() {
                Some(camera) => !camera.is_live(),
                None => true,
            }
        };

        if needs_fresh {
            warn!("Stored camera track is stale, re-acquiring a fresh capture set");
            self.reacquire_capture_set().await?;
        }

        let mut inner = self.inner.write().await;
        if let Some(camera) = inner.camera.as_ref() {
            camera.set_enabled(true);
        }
        inner.camera_enabled = true;
        debug!("Camera enabled");
        Ok(())
    }

    /// Start a screen share, rebinding the video slot to the screen track
    ///
    /// The microphone track is left untouched. A watcher task is spawned so
    /// a platform-initiated stop is handled even though the application
    /// never calls [`stop_screen_share`].
    ///
    /// [`stop_screen_share`]: MediaDeviceManager::stop_screen_share
    pub async fn start_screen_share(self: &Arc<Self>) -> SessionResult<()> {
        {
            let inner = self.inner.read().await;
            if inner.screen_share_active {
                return Ok(());
            }
        }

        let capture = self.devices.acquire_display().await?;
        info!(track = %capture.track.id(), "Screen share started");

        let mut inner = self.inner.write().await;
        inner.camera_enabled_before_share = inner.camera_enabled;
        if let Some(camera) = inner.camera.as_ref() {
            // The slot belongs to the screen now; keep the camera capture
            // warm so stopping the share does not need a permission prompt.
            camera.set_enabled(false);
        }
        inner.screen = Some(capture.track);
        inner.screen_share_active = true;

        let manager = Arc::clone(self);
        let external_stop = capture.external_stop;
        inner.stop_watcher = Some(tokio::spawn(async move {
            if external_stop.await.is_ok() {
                manager.handle_external_screen_stop().await;
            }
        }));
        Ok(())
    }

    /// Stop the screen share and restore the camera binding
    ///
    /// Returns whether the camera was restored as the active source. If the
    /// stored camera track died while the share was up, a fresh camera+mic
    /// pair is acquired instead of reusing the dead reference.
    pub async fn stop_screen_share(&self) -> SessionResult<bool> {
        {
            let mut inner = self.inner.write().await;
            if !inner.screen_share_active {
                return Ok(false);
            }
            if let Some(watcher) = inner.stop_watcher.take() {
                watcher.abort();
            }
            if let Some(screen) = inner.screen.take() {
                screen.stop();
            }
            inner.screen_share_active = false;
        }
        let restored = self.restore_camera_after_share().await?;
        info!(restored_camera = restored, "Screen share stopped");
        Ok(restored)
    }

    /// Reaction to the platform's native "stop sharing" control
    async fn handle_external_screen_stop(&self) {
        {
            let mut inner = self.inner.write().await;
            if !inner.screen_share_active {
                return;
            }
            inner.stop_watcher = None;
            if let Some(screen) = inner.screen.take() {
                screen.stop();
            }
            inner.screen_share_active = false;
        }
        let restored = match self.restore_camera_after_share().await {
            Ok(restored) => restored,
            Err(e) => {
                warn!(error = %e, "Camera restore after external screen stop failed");
                false
            }
        };
        info!(restored_camera = restored, "Screen share ended by the platform");
        let _ = self.notices.send(MediaNotice::ScreenShareEnded { restored_camera: restored });
    }

    /// Rebind the camera after a share ends, if it was enabled beforehand
    async fn restore_camera_after_share(&self) -> SessionResult<bool> {
        let should_restore = {
            let inner = self.inner.read().await;
            inner.camera_enabled_before_share && inner.microphone.is_some()
        };
        if !should_restore {
            return Ok(false);
        }
        self.set_camera_enabled(true).await?;
        Ok(true)
    }

    /// Replace camera and microphone with a freshly acquired pair
    ///
    /// Mute state carries over: the new microphone track inherits the
    /// enabled flag of the one it replaces.
    async fn reacquire_capture_set(&self) -> SessionResult<()> {
        let set = self.devices.acquire_camera_and_mic(&self.constraints).await?;
        let mut inner = self.inner.write().await;
        if let Some(old_mic) = inner.microphone.take() {
            set.microphone.set_enabled(old_mic.is_enabled());
            old_mic.stop();
        }
        if let Some(old_camera) = inner.camera.take() {
            old_camera.stop();
        }
        inner.microphone = Some(set.microphone);
        inner.camera = Some(set.camera);
        Ok(())
    }

    /// Stop and release every track, resetting flags to defaults
    ///
    /// Teardown order within the manager: screen capture first, then
    /// camera and microphone.
    pub async fn release_all(&self) {
        let mut inner = self.inner.write().await;
        if let Some(watcher) = inner.stop_watcher.take() {
            watcher.abort();
        }
        if let Some(screen) = inner.screen.take() {
            screen.stop();
        }
        if let Some(camera) = inner.camera.take() {
            camera.stop();
        }
        if let Some(mic) = inner.microphone.take() {
            mic.stop();
        }
        *inner = MediaInner::default();
        debug!("All local tracks released");
    }

    /// Snapshot of the local media flags
    pub async fn media_state(&self) -> LocalMediaState {
        let inner = self.inner.read().await;
        let active_video_source = if inner.screen_share_active {
            Some(VideoSourceKind::Screen)
        } else if inner.camera_enabled && inner.camera.as_ref().is_some_and(|c| c.is_live()) {
            Some(VideoSourceKind::Camera)
        } else {
            None
        };
        LocalMediaState {
            microphone_enabled: inner.microphone_enabled,
            camera_enabled: inner.camera_enabled,
            screen_share_active: inner.screen_share_active,
            active_video_source,
        }
    }

    /// Read-only view of the microphone track
    pub async fn microphone_track(&self) -> Option<ReadOnlyTrack> {
        self.inner.read().await.microphone.as_ref().map(TrackHandle::read_only)
    }

    /// Read-only view of whichever track feeds the video slot
    pub async fn active_video_track(&self) -> Option<ReadOnlyTrack> {
        let inner = self.inner.read().await;
        if inner.screen_share_active {
            inner.screen.as_ref().map(TrackHandle::read_only)
        } else if inner.camera_enabled {
            inner.camera.as_ref().map(TrackHandle::read_only)
        } else {
            None
        }
    }

    /// Number of live tracks currently owned by the manager
    pub async fn live_track_count(&self) -> usize {
        let inner = self.inner.read().await;
        [&inner.microphone, &inner.camera, &inner.screen]
            .into_iter()
            .flatten()
            .filter(|t| t.is_live())
            .count()
    }
}
