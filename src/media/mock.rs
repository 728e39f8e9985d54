//! Mock capture backend
//!
//! In-memory implementation of [`MediaDevices`] used by the crate's own
//! tests and available to downstream test suites. Failures are scripted
//! per device, permission prompts are counted, and the platform-initiated
//! "stop sharing" control can be triggered at will.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::config::{AudioConstraints, MediaConstraints};
use crate::error::{SessionError, SessionResult};
use crate::media::devices::{CaptureSet, MediaDevices, ScreenCapture};
use crate::media::track::{TrackHandle, TrackKind};

/// Scripted outcome for an acquisition call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// User declined the permission prompt
    Denied,
    /// No such device on the system
    Missing,
    /// Device held by another context
    Busy,
}

impl MockFailure {
    fn into_error(self, device: &str) -> SessionError {
        match self {
            Self::Denied => SessionError::DeviceAccessDenied { device: device.to_string() },
            Self::Missing => SessionError::DeviceUnavailable { device: device.to_string() },
            Self::Busy => SessionError::DeviceBusy { device: device.to_string() },
        }
    }
}

#[derive(Default)]
struct MockState {
    fail_camera: Option<MockFailure>,
    fail_microphone: Option<MockFailure>,
    fail_display: Option<MockFailure>,
    camera_prompts: u32,
    microphone_prompts: u32,
    display_prompts: u32,
    screen_stop_tx: Option<oneshot::Sender<()>>,
    issued: Vec<TrackHandle>,
}

/// Scriptable in-memory capture backend
#[derive(Default)]
pub struct MockMediaDevices {
    state: Mutex<MockState>,
}

impl MockMediaDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the next (and subsequent) camera acquisitions to fail
    pub fn fail_camera(&self, failure: Option<MockFailure>) {
        self.state.lock().fail_camera = failure;
    }

    /// Script microphone acquisitions to fail
    pub fn fail_microphone(&self, failure: Option<MockFailure>) {
        self.state.lock().fail_microphone = failure;
    }

    /// Script display acquisitions to fail
    pub fn fail_display(&self, failure: Option<MockFailure>) {
        self.state.lock().fail_display = failure;
    }

    /// Number of camera permission prompts so far
    pub fn camera_prompt_count(&self) -> u32 {
        self.state.lock().camera_prompts
    }

    pub fn microphone_prompt_count(&self) -> u32 {
        self.state.lock().microphone_prompts
    }

    pub fn display_prompt_count(&self) -> u32 {
        self.state.lock().display_prompts
    }

    /// Fire the platform's native "stop sharing" control for the most
    /// recently acquired display capture
    pub fn trigger_screen_stop(&self) {
        if let Some(tx) = self.state.lock().screen_stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// End every issued track of the given kind, simulating the platform
    /// closing captures behind the application's back
    pub fn end_tracks_of_kind(&self, kind: TrackKind) {
        for track in self.state.lock().issued.iter() {
            if track.kind() == kind {
                track.stop();
            }
        }
    }

    /// Tracks issued by this backend that are still live
    pub fn live_track_count(&self) -> usize {
        self.state.lock().issued.iter().filter(|t| t.is_live()).count()
    }
}

#[async_trait]
impl MediaDevices for MockMediaDevices {
    async fn acquire_camera_and_mic(
        &self,
        _constraints: &MediaConstraints,
    ) -> SessionResult<CaptureSet> {
        let mut state = self.state.lock();
        state.camera_prompts += 1;
        state.microphone_prompts += 1;
        if let Some(failure) = state.fail_camera {
            return Err(failure.into_error("camera"));
        }
        if let Some(failure) = state.fail_microphone {
            return Err(failure.into_error("microphone"));
        }
        let microphone = TrackHandle::new(TrackKind::Audio, "Mock Microphone");
        let camera = TrackHandle::new(TrackKind::Video, "Mock Camera");
        state.issued.push(microphone.clone());
        state.issued.push(camera.clone());
        Ok(CaptureSet { microphone, camera })
    }

    async fn acquire_microphone(
        &self,
        _constraints: &AudioConstraints,
    ) -> SessionResult<TrackHandle> {
        let mut state = self.state.lock();
        state.microphone_prompts += 1;
        if let Some(failure) = state.fail_microphone {
            return Err(failure.into_error("microphone"));
        }
        let microphone = TrackHandle::new(TrackKind::Audio, "Mock Microphone");
        state.issued.push(microphone.clone());
        Ok(microphone)
    }

    async fn acquire_display(&self) -> SessionResult<ScreenCapture> {
        let mut state = self.state.lock();
        state.display_prompts += 1;
        if let Some(failure) = state.fail_display {
            return Err(failure.into_error("screen"));
        }
        let track = TrackHandle::new(TrackKind::Screen, "Mock Display");
        let (tx, rx) = oneshot::channel();
        state.screen_stop_tx = Some(tx);
        state.issued.push(track.clone());
        Ok(ScreenCapture { track, external_stop: rx })
    }
}
