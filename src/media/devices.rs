//! Platform media-capture abstraction
//!
//! [`MediaDevices`] is the seam between the coordination layer and the
//! platform's capture APIs (getUserMedia/getDisplayMedia on the web,
//! AVFoundation, PipeWire, ...). The crate never calls a platform API
//! directly; everything goes through this trait, which is what lets the
//! whole session machinery run against [`mock::MockMediaDevices`] in tests.
//!
//! [`mock::MockMediaDevices`]: crate::media::mock::MockMediaDevices

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::config::{AudioConstraints, MediaConstraints};
use crate::error::SessionResult;
use crate::media::track::TrackHandle;

/// A camera + microphone pair acquired in a single permission prompt
#[derive(Debug)]
pub struct CaptureSet {
    pub microphone: TrackHandle,
    pub camera: TrackHandle,
}

/// An acquired display capture
///
/// `external_stop` fires if the platform itself ends the share (the
/// browser's native "stop sharing" control) rather than the application.
/// This is a push notification: the manager must react to it, not poll.
#[derive(Debug)]
pub struct ScreenCapture {
    pub track: TrackHandle,
    pub external_stop: oneshot::Receiver<()>,
}

/// Platform capture API
///
/// Acquisition errors use the media taxonomy: `DeviceAccessDenied` when
/// the user declines the prompt, `DeviceUnavailable` when no matching
/// device exists, `DeviceBusy` when another context holds the hardware.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request camera and microphone together
    async fn acquire_camera_and_mic(
        &self,
        constraints: &MediaConstraints,
    ) -> SessionResult<CaptureSet>;

    /// Request the microphone only (audio sessions never prompt for camera)
    async fn acquire_microphone(
        &self,
        constraints: &AudioConstraints,
    ) -> SessionResult<TrackHandle>;

    /// Request a display capture
    async fn acquire_display(&self) -> SessionResult<ScreenCapture>;
}
