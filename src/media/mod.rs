//! Local media device and track lifecycle
//!
//! This module owns all interaction with the platform's capture APIs. The
//! [`MediaDeviceManager`] is the exclusive writer for every live track; it
//! presents a single outgoing video slot (camera XOR screen) and keeps the
//! microphone track stable across transitions of that slot.

pub mod devices;
pub mod manager;
pub mod mock;
pub mod track;

pub use devices::{CaptureSet, MediaDevices, ScreenCapture};
pub use manager::{MediaDeviceManager, MediaNotice};
pub use track::{ReadOnlyTrack, TrackHandle, TrackId, TrackKind};
