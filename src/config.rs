//! Session configuration structures
//!
//! [`SessionConfig`] carries everything the controller needs that is not a
//! collaborator implementation: the signaling endpoint, local identity
//! display fields, media constraints, the join deadline, and the
//! reconnection policy knobs. All fields have conservative defaults and
//! `with_*` methods for fluent construction.
//!
//! # Examples
//!
//! ```rust
//! use roomcast_client_core::config::{SessionConfig, MediaConstraints};
//! use std::time::Duration;
//!
//! let config = SessionConfig::new("wss://signal.roomcast.app/ws")
//!     .with_join_timeout(Duration::from_secs(20))
//!     .with_constraints(MediaConstraints::default().with_video_size(1280, 720));
//!
//! assert_eq!(config.join_timeout, Duration::from_secs(20));
//! assert_eq!(config.constraints.video.width, Some(1280));
//! ```

use std::time::Duration;

/// Audio capture processing constraints
///
/// All fields are optional; `None` leaves the platform default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: Option<bool>,
    pub noise_suppression: Option<bool>,
    pub auto_gain_control: Option<bool>,
}

/// Video capture constraints
///
/// All fields are optional; `None` leaves the platform default in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoConstraints {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f32>,
}

/// Constraints passed to the platform capture APIs on acquisition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaConstraints {
    pub audio: AudioConstraints,
    pub video: VideoConstraints,
}

impl MediaConstraints {
    /// Constraints tuned for voice: echo cancellation, noise suppression,
    /// and auto gain all on
    pub fn voice_processed() -> Self {
        Self {
            audio: AudioConstraints {
                echo_cancellation: Some(true),
                noise_suppression: Some(true),
                auto_gain_control: Some(true),
            },
            video: VideoConstraints::default(),
        }
    }

    pub fn with_video_size(mut self, width: u32, height: u32) -> Self {
        self.video.width = Some(width);
        self.video.height = Some(height);
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.video.frame_rate = Some(frame_rate);
        self
    }
}

/// Reconnection policy knobs for the signaling channel
///
/// The delay before attempt *n* (1-indexed) is `base_delay * n`: linear
/// growth with a fixed base, which spreads reconnecting clients out without
/// the unbounded tail of exponential schedules. Jitter is off by default so
/// the progression is deterministic under test.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Base unit of the linear backoff
    pub base_delay: Duration,
    /// Attempts before settling into `Disconnected`
    pub max_attempts: u32,
    /// Randomize each delay by up to ±10%
    pub use_jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(3),
            max_attempts: 5,
            use_jitter: false,
        }
    }
}

/// Configuration for a [`CallSessionController`]
///
/// [`CallSessionController`]: crate::session::CallSessionController
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Signaling server endpoint
    pub signaling_url: String,
    /// Capture constraints applied on device acquisition
    pub constraints: MediaConstraints,
    /// Overall deadline for `join()`, covering device acquisition and the
    /// signaling connect
    pub join_timeout: Duration,
    /// Reconnection policy for unexpected signaling drops
    pub reconnect: ReconnectConfig,
    /// How long a participant's transport may be dead before the entry is
    /// reaped without an explicit leave event
    pub participant_reap_timeout: Duration,
}

impl SessionConfig {
    pub fn new(signaling_url: impl Into<String>) -> Self {
        Self {
            signaling_url: signaling_url.into(),
            constraints: MediaConstraints::voice_processed(),
            join_timeout: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
            participant_reap_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_participant_reap_timeout(mut self, timeout: Duration) -> Self {
        self.participant_reap_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reconnect_policy() {
        let config = SessionConfig::new("wss://example.test/ws");
        assert_eq!(config.reconnect.base_delay, Duration::from_secs(3));
        assert_eq!(config.reconnect.max_attempts, 5);
        assert!(!config.reconnect.use_jitter);
        assert_eq!(config.join_timeout, Duration::from_secs(30));
    }

    #[test]
    fn voice_processing_defaults_on() {
        let constraints = MediaConstraints::voice_processed();
        assert_eq!(constraints.audio.echo_cancellation, Some(true));
        assert_eq!(constraints.audio.noise_suppression, Some(true));
        assert_eq!(constraints.audio.auto_gain_control, Some(true));
        assert_eq!(constraints.video.width, None);
    }
}
