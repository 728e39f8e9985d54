//! Error types for the session coordination layer
//!
//! The taxonomy distinguishes local media failures (device access, busy
//! hardware), signaling channel failures (unreachable, retries exhausted),
//! composite session failures (join timeout), and per-message chat failures.
//! `is_recoverable()` drives the reconnection machinery: only recoverable
//! errors are retried, everything else surfaces to the caller immediately.

use thiserror::Error;
use tracing::error;

use crate::session::types::{MessageId, ParticipantId};

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur in the session coordination layer
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The user declined the media permission prompt
    #[error("Access to {device} was denied by the user")]
    DeviceAccessDenied { device: String },

    /// No matching capture device is present
    #[error("No {device} found on this system")]
    DeviceUnavailable { device: String },

    /// The capture device is claimed by another application or context
    #[error("The {device} is busy (already in use by another application)")]
    DeviceBusy { device: String },

    /// The signaling channel could not be established
    #[error("Signaling server unreachable: {reason}")]
    SignalingUnavailable { reason: String },

    /// All reconnection attempts have been used up
    #[error("Signaling reconnection exhausted after {attempts} attempts")]
    SignalingExhausted { attempts: u32 },

    /// The overall join deadline elapsed before the session became active
    #[error("Session setup timed out after {duration_ms}ms")]
    SessionTimeout { duration_ms: u64 },

    /// A chat message could not be delivered; reported per-message
    #[error("Failed to send message {message_id}: {reason}")]
    MessageSendFailed { message_id: MessageId, reason: String },

    /// A single participant's transport session failed
    #[error("Transport for participant {participant} failed: {reason}")]
    TransportFailed { participant: ParticipantId, reason: String },

    /// An operation was invoked in a state that does not permit it
    #[error("Invalid state: expected {expected}, currently {actual}")]
    InvalidState { expected: String, actual: String },

    /// Configuration error detected at build time
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SessionError {
    /// Create a signaling-unavailable error
    pub fn signaling_unavailable(reason: impl Into<String>) -> Self {
        Self::SignalingUnavailable { reason: reason.into() }
    }

    /// Create an invalid-state error
    pub fn invalid_state(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidState {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid-configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether retrying the failed operation can reasonably succeed
    ///
    /// Recoverable errors feed the reconnection policy; non-recoverable
    /// ones (permission denial, bad configuration) surface immediately.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SignalingUnavailable { .. }
                | Self::DeviceBusy { .. }
                | Self::TransportFailed { .. }
        )
    }

    /// Coarse category used in structured log fields
    pub fn category(&self) -> &'static str {
        match self {
            Self::DeviceAccessDenied { .. }
            | Self::DeviceUnavailable { .. }
            | Self::DeviceBusy { .. } => "media",
            Self::SignalingUnavailable { .. } | Self::SignalingExhausted { .. } => "signaling",
            Self::SessionTimeout { .. }
            | Self::InvalidState { .. }
            | Self::InvalidConfiguration { .. } => "session",
            Self::MessageSendFailed { .. } => "chat",
            Self::TransportFailed { .. } => "transport",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Context-adding extension for [`SessionResult`]
///
/// Wraps a lower-level error with a description of the operation that
/// failed, logging the original error with its category before wrapping.
pub trait ErrorContext<T> {
    /// Add static context to the error
    fn context(self, context: &str) -> SessionResult<T>;

    /// Add context computed only if the result is an error
    fn with_context<F>(self, f: F) -> SessionResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ErrorContext<T> for SessionResult<T> {
    fn context(self, context: &str) -> SessionResult<T> {
        self.map_err(|e| {
            error!(error = %e, context = context, category = e.category(), "Operation failed");
            SessionError::Internal {
                message: format!("{}: {}", context, e),
            }
        })
    }

    fn with_context<F>(self, f: F) -> SessionResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let context = f();
            error!(error = %e, context = %context, category = e.category(), "Operation failed");
            SessionError::Internal {
                message: format!("{}: {}", context, e),
            }
        })
    }
}
