//! Session lifecycle
//!
//! The controller state machine, the builder that assembles it, and the
//! value types shared across the crate.

pub mod builder;
pub mod controller;
pub mod types;

pub use builder::SessionControllerBuilder;
pub use controller::CallSessionController;
pub use types::{
    CallSession, LocalIdentity, LocalMediaState, MessageId, ParticipantId, SessionId, SessionKind,
    SessionState, VideoSourceKind,
};
