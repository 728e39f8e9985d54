//! Signaling wire protocol
//!
//! JSON-shaped messages exchanged with the coordination server, tagged on
//! `type` with camelCase fields. Outbound messages announce presence and
//! local media flags; inbound messages drive the participant roster.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::session::types::{ParticipantId, SessionId};

/// Messages sent by this client to the coordination server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Announce presence in a session
    #[serde(rename_all = "camelCase")]
    Join {
        session_id: SessionId,
        user_id: ParticipantId,
        user_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        photo_url: Option<Url>,
    },
    /// Announce departure
    #[serde(rename_all = "camelCase")]
    Leave {
        session_id: SessionId,
        user_id: ParticipantId,
    },
    /// Publish local media flags so remote rosters stay accurate
    #[serde(rename_all = "camelCase")]
    MediaState {
        session_id: SessionId,
        user_id: ParticipantId,
        audio_enabled: bool,
        video_enabled: bool,
    },
}

/// Remote participant descriptor carried in `participant-joined`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub user_id: ParticipantId,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<Url>,
    #[serde(default)]
    pub audio_muted: bool,
    #[serde(default)]
    pub video_off: bool,
}

/// Messages delivered by the coordination server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// A remote participant entered the session
    ParticipantJoined { participant: ParticipantInfo },
    /// A remote participant left the session
    #[serde(rename_all = "camelCase")]
    ParticipantLeft { user_id: ParticipantId },
    /// Per-channel participant counts
    ParticipantCount { counts: HashMap<String, u32> },
    /// A remote participant changed their media flags
    #[serde(rename_all = "camelCase")]
    MediaStateChanged {
        user_id: ParticipantId,
        audio_enabled: bool,
        video_enabled: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_serializes_to_expected_wire_shape() {
        let msg = ClientMessage::Join {
            session_id: SessionId::from("room-7"),
            user_id: ParticipantId::from("u-42"),
            user_name: "Alice".to_string(),
            photo_url: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "join");
        assert_eq!(json["sessionId"], "room-7");
        assert_eq!(json["userId"], "u-42");
        assert_eq!(json["userName"], "Alice");
        assert!(json.get("photoUrl").is_none());
    }

    #[test]
    fn media_state_uses_kebab_tag_and_camel_fields() {
        let msg = ClientMessage::MediaState {
            session_id: SessionId::from("room-7"),
            user_id: ParticipantId::from("u-42"),
            audio_enabled: true,
            video_enabled: false,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "media-state");
        assert_eq!(json["audioEnabled"], true);
        assert_eq!(json["videoEnabled"], false);
    }

    #[test]
    fn participant_joined_deserializes_with_defaults() {
        let raw = r#"{
            "type": "participant-joined",
            "participant": {"userId": "u-9", "displayName": "Bob"}
        }"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ServerMessage::ParticipantJoined { participant } => {
                assert_eq!(participant.user_id, ParticipantId::from("u-9"));
                assert_eq!(participant.display_name, "Bob");
                assert!(!participant.audio_muted);
                assert!(!participant.video_off);
                assert!(participant.photo_url.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn participant_count_carries_channel_map() {
        let raw = r#"{"type": "participant-count", "counts": {"room-7": 3, "room-8": 1}}"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ServerMessage::ParticipantCount { counts } => {
                assert_eq!(counts.get("room-7"), Some(&3));
                assert_eq!(counts.get("room-8"), Some(&1));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
