//! Participant roster
//!
//! Authoritative in-memory list of who is in the current session, derived
//! from signaling events and reconciled against the transport registry.
//! The roster never holds an entry whose transport session is gone (the
//! local user excepted, who has no transport), and the local entry's media
//! flags mirror [`LocalMediaState`], never a transport-reported value.
//!
//! [`LocalMediaState`]: crate::session::types::LocalMediaState

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use url::Url;

use crate::peer::registry::{PeerConnectionRegistry, RemoteStreamRef};
use crate::session::types::{LocalIdentity, LocalMediaState, ParticipantId};
use crate::signaling::protocol::ParticipantInfo;

/// One participant in the current session
#[derive(Debug, Clone)]
pub struct Participant {
    pub user_id: ParticipantId,
    pub display_name: String,
    pub photo_url: Option<Url>,
    /// Remote media stream; `None` for the local user
    pub stream: Option<RemoteStreamRef>,
    pub audio_muted: bool,
    pub video_off: bool,
    pub is_local: bool,
    pub joined_at: DateTime<Utc>,
}

/// Derived participant state for the active session
pub struct ParticipantRoster {
    entries: DashMap<ParticipantId, Participant>,
    local_id: Mutex<Option<ParticipantId>>,
    channel_counts: Mutex<HashMap<String, u32>>,
}

impl ParticipantRoster {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            local_id: Mutex::new(None),
            channel_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Insert the local user's entry
    pub fn set_local(&self, identity: &LocalIdentity, media: &LocalMediaState) {
        *self.local_id.lock() = Some(identity.user_id.clone());
        self.entries.insert(
            identity.user_id.clone(),
            Participant {
                user_id: identity.user_id.clone(),
                display_name: identity.display_name.clone(),
                photo_url: identity.photo_url.clone(),
                stream: None,
                audio_muted: !media.microphone_enabled,
                video_off: !media.camera_enabled && !media.screen_share_active,
                is_local: true,
                joined_at: Utc::now(),
            },
        );
    }

    /// Mirror the local media flags into the self entry
    pub fn update_local_media(&self, media: &LocalMediaState) {
        let Some(local_id) = self.local_id.lock().clone() else { return };
        if let Some(mut entry) = self.entries.get_mut(&local_id) {
            entry.audio_muted = !media.microphone_enabled;
            entry.video_off = !media.camera_enabled && !media.screen_share_active;
        }
    }

    /// Apply a `participant-joined` event
    ///
    /// Re-delivery of the same id updates the descriptor in place.
    pub fn apply_joined(&self, info: &ParticipantInfo, stream: Option<RemoteStreamRef>) {
        self.entries.insert(
            info.user_id.clone(),
            Participant {
                user_id: info.user_id.clone(),
                display_name: info.display_name.clone(),
                photo_url: info.photo_url.clone(),
                stream,
                audio_muted: info.audio_muted,
                video_off: info.video_off,
                is_local: false,
                joined_at: Utc::now(),
            },
        );
        debug!(participant = %info.user_id, "Roster entry added");
    }

    /// Apply a `participant-left` event; the local entry is never removed
    pub fn apply_left(&self, participant: &ParticipantId) {
        if self.local_id.lock().as_ref() == Some(participant) {
            return;
        }
        if self.entries.remove(participant).is_some() {
            debug!(participant = %participant, "Roster entry removed");
        }
    }

    /// Apply a remote participant's reported media flags
    pub fn apply_media_flags(&self, participant: &ParticipantId, audio_enabled: bool, video_enabled: bool) {
        if self.local_id.lock().as_ref() == Some(participant) {
            // Self flags mirror local media state, not echoed reports.
            return;
        }
        if let Some(mut entry) = self.entries.get_mut(participant) {
            entry.audio_muted = !audio_enabled;
            entry.video_off = !video_enabled;
        }
    }

    /// Converge the roster onto the registry's transport sessions
    ///
    /// Signaling events can arrive reordered (a leave overtaking its join),
    /// so after applying events the roster is reconciled against what
    /// actually exists: remote entries without a transport are dropped, and
    /// transports without an entry get a minimal placeholder until the full
    /// descriptor arrives.
    pub fn reconcile(&self, registry: &PeerConnectionRegistry) {
        self.entries.retain(|id, entry| entry.is_local || registry.contains(id));
        for id in registry.participant_ids() {
            if !self.entries.contains_key(&id) {
                self.entries.insert(
                    id.clone(),
                    Participant {
                        user_id: id.clone(),
                        display_name: id.to_string(),
                        photo_url: None,
                        stream: registry.remote_stream(&id),
                        audio_muted: false,
                        video_off: false,
                        is_local: false,
                        joined_at: Utc::now(),
                    },
                );
            }
        }
    }

    /// Record the per-channel participant counts from signaling
    pub fn set_channel_counts(&self, counts: HashMap<String, u32>) {
        *self.channel_counts.lock() = counts;
    }

    /// Last reported count for a channel
    pub fn channel_count(&self, channel: &str) -> Option<u32> {
        self.channel_counts.lock().get(channel).copied()
    }

    /// Number of entries, local user included
    pub fn participant_count(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, participant: &ParticipantId) -> Option<Participant> {
        self.entries.get(participant).map(|e| e.clone())
    }

    /// All entries, local user first, then by join time
    pub fn snapshot(&self) -> Vec<Participant> {
        let mut participants: Vec<Participant> =
            self.entries.iter().map(|e| e.clone()).collect();
        participants.sort_by(|a, b| {
            b.is_local
                .cmp(&a.is_local)
                .then(a.joined_at.cmp(&b.joined_at))
                .then(a.user_id.as_str().cmp(b.user_id.as_str()))
        });
        participants
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, the local user included
    pub fn clear(&self) {
        self.entries.clear();
        *self.local_id.lock() = None;
        self.channel_counts.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::mock::MockPeerFactory;

    fn info(id: &str, name: &str) -> ParticipantInfo {
        ParticipantInfo {
            user_id: ParticipantId::from(id),
            display_name: name.to_string(),
            photo_url: None,
            audio_muted: false,
            video_off: false,
        }
    }

    #[test]
    fn local_entry_mirrors_media_state() {
        let roster = ParticipantRoster::new();
        let identity = LocalIdentity::new("me", "Me");
        let mut media = LocalMediaState {
            microphone_enabled: true,
            camera_enabled: true,
            screen_share_active: false,
            active_video_source: None,
        };
        roster.set_local(&identity, &media);

        media.microphone_enabled = false;
        roster.update_local_media(&media);
        let local = roster.get(&ParticipantId::from("me")).unwrap();
        assert!(local.audio_muted);
        assert!(!local.video_off);
        assert!(local.is_local);
    }

    #[test]
    fn left_event_never_removes_local_entry() {
        let roster = ParticipantRoster::new();
        let identity = LocalIdentity::new("me", "Me");
        roster.set_local(&identity, &LocalMediaState::default());
        roster.apply_left(&ParticipantId::from("me"));
        assert_eq!(roster.participant_count(), 1);
    }

    #[tokio::test]
    async fn reconcile_drops_entries_without_transport() {
        let factory = MockPeerFactory::new();
        let registry = PeerConnectionRegistry::new(factory);
        let roster = ParticipantRoster::new();
        roster.set_local(&LocalIdentity::new("me", "Me"), &LocalMediaState::default());

        // Joined event applied but its transport was never created
        roster.apply_joined(&info("u-1", "Alice"), None);
        roster.reconcile(&registry);

        assert!(roster.get(&ParticipantId::from("u-1")).is_none());
        assert_eq!(roster.participant_count(), 1);
    }

    #[tokio::test]
    async fn reconcile_backfills_transports_missing_from_roster() {
        let factory = MockPeerFactory::new();
        let registry = PeerConnectionRegistry::new(factory);
        let id = ParticipantId::from("u-2");
        registry.attach(&id).await.unwrap();

        let roster = ParticipantRoster::new();
        roster.reconcile(&registry);
        let entry = roster.get(&id).unwrap();
        assert!(entry.stream.is_some());
        assert!(!entry.is_local);
    }

    #[test]
    fn snapshot_puts_local_first() {
        let roster = ParticipantRoster::new();
        roster.apply_joined(&info("u-1", "Alice"), None);
        roster.set_local(&LocalIdentity::new("me", "Me"), &LocalMediaState::default());
        let snapshot = roster.snapshot();
        assert!(snapshot[0].is_local);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn channel_counts_are_tracked() {
        let roster = ParticipantRoster::new();
        roster.set_channel_counts(HashMap::from([("room-7".to_string(), 4)]));
        assert_eq!(roster.channel_count("room-7"), Some(4));
        assert_eq!(roster.channel_count("room-8"), None);
    }
}
