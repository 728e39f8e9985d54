//! Roster and transport convergence from signaling events

mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::{harness, harness_with, remote, settle};
use roomcast_client_core::config::SessionConfig;
use roomcast_client_core::session::{ParticipantId, SessionId, SessionKind};
use roomcast_client_core::signaling::ServerMessage;

#[tokio::test(start_paused = true)]
async fn joined_event_attaches_transport_and_roster_entry() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();

    h.transport
        .push(ServerMessage::ParticipantJoined {
            participant: remote("u-2", "Bob"),
        })
        .await;
    settle().await;

    let id = ParticipantId::from("u-2");
    assert!(h.controller.registry().contains(&id));
    let entry = h.controller.roster().get(&id).unwrap();
    assert_eq!(entry.display_name, "Bob");
    assert!(entry.stream.as_ref().unwrap().is_active());
    // Local user plus Bob
    assert_eq!(h.controller.roster().participant_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn redelivered_join_creates_a_single_transport() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();

    for _ in 0..3 {
        h.transport
            .push(ServerMessage::ParticipantJoined {
                participant: remote("u-2", "Bob"),
            })
            .await;
    }
    settle().await;

    assert_eq!(h.controller.registry().len(), 1);
    assert_eq!(h.peers.created_count(), 1);
    assert_eq!(h.controller.roster().participant_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn left_event_detaches_and_releases_the_stream() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();
    let id = ParticipantId::from("u-2");

    h.transport
        .push(ServerMessage::ParticipantJoined {
            participant: remote("u-2", "Bob"),
        })
        .await;
    settle().await;
    let stream = h.controller.registry().remote_stream(&id).unwrap();

    h.transport
        .push(ServerMessage::ParticipantLeft { user_id: id.clone() })
        .await;
    settle().await;

    assert!(!h.controller.registry().contains(&id));
    assert!(h.controller.roster().get(&id).is_none());
    assert!(h.peers.is_closed(&id));
    assert!(!stream.is_active());
}

#[tokio::test(start_paused = true)]
async fn leave_overtaking_join_converges_to_absent() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();
    let id = ParticipantId::from("u-2");

    // The leave arrives first under reordering; it must be a harmless
    // no-op rather than an error
    h.transport
        .push(ServerMessage::ParticipantLeft { user_id: id.clone() })
        .await;
    settle().await;
    assert!(!h.controller.registry().contains(&id));

    h.transport
        .push(ServerMessage::ParticipantJoined {
            participant: remote("u-2", "Bob"),
        })
        .await;
    h.transport
        .push(ServerMessage::ParticipantLeft { user_id: id.clone() })
        .await;
    settle().await;

    assert!(!h.controller.registry().contains(&id));
    assert!(h.controller.roster().get(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn one_failing_transport_does_not_break_the_roster() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();
    let bad = ParticipantId::from("u-bad");
    h.peers.fail_for(&bad);

    h.transport
        .push(ServerMessage::ParticipantJoined {
            participant: remote("u-bad", "Mallory"),
        })
        .await;
    h.transport
        .push(ServerMessage::ParticipantJoined {
            participant: remote("u-2", "Bob"),
        })
        .await;
    settle().await;

    assert!(!h.controller.registry().contains(&bad));
    assert!(h.controller.registry().contains(&ParticipantId::from("u-2")));
    assert!(h.controller.roster().get(&bad).is_none());
    assert!(h.controller.roster().get(&ParticipantId::from("u-2")).is_some());
}

#[tokio::test(start_paused = true)]
async fn remote_media_flags_update_the_roster() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();
    let id = ParticipantId::from("u-2");
    h.transport
        .push(ServerMessage::ParticipantJoined {
            participant: remote("u-2", "Bob"),
        })
        .await;

    h.transport
        .push(ServerMessage::MediaStateChanged {
            user_id: id.clone(),
            audio_enabled: false,
            video_enabled: true,
        })
        .await;
    settle().await;

    let entry = h.controller.roster().get(&id).unwrap();
    assert!(entry.audio_muted);
    assert!(!entry.video_off);
}

#[tokio::test(start_paused = true)]
async fn dead_transport_is_reaped_without_an_explicit_leave() {
    let h = harness_with(
        SessionConfig::new("wss://signal.test/ws")
            .with_participant_reap_timeout(Duration::ZERO),
    );
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();
    let id = ParticipantId::from("u-2");
    h.transport
        .push(ServerMessage::ParticipantJoined {
            participant: remote("u-2", "Bob"),
        })
        .await;
    settle().await;

    h.peers.kill(&id);
    // Any subsequent signaling traffic triggers a convergence pass
    h.transport
        .push(ServerMessage::ParticipantCount {
            counts: HashMap::from([("room-1".to_string(), 1)]),
        })
        .await;
    settle().await;

    assert!(!h.controller.registry().contains(&id));
    assert!(h.controller.roster().get(&id).is_none());
}

#[tokio::test(start_paused = true)]
async fn channel_counts_are_recorded() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();

    h.transport
        .push(ServerMessage::ParticipantCount {
            counts: HashMap::from([("room-1".to_string(), 3), ("room-2".to_string(), 1)]),
        })
        .await;
    settle().await;

    assert_eq!(h.controller.roster().channel_count("room-1"), Some(3));
    assert_eq!(h.controller.roster().channel_count("room-2"), Some(1));
    assert_eq!(h.controller.roster().channel_count("room-9"), None);
}
