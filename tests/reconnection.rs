//! Signaling resilience across network interruptions

mod common;

use std::time::Duration;

use common::{harness, settle, RecordingHandler};
use roomcast_client_core::events::SessionEvent;
use roomcast_client_core::session::{SessionId, SessionKind, SessionState};
use roomcast_client_core::signaling::{ClientMessage, ConnectionState};
use tracing_test::traced_test;

#[tokio::test(start_paused = true)]
async fn drop_recovers_after_failed_attempts_and_resets_counter() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();
    h.transport.take_sent();

    h.transport.fail_next_connects(2);
    h.transport.drop_connection();
    // Linear schedule: 3s + 6s failures, success at 9s
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(h.controller.signaling().state(), ConnectionState::Connected);
    assert_eq!(h.controller.signaling().reconnect_attempts(), 0);
    // initial + 2 failed + 1 successful
    assert_eq!(h.transport.connect_count(), 4);

    // Presence was re-announced on the fresh connection
    let sent = h.transport.take_sent();
    assert!(sent
        .iter()
        .any(|m| matches!(m, ClientMessage::Join { session_id, .. } if *session_id == SessionId::from("room-1"))));
    assert!(sent.iter().any(|m| matches!(m, ClientMessage::MediaState { .. })));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn exhaustion_settles_disconnected_without_ending_call() {
    let h = harness();
    let observer = RecordingHandler::new();
    h.controller.subscribe(observer.clone());
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();

    h.transport.fail_all_connects(true);
    h.transport.drop_connection();
    // Worst case schedule is 3+6+9+12+15 = 45s
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(h.controller.signaling().state(), ConnectionState::Disconnected);
    // The call itself stays up in degraded mode
    assert_eq!(h.controller.state(), SessionState::Active);
    assert!(h.controller.media_state().await.microphone_enabled);
    assert!(observer
        .events()
        .iter()
        .any(|e| matches!(e, SessionEvent::SignalingExhausted { attempts: 5 })));
    // Only exhaustion is surfaced at error level; retries stay quiet
    assert!(logs_contain("Signaling reconnection exhausted"));

    // No further attempts are ever scheduled
    let count = h.transport.connect_count();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.transport.connect_count(), count);
}

#[tokio::test(start_paused = true)]
async fn manual_reconnect_restores_the_channel_after_exhaustion() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();

    h.transport.fail_all_connects(true);
    h.transport.drop_connection();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.controller.signaling().state(), ConnectionState::Disconnected);
    h.transport.take_sent();

    h.transport.fail_all_connects(false);
    h.controller.reconnect_signaling().await.unwrap();
    settle().await;

    assert_eq!(h.controller.signaling().state(), ConnectionState::Connected);
    let sent = h.transport.take_sent();
    assert!(sent.iter().any(|m| matches!(m, ClientMessage::Join { .. })));
}

#[tokio::test(start_paused = true)]
async fn leave_cancels_pending_reconnect_timers() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();

    h.transport.fail_all_connects(true);
    h.transport.drop_connection();
    // Let the recovery driver start its first wait
    settle().await;

    h.controller.leave().await;
    let count = h.transport.connect_count();
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(h.transport.connect_count(), count);
    assert_eq!(h.controller.signaling().pending_task_count(), 0);
    assert_eq!(h.controller.state(), SessionState::Idle);
}
