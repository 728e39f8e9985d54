//! Session-scoped chat behavior

mod common;

use common::{chat_msg, harness, settle};
use roomcast_client_core::chat::{Attachment, DeliveryState};
use roomcast_client_core::error::SessionError;
use roomcast_client_core::session::{SessionId, SessionKind};

#[tokio::test(start_paused = true)]
async fn sent_message_is_confirmed_by_the_server_echo() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();

    let id = h.controller.chat().send("hello", None).await.unwrap();
    settle().await;

    let messages = h.controller.chat().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, id);
    assert_eq!(messages[0].content, "hello");
    assert_eq!(messages[0].delivery, DeliveryState::Delivered);
    assert_eq!(h.feed.published().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn duplicate_feed_delivery_shows_one_entry() {
    let h = harness();
    let room = SessionId::from("room-1");
    h.controller.join(room.clone(), SessionKind::Video).await.unwrap();

    let msg = chat_msg("m-1", "u-2", 100, "hi there");
    h.feed.push_append(&room, msg.clone());
    h.feed.push_append(&room, msg);
    settle().await;

    assert_eq!(h.controller.chat().messages().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn incoming_messages_are_ordered_by_timestamp() {
    let h = harness();
    let room = SessionId::from("room-1");
    h.controller.join(room.clone(), SessionKind::Video).await.unwrap();

    h.feed.push_append(&room, chat_msg("m-2", "u-2", 200, "second"));
    h.feed.push_append(&room, chat_msg("m-1", "u-2", 100, "first"));
    h.feed.push_append(&room, chat_msg("m-3", "u-2", 300, "third"));
    settle().await;

    let contents: Vec<String> = h
        .controller
        .chat()
        .messages()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["first", "second", "third"]);
}

#[tokio::test(start_paused = true)]
async fn rejected_send_stays_visible_as_failed() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();
    h.feed.fail_publish(true);

    let err = h.controller.chat().send("lost?", None).await.unwrap_err();
    assert!(matches!(err, SessionError::MessageSendFailed { .. }));

    let messages = h.controller.chat().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].delivery, DeliveryState::Failed);
    assert_eq!(messages[0].content, "lost?");
}

#[tokio::test(start_paused = true)]
async fn snapshot_replace_does_not_duplicate_an_in_flight_send() {
    let h = harness();
    let room = SessionId::from("room-1");
    h.controller.join(room.clone(), SessionKind::Video).await.unwrap();
    h.feed.suppress_echo(true);

    let id = h.controller.chat().send("optimistic", None).await.unwrap();
    // Whole-history replace that already includes the server copy
    let server_copy = {
        let mut m = chat_msg("ignored", "local-user", 0, "optimistic");
        m.id = id.clone();
        m.timestamp_seconds = chrono::Utc::now().timestamp();
        m
    };
    h.feed
        .push_snapshot(&room, vec![chat_msg("m-1", "u-2", 100, "old"), server_copy]);
    settle().await;

    let messages = h.controller.chat().messages();
    assert_eq!(messages.len(), 2);
    let confirmed = messages.iter().find(|m| m.id == id).unwrap();
    assert_eq!(confirmed.delivery, DeliveryState::Delivered);
}

#[tokio::test(start_paused = true)]
async fn attachment_is_uploaded_before_publish() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();

    h.controller
        .chat()
        .send(
            "see attached",
            Some(Attachment {
                data: vec![0xde, 0xad],
                content_type: "image/png".to_string(),
            }),
        )
        .await
        .unwrap();
    settle().await;

    assert_eq!(h.uploader.upload_count(), 1);
    let published = h.feed.published();
    assert!(published[0].image_url.is_some());
    let messages = h.controller.chat().messages();
    assert!(messages[0].attachment_url.is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_upload_marks_the_message_failed() {
    let h = harness();
    h.controller
        .join(SessionId::from("room-1"), SessionKind::Video)
        .await
        .unwrap();
    h.uploader.fail_uploads(true);

    let err = h
        .controller
        .chat()
        .send(
            "see attached",
            Some(Attachment {
                data: vec![1],
                content_type: "image/png".to_string(),
            }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::MessageSendFailed { .. }));
    assert!(h.feed.published().is_empty());
    assert_eq!(
        h.controller.chat().messages()[0].delivery,
        DeliveryState::Failed
    );
}

#[tokio::test(start_paused = true)]
async fn leave_detaches_the_feed_subscription() {
    let h = harness();
    let room = SessionId::from("room-1");
    h.controller.join(room.clone(), SessionKind::Video).await.unwrap();
    assert_eq!(h.feed.subscriber_count(&room), 1);

    h.controller.leave().await;
    settle().await;

    assert!(!h.controller.chat().is_attached());
    assert_eq!(h.feed.subscriber_count(&room), 0);
    let err = h.controller.chat().send("late", None).await.unwrap_err();
    assert!(matches!(err, SessionError::MessageSendFailed { .. }));
}

#[tokio::test(start_paused = true)]
async fn rejoin_resets_the_message_set_to_the_new_room() {
    let h = harness();
    let room_a = SessionId::from("room-a");
    h.controller.join(room_a.clone(), SessionKind::Video).await.unwrap();
    h.feed.push_append(&room_a, chat_msg("m-1", "u-2", 100, "in a"));
    settle().await;
    assert_eq!(h.controller.chat().messages().len(), 1);

    h.controller.leave().await;
    let room_b = SessionId::from("room-b");
    h.controller.join(room_b.clone(), SessionKind::Video).await.unwrap();

    assert!(h.controller.chat().messages().is_empty());
    h.feed.push_append(&room_b, chat_msg("m-2", "u-3", 200, "in b"));
    settle().await;
    assert_eq!(h.controller.chat().messages().len(), 1);
    assert_eq!(h.controller.chat().messages()[0].content, "in b");
}
