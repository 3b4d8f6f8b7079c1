//! Tests for the Chat Channel actor.
//!
//! Verifies:
//! - Delivery on the first outbound data track, and the echo policies
//! - Receipt from participants and tracks present at attach time or later
//! - Structured and raw payload decoding
//! - Readers stop on unsubscribe and detach
//! - Each attach starts an empty log, discarding the previous room's payloads

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use room_client::actors::{ChatChannel, ChatHandle, SendOutcome};
use room_client::config::EchoPolicy;
use room_client::models::ChatMessage;
use room_test_utils::*;
use tokio_util::sync::CancellationToken;

fn spawn_chat(echo: EchoPolicy) -> ChatHandle {
    init_tracing();
    let (chat, _task) = ChatChannel::spawn(echo, CancellationToken::new());
    chat
}

fn with_data_track(
    sid: &str,
    identity: &str,
    track_sid: &str,
) -> (Arc<FakeParticipant>, Arc<FakeDataTrack>) {
    let participant = FakeParticipant::new(sid, identity);
    let track = FakeDataTrack::new(track_sid);
    participant.add_subscribed(track.handle());
    (participant, track)
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn test_send_without_outbound_track_echoes_and_warns() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "alice");
    chat.attach_room(room, "alice").await.unwrap();

    let outcome = chat.send("hello").await.unwrap();

    assert_eq!(outcome, SendOutcome::Undelivered);
    assert_eq!(chat.messages(), vec![ChatMessage::new("Me", "hello")]);
}

#[tokio::test]
async fn test_send_without_room_echoes() {
    let chat = spawn_chat(EchoPolicy::Optimistic);

    let outcome = chat.send("hello").await.unwrap();

    assert_eq!(outcome, SendOutcome::Undelivered);
    assert_eq!(chat.messages(), vec![ChatMessage::new("Me", "hello")]);
}

#[tokio::test]
async fn test_send_publishes_structured_payload() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "alice");
    let outbound = FakeDataTrack::new("DT-out");
    room.local().add_outbound_data_track(outbound.clone());
    chat.attach_room(room, "alice").await.unwrap();

    let outcome = chat.send("hi there").await.unwrap();

    assert_eq!(outcome, SendOutcome::Delivered);
    let sent = outbound.sent();
    assert_eq!(sent.len(), 1);
    let payload: serde_json::Value = serde_json::from_str(sent.first().unwrap()).unwrap();
    assert_eq!(
        payload,
        serde_json::json!({"type": "chat", "from": "alice", "text": "hi there"})
    );
    assert_eq!(chat.messages(), vec![ChatMessage::new("Me", "hi there")]);
}

#[tokio::test]
async fn test_sender_falls_back_to_me_without_display_name() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "");
    let outbound = FakeDataTrack::new("DT-out");
    room.local().add_outbound_data_track(outbound.clone());
    chat.attach_room(room, "").await.unwrap();

    chat.send("hi").await.unwrap();

    let payload: serde_json::Value =
        serde_json::from_str(outbound.sent().first().unwrap()).unwrap();
    assert_eq!(payload["from"], "Me");
}

#[tokio::test]
async fn test_blank_text_is_ignored() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "alice");
    let outbound = FakeDataTrack::new("DT-out");
    room.local().add_outbound_data_track(outbound.clone());
    chat.attach_room(room, "alice").await.unwrap();

    assert_eq!(chat.send("   ").await.unwrap(), SendOutcome::Ignored);
    assert_eq!(chat.send("").await.unwrap(), SendOutcome::Ignored);

    assert!(chat.messages().is_empty());
    assert!(outbound.sent().is_empty());
}

#[tokio::test]
async fn test_after_publish_policy_skips_echo_when_undelivered() {
    let chat = spawn_chat(EchoPolicy::AfterPublish);
    let room = FakeRoom::new("RM1", "alice");
    let outbound = FakeDataTrack::new("DT-out");
    outbound.fail_sends();
    room.local().add_outbound_data_track(outbound);
    chat.attach_room(room, "alice").await.unwrap();

    assert_eq!(chat.send("lost").await.unwrap(), SendOutcome::Undelivered);
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn test_after_publish_policy_echoes_when_delivered() {
    let chat = spawn_chat(EchoPolicy::AfterPublish);
    let room = FakeRoom::new("RM1", "alice");
    room.local().add_outbound_data_track(FakeDataTrack::new("DT-out"));
    chat.attach_room(room, "alice").await.unwrap();

    assert_eq!(chat.send("sent").await.unwrap(), SendOutcome::Delivered);
    assert_eq!(chat.messages(), vec![ChatMessage::new("Me", "sent")]);
}

// ============================================================================
// Receiving
// ============================================================================

#[tokio::test]
async fn test_receive_structured_and_raw_payloads() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "alice");
    let (carol, track) = with_data_track("PA-carol", "carol", "DT-carol");
    room.add_existing(carol);
    chat.attach_room(room, "alice").await.unwrap();

    track.deliver(r#"{"type":"chat","from":"Bob","text":"hi"}"#);
    track.deliver("raw text");

    assert_eventually("two messages", || chat.messages().len() == 2).await;
    assert_eq!(
        chat.messages(),
        vec![
            ChatMessage::new("Bob", "hi"),
            ChatMessage::new("carol", "raw text"),
        ]
    );
}

#[tokio::test]
async fn test_raw_payload_from_anonymous_participant() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "alice");
    let (anonymous, track) = with_data_track("PA-anon", "", "DT-anon");
    room.add_existing(anonymous);
    chat.attach_room(room, "alice").await.unwrap();

    track.deliver("raw text");

    assert_eventually("message received", || !chat.messages().is_empty()).await;
    assert_eq!(chat.messages(), vec![ChatMessage::new("Remote", "raw text")]);
}

#[tokio::test]
async fn test_receive_from_participant_connecting_later() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "alice");
    chat.attach_room(room.clone(), "alice").await.unwrap();

    let (dave, track) = with_data_track("PA-dave", "dave", "DT-dave");
    room.connect_participant(dave);
    assert_eventually("reader started", || track.reader_count() == 1).await;

    track.deliver(r#"{"type":"chat","from":"dave","text":"late hello"}"#);

    assert_eventually("message received", || {
        chat.messages() == vec![ChatMessage::new("dave", "late hello")]
    })
    .await;
}

#[tokio::test]
async fn test_receive_from_track_subscribing_later_read_once() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "alice");
    let erin = FakeParticipant::new("PA-erin", "erin");
    room.add_existing(erin.clone());
    chat.attach_room(room, "alice").await.unwrap();

    let track = FakeDataTrack::new("DT-erin");
    erin.subscribe_track(track.handle());
    erin.subscribe_track(track.handle());

    // A later subscription proves both earlier events were handled
    let marker = FakeDataTrack::new("DT-erin-2");
    erin.subscribe_track(marker.handle());
    assert_eventually("marker reader started", || marker.reader_count() == 1).await;
    assert_eq!(track.reader_count(), 1);

    track.deliver("once");
    marker.deliver("twice?");

    assert_eventually("two messages", || chat.messages().len() == 2).await;
    assert_eq!(
        chat.messages()
            .iter()
            .filter(|m| m.text == "once")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_unsubscribed_track_reader_stops() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "alice");
    let (frank, track) = with_data_track("PA-frank", "frank", "DT-frank");
    room.add_existing(frank.clone());
    chat.attach_room(room, "alice").await.unwrap();
    assert_eq!(track.reader_count(), 1);

    frank.unsubscribe_track("DT-frank");

    assert_eventually("reader stopped", || track.reader_count() == 0).await;
}

#[tokio::test]
async fn test_participant_disconnect_stops_readers() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "alice");
    let (gina, track) = with_data_track("PA-gina", "gina", "DT-gina");
    room.add_existing(gina.clone());
    chat.attach_room(room.clone(), "alice").await.unwrap();

    room.disconnect_participant("gina");

    assert_eventually("reader stopped", || track.reader_count() == 0).await;
    assert_eventually("listener released", || gina.listener_count() == 0).await;
}

#[tokio::test]
async fn test_detach_stops_readers_and_keeps_log() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let room = FakeRoom::new("RM1", "alice");
    let (hank, track) = with_data_track("PA-hank", "hank", "DT-hank");
    room.add_existing(hank);
    chat.attach_room(room.clone(), "alice").await.unwrap();

    track.deliver("before leave");
    assert_eventually("message received", || chat.messages().len() == 1).await;

    chat.detach_room().await.unwrap();

    assert_eventually("reader stopped", || track.reader_count() == 0).await;
    assert_eventually("room listener released", || room.listener_count() == 0).await;
    assert_eq!(chat.messages().len(), 1);

    // Sending after detach has no room to deliver to
    assert_eq!(chat.send("after").await.unwrap(), SendOutcome::Undelivered);
}

#[tokio::test]
async fn test_reattach_starts_empty_log() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let first = FakeRoom::new("RM1", "alice");
    let (hank, track) = with_data_track("PA-hank", "hank", "DT-hank");
    first.add_existing(hank);
    chat.attach_room(first, "alice").await.unwrap();

    track.deliver("first meeting");
    chat.send("bye").await.unwrap();
    assert_eventually("two messages", || chat.messages().len() == 2).await;
    chat.detach_room().await.unwrap();

    let second = FakeRoom::new("RM2", "alice");
    chat.attach_room(second, "alice").await.unwrap();

    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn test_payload_from_replaced_room_is_discarded() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let first = FakeRoom::new("RM1", "alice");
    let (hank, stale) = with_data_track("PA-hank", "hank", "DT-hank");
    first.add_existing(hank);
    chat.attach_room(first, "alice").await.unwrap();

    let second = FakeRoom::new("RM2", "alice");
    let (ivy, fresh) = with_data_track("PA-ivy", "ivy", "DT-ivy");
    second.add_existing(ivy);

    // Delivered right before the switch, possibly still queued
    stale.deliver("old room");
    chat.attach_room(second, "alice").await.unwrap();
    assert_eventually("old reader stopped", || stale.reader_count() == 0).await;
    stale.deliver("old room again");
    fresh.deliver("new room");

    assert_eventually("new message", || !chat.messages().is_empty()).await;
    assert_eq!(chat.messages(), vec![ChatMessage::new("ivy", "new room")]);
}

#[tokio::test]
async fn test_log_is_observable() {
    let chat = spawn_chat(EchoPolicy::Optimistic);
    let mut log = chat.subscribe();

    chat.send("hello").await.unwrap();

    log.changed().await.unwrap();
    assert_eq!(log.borrow().len(), 1);
}
