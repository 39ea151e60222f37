//! Connection pump tests over the in-memory transport

use std::sync::Arc;
use std::time::Duration;

use crm_relay::backend::connection::{serve_connection, ExitReason, Frame, TransportError};
use crm_relay::backend::hub::Hub;
use crm_relay::shared::{ConnectionConfig, Identity};
use assert_matches::assert_matches;
use tokio::task::JoinHandle;

use crate::common::{context, quiet_hub_config, wait_for_stats, ChannelTransport, RecordingStore, TestPeer};

fn connect(hub: &Hub, store: &Arc<RecordingStore>, name: &str) -> (TestPeer, JoinHandle<ExitReason>) {
    connect_with(hub, store, name, ConnectionConfig::default())
}

fn connect_with(
    hub: &Hub,
    store: &Arc<RecordingStore>,
    name: &str,
    config: ConnectionConfig,
) -> (TestPeer, JoinHandle<ExitReason>) {
    let (transport, peer) = ChannelTransport::pair();
    let ctx = context(hub, Arc::clone(store), config);
    let identity = Identity::new(format!("id-{}", name), name);
    (peer, tokio::spawn(serve_connection(transport, identity, ctx)))
}

#[tokio::test]
async fn test_mention_message_is_broadcast_and_replayed() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());

    let (mut a, _a_task) = connect(&hub, &store, "A");
    a.send_text(r#"{"content":"hello @B"}"#);

    let echoed = a.next_text().await;
    let message: serde_json::Value = serde_json::from_str(&echoed).unwrap();
    assert_eq!(message["sender"], "A");
    assert_eq!(message["content"], "hello @B");
    assert_eq!(message["mentions"], serde_json::json!(["B"]));
    assert!(!message["id"].as_str().unwrap().is_empty());
    assert!(message.get("topic").is_none());
    assert!(chrono::DateTime::parse_from_rfc3339(message["timestamp"].as_str().unwrap()).is_ok());

    let (mut c, _c_task) = connect(&hub, &store, "C");
    assert_eq!(c.next_text().await, echoed);
}

#[tokio::test]
async fn test_malformed_frames_are_skipped() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());
    let (mut peer, task) = connect(&hub, &store, "A");

    peer.send_text("not json");
    peer.send_text(r#"{"content":"   "}"#);
    peer.send_text(r#"{"type":"shout","content":"hi"}"#);
    peer.send_text(r#"{"content":"still here"}"#);

    assert_eq!(peer.next_message().await.content(), "still here");
    assert!(!task.is_finished());
    assert_eq!(hub.stats().await.unwrap().history, 1);
}

#[tokio::test]
async fn test_accepted_messages_are_persisted() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());
    let (mut peer, _task) = connect(&hub, &store, "A");

    peer.send_text(r#"{"content":"log me @ops"}"#);
    let broadcast = peer.next_message().await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while store.saved().is_empty() {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let (saved, sender) = store.saved().remove(0);
    assert_eq!(saved, broadcast);
    assert_eq!(sender.user_id, "id-A");
}

#[tokio::test]
async fn test_peer_hang_up_unregisters() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());
    let (mut peer, task) = connect(&hub, &store, "A");
    wait_for_stats(&hub, |s| s.connections == 1).await;

    peer.hang_up();
    assert_matches!(task.await.unwrap(), ExitReason::PeerClosed);
    assert_eq!(hub.stats().await.unwrap().connections, 0);
    assert_eq!(peer.next_frame().await, Some(Frame::Close));
}

#[tokio::test]
async fn test_close_frame_ends_connection() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());
    let (peer, task) = connect(&hub, &store, "A");

    peer.send(Frame::Close);
    assert_matches!(task.await.unwrap(), ExitReason::PeerClosed);
    wait_for_stats(&hub, |s| s.connections == 0).await;
}

#[tokio::test(start_paused = true)]
async fn test_idle_connection_times_out() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());
    let config = ConnectionConfig {
        ping_interval_secs: 30,
        idle_timeout_secs: 1,
        ..ConnectionConfig::default()
    };
    let (mut peer, task) = connect_with(&hub, &store, "quiet", config);

    assert_matches!(task.await.unwrap(), ExitReason::IdleTimeout);
    assert_eq!(peer.next_frame().await, Some(Frame::Close));
}

#[tokio::test(start_paused = true)]
async fn test_pong_keeps_connection_alive() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());
    let config = ConnectionConfig {
        ping_interval_secs: 1,
        idle_timeout_secs: 3,
        ..ConnectionConfig::default()
    };
    let (mut peer, task) = connect_with(&hub, &store, "chatty", config);

    for _ in 0..5 {
        let ping = tokio::time::timeout(Duration::from_secs(2), peer.from_server.recv())
            .await
            .unwrap();
        assert_eq!(ping, Some(Frame::Ping));
        peer.send(Frame::Pong);
    }
    assert!(!task.is_finished());
}

#[tokio::test]
async fn test_topic_frames_route_to_subscribers() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());
    let (mut a, _a_task) = connect(&hub, &store, "A");
    let (mut b, _b_task) = connect(&hub, &store, "B");

    a.send_text(r#"{"type":"subscribe","topic":"sales"}"#);
    wait_for_stats(&hub, |s| s.topics == 1 && s.connections == 2).await;

    b.send_text(r#"{"content":"new lead","topic":"sales"}"#);
    b.send_text(r#"{"type":"message","content":"hi all"}"#);

    let first = a.next_message().await;
    assert_eq!(first.content(), "new lead");
    assert_eq!(first.topic(), Some("sales"));
    assert_eq!(a.next_message().await.content(), "hi all");
    assert_eq!(b.next_message().await.content(), "hi all");

    a.send_text(r#"{"type":"unsubscribe","topic":"sales"}"#);
    wait_for_stats(&hub, |s| s.topics == 0).await;
}

#[tokio::test]
async fn test_late_joiner_is_not_replayed_room_traffic() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());
    let (mut a, _a_task) = connect(&hub, &store, "A");

    a.send_text(r#"{"type":"subscribe","topic":"sales"}"#);
    wait_for_stats(&hub, |s| s.topics == 1 && s.connections == 1).await;
    a.send_text(r#"{"content":"secret deal","topic":"sales"}"#);
    assert_eq!(a.next_message().await.content(), "secret deal");
    a.send_text(r#"{"content":"hello all"}"#);
    assert_eq!(a.next_message().await.content(), "hello all");

    let (mut c, _c_task) = connect(&hub, &store, "C");
    let replayed = c.next_message().await;
    assert_eq!(replayed.content(), "hello all");
    assert_eq!(replayed.topic(), None);

    wait_for_stats(&hub, |s| s.connections == 2).await;
    a.send_text(r#"{"content":"welcome C"}"#);
    assert_eq!(c.next_message().await.content(), "welcome C");
}

#[tokio::test]
async fn test_write_failure_ends_connection() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());
    let (mut peer, task) = connect(&hub, &store, "A");
    wait_for_stats(&hub, |s| s.connections == 1).await;

    peer.stop_reading();
    hub.broadcast(crm_relay::shared::Message::new("x", "anyone?", Vec::new()))
        .await
        .unwrap();

    assert_matches!(task.await.unwrap(), ExitReason::WriteError(TransportError::Closed));
    wait_for_stats(&hub, |s| s.connections == 0).await;
}

#[tokio::test]
async fn test_stalled_writer_is_evicted_without_blocking_others() {
    let (hub, _task) = Hub::spawn(&crm_relay::shared::HubConfig {
        outbound_capacity: 4,
        ..quiet_hub_config()
    });
    let store = Arc::new(RecordingStore::default());

    let (transport, _stalled_peer) = ChannelTransport::stalled();
    let ctx = context(&hub, Arc::clone(&store), ConnectionConfig::default());
    let _stalled = tokio::spawn(serve_connection(transport, Identity::new("s", "Stalled"), ctx));
    let (mut healthy, _healthy_task) = connect(&hub, &store, "Healthy");
    wait_for_stats(&hub, |s| s.connections == 2).await;

    for i in 0..20 {
        hub.broadcast(crm_relay::shared::Message::new("x", format!("m{}", i), Vec::new()))
            .await
            .unwrap();
        assert_eq!(healthy.next_message().await.content(), format!("m{}", i));
    }

    let stats = hub.stats().await.unwrap();
    assert_eq!(stats.connections, 1);
    assert_eq!(stats.evictions, 1);
}

#[tokio::test]
async fn test_hub_shutdown_closes_connections() {
    let (hub, task) = Hub::spawn(&quiet_hub_config());
    let store = Arc::new(RecordingStore::default());
    let (mut peer, conn) = connect(&hub, &store, "A");
    wait_for_stats(&hub, |s| s.connections == 1).await;

    hub.shutdown();
    task.await.unwrap();

    assert_matches!(conn.await.unwrap(), ExitReason::QueueClosed);
    assert_eq!(peer.next_frame().await, Some(Frame::Close));
}
