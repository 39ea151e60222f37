//! Hub handle tests: ordering, replay and slow-consumer isolation

use crm_relay::backend::hub::{Hub, Member};
use crm_relay::shared::{AutoReplyPolicy, HubConfig, Identity, Message};
use pretty_assertions::assert_eq;

use crate::common::quiet_hub_config;

fn identity(name: &str) -> Identity {
    Identity::new(format!("id-{}", name), name)
}

#[tokio::test]
async fn test_late_joiner_sees_history_before_new_messages() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    for content in ["m1", "m2", "m3"] {
        hub.broadcast(Message::new("A", content, Vec::new())).await.unwrap();
    }

    let (_id, mut rx) = hub.connect(identity("late")).await.unwrap();
    hub.broadcast(Message::new("A", "m4", Vec::new())).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(rx.recv().await.unwrap().content().to_string());
    }
    assert_eq!(seen, vec!["m1", "m2", "m3", "m4"]);
}

#[tokio::test]
async fn test_every_member_sees_the_same_order() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let mut receivers = Vec::new();
    for name in ["a", "b", "c"] {
        let (member, rx) = Member::new(identity(name), 64);
        assert!(hub.register(member).await.unwrap());
        receivers.push(rx);
    }

    for i in 0..50 {
        hub.broadcast(Message::new("x", format!("m{}", i), Vec::new())).await.unwrap();
    }

    let expected: Vec<String> = (0..50).map(|i| format!("m{}", i)).collect();
    for rx in receivers.iter_mut() {
        let mut seen = Vec::new();
        for _ in 0..50 {
            seen.push(rx.recv().await.unwrap().content().to_string());
        }
        assert_eq!(seen, expected);
    }
}

#[tokio::test]
async fn test_slow_consumer_is_evicted_and_others_get_everything() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let (slow, mut slow_rx) = Member::new(identity("slow"), 10);
    let (fast, mut fast_rx) = Member::new(identity("fast"), 256);
    hub.register(slow).await.unwrap();
    hub.register(fast).await.unwrap();

    let reader = tokio::spawn(async move {
        let mut count = 0;
        while let Some(message) = fast_rx.recv().await {
            assert_eq!(message.content(), format!("m{}", count));
            count += 1;
            if count == 200 {
                break;
            }
        }
        count
    });

    for i in 0..200 {
        hub.broadcast(Message::new("x", format!("m{}", i), Vec::new())).await.unwrap();
    }

    assert_eq!(reader.await.unwrap(), 200);

    let stats = hub.stats().await.unwrap();
    assert_eq!(stats.connections, 1);
    assert_eq!(stats.evictions, 1);

    let mut buffered = 0;
    while slow_rx.recv().await.is_some() {
        buffered += 1;
    }
    assert_eq!(buffered, 10);
}

#[tokio::test]
async fn test_replay_overflow_rejects_registration() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    for i in 0..20 {
        hub.broadcast(Message::new("x", format!("m{}", i), Vec::new())).await.unwrap();
    }

    let (member, _rx) = Member::new(identity("tiny"), 5);
    assert!(!hub.register(member).await.unwrap());
    assert_eq!(hub.stats().await.unwrap().connections, 0);
}

#[tokio::test]
async fn test_double_unregister_is_harmless() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let (id, mut rx) = hub.connect(identity("a")).await.unwrap();
    let (_other, _other_rx) = hub.connect(identity("b")).await.unwrap();

    hub.unregister(id);
    hub.unregister(id);

    assert!(rx.recv().await.is_none());
    assert_eq!(hub.stats().await.unwrap().connections, 1);
}

#[tokio::test]
async fn test_history_limit_keeps_most_recent() {
    let (hub, _task) = Hub::spawn(&HubConfig {
        history_limit: Some(3),
        ..quiet_hub_config()
    });
    for i in 0..10 {
        hub.broadcast(Message::new("x", format!("m{}", i), Vec::new())).await.unwrap();
    }

    let contents: Vec<String> = hub
        .history()
        .await
        .unwrap()
        .iter()
        .map(|m| m.content().to_string())
        .collect();
    assert_eq!(contents, vec!["m7", "m8", "m9"]);
}

#[tokio::test]
async fn test_welcome_message_is_sent_after_replay() {
    let (hub, _task) = Hub::spawn(&HubConfig::default());
    hub.broadcast(Message::new("A", "earlier", Vec::new())).await.unwrap();

    let (_id, mut rx) = hub.connect(identity("Maria")).await.unwrap();
    assert_eq!(rx.recv().await.unwrap().content(), "earlier");

    let welcome = rx.recv().await.unwrap();
    assert_eq!(welcome.sender(), "System");
    assert_eq!(welcome.content(), "Welcome to the chat, Maria!");
    assert_eq!(hub.stats().await.unwrap().history, 1);
}

#[tokio::test]
async fn test_auto_reply_follows_mention() {
    let (hub, _task) = Hub::spawn(&HubConfig {
        auto_reply: AutoReplyPolicy {
            enabled: true,
            ..AutoReplyPolicy::default()
        },
        ..quiet_hub_config()
    });
    let (_id, mut rx) = hub.connect(identity("watcher")).await.unwrap();

    hub.broadcast(Message::new("Alice", "ping @John", vec!["John".into()])).await.unwrap();

    assert_eq!(rx.recv().await.unwrap().sender(), "Alice");
    let reply = rx.recv().await.unwrap();
    assert_eq!(reply.sender(), "John");
    assert_eq!(reply.content(), "Thanks for the mention, @Alice!");
}

#[tokio::test]
async fn test_topic_broadcast_skips_non_subscribers() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let (a, mut a_rx) = hub.connect(identity("a")).await.unwrap();
    let (_b, mut b_rx) = hub.connect(identity("b")).await.unwrap();

    hub.subscribe(a, "sales").unwrap();
    hub.broadcast_to_topic("sales", Message::new("x", "pipeline update", Vec::new()))
        .await
        .unwrap();
    hub.broadcast(Message::new("x", "everyone", Vec::new())).await.unwrap();

    let first = a_rx.recv().await.unwrap();
    assert_eq!(first.topic(), Some("sales"));
    assert_eq!(a_rx.recv().await.unwrap().content(), "everyone");
    assert_eq!(b_rx.recv().await.unwrap().content(), "everyone");

    hub.unsubscribe(a, "sales").unwrap();
    assert_eq!(hub.stats().await.unwrap().topics, 0);
}

#[tokio::test]
async fn test_late_joiner_replay_skips_topic_messages() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let (a, mut a_rx) = hub.connect(identity("a")).await.unwrap();
    hub.subscribe(a, "sales").unwrap();

    hub.broadcast_to_topic("sales", Message::new("x", "secret deal", Vec::new()))
        .await
        .unwrap();
    hub.broadcast(Message::new("x", "everyone", Vec::new())).await.unwrap();
    assert_eq!(a_rx.recv().await.unwrap().content(), "secret deal");
    assert_eq!(a_rx.recv().await.unwrap().content(), "everyone");

    let (_c, mut c_rx) = hub.connect(identity("c")).await.unwrap();
    hub.broadcast(Message::new("x", "live", Vec::new())).await.unwrap();

    let first = c_rx.recv().await.unwrap();
    assert_eq!(first.content(), "everyone");
    assert_eq!(first.topic(), None);
    assert_eq!(c_rx.recv().await.unwrap().content(), "live");
    assert_eq!(hub.stats().await.unwrap().history, 3);
}

#[tokio::test]
async fn test_unregister_racing_queued_broadcasts_ends_cleanly() {
    let (hub, _task) = Hub::spawn(&quiet_hub_config());
    let (id, mut rx) = hub.connect(identity("leaving")).await.unwrap();

    for i in 0..20 {
        hub.broadcast(Message::new("x", format!("m{}", i), Vec::new())).await.unwrap();
    }
    hub.unregister(id);

    let mut seen = Vec::new();
    while let Some(message) = rx.recv().await {
        seen.push(message.content().to_string());
    }
    let expected: Vec<String> = (0..seen.len()).map(|i| format!("m{}", i)).collect();
    assert_eq!(seen, expected);

    let stats = hub.stats().await.unwrap();
    assert_eq!(stats.connections, 0);
    assert_eq!(stats.evictions, 0);
    assert_eq!(stats.history, 20);
}
