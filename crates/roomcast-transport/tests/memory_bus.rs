//! Integration tests for the in-memory bus.
//!
//! These drive the bus purely through the public [`Transport`] trait, the
//! same way a room session does, to verify ordering, echo, replay and
//! per-subscription teardown.

#![cfg(feature = "memory")]

use std::time::Duration;

use roomcast_transport::{ChannelId, MemoryBus, Transport, TransportError};

fn events() -> ChannelId {
    ChannelId::new("roomcast/events")
}

#[tokio::test]
async fn test_subscriber_receives_messages_in_publish_order() {
    let bus = MemoryBus::new();
    let publisher = bus.client();
    let listener = bus.client();
    let mut sub = listener.subscribe(&events()).await.unwrap();

    for i in 0..5u8 {
        publisher.publish(&events(), vec![i]).await.unwrap();
    }

    let mut seen = Vec::new();
    for _ in 0..5 {
        let msg = sub.recv().await.expect("message");
        seen.push((msg.seq, msg.payload[0]));
    }
    assert_eq!(seen, vec![(1, 0), (2, 1), (3, 2), (4, 3), (5, 4)]);
}

#[tokio::test]
async fn test_publisher_receives_its_own_message() {
    // The bus echoes; sessions must tolerate seeing their own events.
    let bus = MemoryBus::new();
    let client = bus.client();
    let mut sub = client.subscribe(&events()).await.unwrap();

    client.publish(&events(), b"self".to_vec()).await.unwrap();

    let msg = sub.recv().await.unwrap();
    assert_eq!(msg.payload, b"self".to_vec());
}

#[tokio::test]
async fn test_subscription_only_sees_messages_after_subscribe() {
    let bus = MemoryBus::new();
    let client = bus.client();
    client.publish(&events(), b"before".to_vec()).await.unwrap();

    let mut sub = client.subscribe(&events()).await.unwrap();
    client.publish(&events(), b"after".to_vec()).await.unwrap();

    assert_eq!(sub.recv().await.unwrap().payload, b"after".to_vec());
    // History still has both.
    let replay = client.resend(&events(), 0).await.unwrap();
    assert_eq!(replay.len(), 2);
}

#[tokio::test]
async fn test_unsubscribe_leaves_other_subscriptions_intact() {
    // Two rooms share one connection and one channel.
    let bus = MemoryBus::new();
    let client = bus.client();
    let mut room_a = client.subscribe(&events()).await.unwrap();
    let mut room_b = client.subscribe(&events()).await.unwrap();
    assert_eq!(bus.subscriber_count(), 2);

    client.unsubscribe(room_a.id()).await.unwrap();
    client.publish(&events(), b"x".to_vec()).await.unwrap();

    assert!(room_a.recv().await.is_none(), "cancelled stream ends");
    assert_eq!(room_b.recv().await.unwrap().payload, b"x".to_vec());
    assert_eq!(bus.subscriber_count(), 1);
}

#[tokio::test]
async fn test_close_ends_only_that_clients_subscriptions() {
    let bus = MemoryBus::new();
    let a = bus.client();
    let b = bus.client();
    let mut sub_a = a.subscribe(&events()).await.unwrap();
    let mut sub_b = b.subscribe(&events()).await.unwrap();

    a.close().await.unwrap();
    b.publish(&events(), vec![9]).await.unwrap();

    assert!(sub_a.recv().await.is_none());
    assert_eq!(sub_b.recv().await.unwrap().payload, vec![9]);
}

#[tokio::test]
async fn test_fault_injection_surfaces_typed_errors() {
    let bus = MemoryBus::new();
    let client = bus.client();

    bus.fail_subscribe(Some("no ack"));
    assert!(matches!(
        client.subscribe(&events()).await,
        Err(TransportError::SubscribeFailed(_))
    ));
    bus.fail_subscribe(None);

    bus.fail_resend(Some("storage down"));
    assert!(matches!(
        client.resend(&events(), 0).await,
        Err(TransportError::ResendFailed(_))
    ));
    bus.fail_resend(None);

    bus.fail_publish(Some("rate limited"));
    assert!(matches!(
        client.publish(&events(), vec![]).await,
        Err(TransportError::PublishFailed(_))
    ));
    assert!(bus.history(&events()).is_empty(), "failed publish is not logged");
}

#[tokio::test(start_paused = true)]
async fn test_stalled_resend_never_completes() {
    let bus = MemoryBus::new();
    bus.stall_resend(true);
    let client = bus.client();

    let result = tokio::time::timeout(Duration::from_secs(30), client.resend(&events(), 0)).await;

    assert!(result.is_err(), "resend should still be pending");
}

#[tokio::test(start_paused = true)]
async fn test_stalled_subscribe_is_never_acknowledged() {
    let bus = MemoryBus::new();
    bus.stall_subscribe(true);
    let client = bus.client();

    let result = tokio::time::timeout(Duration::from_secs(30), client.subscribe(&events())).await;

    assert!(result.is_err(), "subscribe should still be pending");
    assert_eq!(bus.subscriber_count(), 0);
}
