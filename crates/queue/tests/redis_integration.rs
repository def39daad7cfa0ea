//! Redis integration tests.
//!
//! These tests require a running Redis instance.
//! Run with: `cargo test --test redis_integration -- --ignored`
//!
//! Set `REDIS_URL` environment variable to point to your Redis instance.
//! Default: <redis://localhost:6379>

#![allow(clippy::expect_used)]

use std::time::Duration;

use livepoll_core::services::EventPublisher;
use livepoll_queue::{PubSubEvent, RedisPubSub, channels};

fn get_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

/// Test that we can connect to Redis.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_redis_connection() {
    let url = get_redis_url();
    let pubsub = RedisPubSub::new(&url).await;
    assert!(
        pubsub.is_ok(),
        "Failed to connect to Redis: {:?}",
        pubsub.err()
    );
}

/// Test change feed channel subscription.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_pubsub_subscribe_channels() {
    let url = get_redis_url();
    let pubsub = RedisPubSub::new(&url)
        .await
        .expect("Failed to connect to Redis");

    let result = pubsub.start().await;
    assert!(
        result.is_ok(),
        "Failed to subscribe to channels: {:?}",
        result.err()
    );

    pubsub.shutdown().await.expect("Failed to shutdown");
}

/// Test publishing poll mutation events through the publisher trait.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_publish_poll_events() {
    let url = get_redis_url();
    let pubsub = RedisPubSub::new(&url)
        .await
        .expect("Failed to connect to Redis");

    pubsub
        .publish_poll_created(1)
        .await
        .expect("Failed to publish poll created");
    pubsub
        .publish_poll_updated(1)
        .await
        .expect("Failed to publish poll updated");
    pubsub
        .publish_poll_deleted(1)
        .await
        .expect("Failed to publish poll deleted");
    pubsub
        .publish_score_updated("test-user-456")
        .await
        .expect("Failed to publish score updated");

    pubsub.shutdown().await.expect("Failed to shutdown");
}

/// Test that a published event comes back through the local bridge.
#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_publish_round_trip() {
    let url = get_redis_url();
    let pubsub = RedisPubSub::new(&url)
        .await
        .expect("Failed to connect to Redis");
    pubsub.start().await.expect("Failed to start event loop");

    let mut rx = pubsub.subscribe_local();

    pubsub
        .publish(channels::POLLS, &PubSubEvent::PollUpdated { id: 77 })
        .await
        .expect("Failed to publish");

    let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timed out waiting for change event")
        .expect("Broadcast channel closed");

    assert!(matches!(received, PubSubEvent::PollUpdated { id: 77 }));

    pubsub.shutdown().await.expect("Failed to shutdown");
}
