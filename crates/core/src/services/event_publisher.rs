//! Event publisher service.
//!
//! Provides an abstraction for publishing change-propagation events.
//! The actual implementation is provided by the queue crate (Redis Pub/Sub).

use async_trait::async_trait;
use livepoll_common::AppResult;
use std::sync::Arc;

/// Trait for publishing change-propagation events.
///
/// This allows the core services to announce mutations without
/// depending on the queue/pubsub implementation. Subscribers treat any
/// event as an invalidation signal and re-fetch the poll collection.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a poll created event.
    async fn publish_poll_created(&self, poll_id: i64) -> AppResult<()>;

    /// Publish a poll updated event (tally changed).
    async fn publish_poll_updated(&self, poll_id: i64) -> AppResult<()>;

    /// Publish a poll deleted event.
    async fn publish_poll_deleted(&self, poll_id: i64) -> AppResult<()>;

    /// Publish a score updated event.
    async fn publish_score_updated(&self, user_id: &str) -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for testing or when
/// change propagation is disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_poll_created(&self, _poll_id: i64) -> AppResult<()> {
        Ok(())
    }

    async fn publish_poll_updated(&self, _poll_id: i64) -> AppResult<()> {
        Ok(())
    }

    async fn publish_poll_deleted(&self, _poll_id: i64) -> AppResult<()> {
        Ok(())
    }

    async fn publish_score_updated(&self, _user_id: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `EventPublisher` trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;
