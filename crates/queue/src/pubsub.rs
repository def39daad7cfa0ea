//! Redis Pub/Sub change feed.
//!
//! Distributes row-level mutation events across server instances and
//! bridges them onto a local broadcast channel that the SSE layer
//! forwards to connected clients.

use async_trait::async_trait;
use fred::clients::{Client, SubscriberClient};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use livepoll_common::{AppError, AppResult};
use livepoll_core::services::EventPublisher;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Pub/Sub channel names.
pub mod channels {
    /// Poll table mutations (create, tally update, delete).
    pub const POLLS: &str = "livepoll:polls";
    /// Score table mutations.
    pub const SCORES: &str = "livepoll:scores";
}

/// Change feed event types.
///
/// Subscribers treat every variant as an invalidation signal; the
/// payload identifies the row, not its new contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PubSubEvent {
    /// A poll was created.
    PollCreated { id: i64 },
    /// A poll's tally changed.
    PollUpdated { id: i64 },
    /// A poll was deleted (vote records removed with it).
    PollDeleted { id: i64 },
    /// A user's score changed.
    ScoreUpdated { user_id: String },
}

/// Redis Pub/Sub manager for change-event distribution.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    /// Local broadcast channel for events received from Redis.
    local_tx: broadcast::Sender<PubSubEvent>,
}

impl RedisPubSub {
    /// Create a new Redis Pub/Sub manager.
    pub async fn new(redis_url: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await?;

        let (local_tx, _) = broadcast::channel(1000);

        info!("Redis Pub/Sub initialized");

        Ok(Self {
            publisher,
            subscriber,
            local_tx,
        })
    }

    /// Subscribe to the change channels and start the event loop.
    pub async fn start(&self) -> Result<(), RedisError> {
        self.subscriber.subscribe(channels::POLLS).await?;
        self.subscriber.subscribe(channels::SCORES).await?;

        info!("Subscribed to change feed channels");

        let local_tx = self.local_tx.clone();
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                if let Some(payload) = message.value.as_string() {
                    match serde_json::from_str::<PubSubEvent>(&payload) {
                        Ok(event) => {
                            debug!(?event, "Received change event");
                            if local_tx.send(event).is_err() {
                                debug!("No local subscribers for change event");
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse change event: {}", e);
                        }
                    }
                }
            }
            info!("Change feed message stream ended");
        });

        Ok(())
    }

    /// Publish an event to a channel.
    pub async fn publish(&self, channel: &str, event: &PubSubEvent) -> Result<(), RedisError> {
        let payload = serde_json::to_string(event).map_err(|e| {
            RedisError::new(
                RedisErrorKind::InvalidArgument,
                format!("Serialization error: {e}"),
            )
        })?;
        let _: () = self.publisher.publish(channel, payload).await?;
        debug!(channel, ?event, "Published change event");
        Ok(())
    }

    /// Get a receiver for local broadcast events.
    #[must_use]
    pub fn subscribe_local(&self) -> broadcast::Receiver<PubSubEvent> {
        self.local_tx.subscribe()
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> Result<(), RedisError> {
        self.subscriber.quit().await?;
        self.publisher.quit().await?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }
}

fn to_app_error(e: RedisError) -> AppError {
    AppError::Redis(e.to_string())
}

/// Implementation of `EventPublisher` for `RedisPubSub`, so core
/// services can announce mutations without depending on this crate.
#[async_trait]
impl EventPublisher for RedisPubSub {
    async fn publish_poll_created(&self, poll_id: i64) -> AppResult<()> {
        self.publish(channels::POLLS, &PubSubEvent::PollCreated { id: poll_id })
            .await
            .map_err(to_app_error)
    }

    async fn publish_poll_updated(&self, poll_id: i64) -> AppResult<()> {
        self.publish(channels::POLLS, &PubSubEvent::PollUpdated { id: poll_id })
            .await
            .map_err(to_app_error)
    }

    async fn publish_poll_deleted(&self, poll_id: i64) -> AppResult<()> {
        self.publish(channels::POLLS, &PubSubEvent::PollDeleted { id: poll_id })
            .await
            .map_err(to_app_error)
    }

    async fn publish_score_updated(&self, user_id: &str) -> AppResult<()> {
        self.publish(
            channels::SCORES,
            &PubSubEvent::ScoreUpdated {
                user_id: user_id.to_string(),
            },
        )
        .await
        .map_err(to_app_error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(channels::POLLS, "livepoll:polls");
        assert_eq!(channels::SCORES, "livepoll:scores");
    }

    #[test]
    fn test_poll_event_serialization() {
        let event = PubSubEvent::PollUpdated { id: 42 };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"pollUpdated\""));
        assert!(json.contains("\"id\":42"));

        let parsed: PubSubEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, PubSubEvent::PollUpdated { id: 42 }));
    }

    #[test]
    fn test_score_event_serialization() {
        let event = PubSubEvent::ScoreUpdated {
            user_id: "user1".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"scoreUpdated\""));
        assert!(json.contains("\"user_id\":\"user1\""));

        let parsed: PubSubEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, PubSubEvent::ScoreUpdated { .. }));
    }

    #[test]
    fn test_deleted_event_round_trip() {
        let event = PubSubEvent::PollDeleted { id: 7 };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: PubSubEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, PubSubEvent::PollDeleted { id: 7 }));
    }
}
