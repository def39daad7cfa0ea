//! Change feed distribution for livepoll.
//!
//! Wraps Redis Pub/Sub: core services publish mutation events through
//! the [`livepoll_core::services::EventPublisher`] trait, and the API
//! layer consumes the local broadcast bridge to drive SSE streams.

pub mod pubsub;

pub use pubsub::{PubSubEvent, RedisPubSub, channels};
