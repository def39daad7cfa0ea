//! HTTP API layer for livepoll.
//!
//! This crate provides the REST API and the change-propagation stream:
//!
//! - **Endpoints**: polls, votes, auth
//! - **Extractors**: explicit session context
//! - **Middleware**: bearer-token authentication
//! - **SSE**: coarse-grained invalidation events for connected clients
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;

pub use endpoints::router;
pub use sse::{SseBroadcaster, SseEvent, SubscriptionGuard};
