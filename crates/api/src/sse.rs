//! Server-Sent Events for change propagation.
//!
//! Every storage mutation event is forwarded to connected clients as a
//! coarse invalidation signal: the client re-fetches the poll
//! collection rather than patching local state. Each connection holds a
//! subscription guard that is released when the stream drops.

#![allow(missing_docs)]

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::middleware::AppState;

/// SSE event types sent to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SseEvent {
    /// Connection established.
    Connected,
    /// Any poll-table mutation; the client re-fetches all polls.
    PollsInvalidated {
        #[serde(skip_serializing_if = "Option::is_none")]
        poll_id: Option<i64>,
    },
    /// Any score-table mutation.
    ScoresInvalidated { user_id: String },
}

/// Broadcast hub feeding every connected SSE client.
#[derive(Clone)]
pub struct SseBroadcaster {
    events: broadcast::Sender<SseEvent>,
    active: Arc<AtomicUsize>,
}

/// Scope object tying a subscription to one connection's lifetime.
///
/// Dropping the guard releases the subscription; the receiver must not
/// outlive it.
pub struct SubscriptionGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let remaining = self.active.fetch_sub(1, Ordering::Relaxed) - 1;
        debug!(remaining, "SSE subscription released");
    }
}

impl SseBroadcaster {
    /// Create a new broadcaster.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1000);
        Self {
            events,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Subscribe a new client. Returns the receiver and the guard that
    /// must live exactly as long as the client's stream.
    #[must_use]
    pub fn subscribe(&self) -> (broadcast::Receiver<SseEvent>, SubscriptionGuard) {
        self.active.fetch_add(1, Ordering::Relaxed);
        (
            self.events.subscribe(),
            SubscriptionGuard {
                active: self.active.clone(),
            },
        )
    }

    /// Broadcast an event to all connected clients.
    pub fn send(&self, event: SseEvent) {
        // No receivers is not an error; nobody is watching
        let _ = self.events.send(event);
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}

impl Default for SseBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Change propagation SSE stream.
async fn events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (rx, guard) = state.sse_broadcaster.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        // Holding the guard here ties the subscription to the stream;
        // it drops when the client disconnects.
        let _scope = &guard;
        let event = match result {
            Ok(event) => event,
            // A lagged receiver missed events; the client must resync
            Err(_) => SseEvent::PollsInvalidated { poll_id: None },
        };
        Some(Ok(Event::default()
            .json_data(&event)
            .unwrap_or_else(|_| Event::default().data("error"))))
    });

    let initial = stream::once(async {
        Ok(Event::default()
            .json_data(&SseEvent::Connected)
            .unwrap_or_else(|_| Event::default().data("connected")))
    });

    Sse::new(initial.chain(stream)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// Router for the events stream.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(events_stream))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_guard_tracks_lifetime() {
        let broadcaster = SseBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);

        let (_rx1, guard1) = broadcaster.subscribe();
        let (_rx2, guard2) = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        drop(guard1);
        assert_eq!(broadcaster.subscriber_count(), 1);
        drop(guard2);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_invalidation_event_shape() {
        let event = SseEvent::PollsInvalidated { poll_id: Some(9) };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"pollsInvalidated\""));
        assert!(json.contains("\"poll_id\":9"));

        let bare = SseEvent::PollsInvalidated { poll_id: None };
        let json = serde_json::to_string(&bare).unwrap();
        assert!(!json.contains("poll_id"));
    }

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let broadcaster = SseBroadcaster::new();
        let (mut rx, _guard) = broadcaster.subscribe();

        broadcaster.send(SseEvent::PollsInvalidated { poll_id: Some(1) });

        let received = rx.recv().await.unwrap();
        assert!(matches!(
            received,
            SseEvent::PollsInvalidated { poll_id: Some(1) }
        ));
    }
}
