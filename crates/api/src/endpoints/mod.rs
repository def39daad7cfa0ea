//! API endpoints.

mod auth;
mod polls;

use axum::Router;

use crate::middleware::AppState;
use crate::sse;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/polls", polls::router())
        .nest("/events", sse::router())
}
