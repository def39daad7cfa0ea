//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use livepoll_core::services::{PollService, SessionContext, UserService};

use crate::sse::SseBroadcaster;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub poll_service: PollService,
    pub sse_broadcaster: SseBroadcaster,
}

/// Authentication middleware.
///
/// Resolves a bearer token into a [`SessionContext`] carried in request
/// extensions. Handlers that require auth extract it explicitly; there
/// is no ambient current-user state.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.authenticate_by_token(token).await
    {
        req.extensions_mut().insert(SessionContext::from_user(&user));
    }

    next.run(req).await
}
