//! Auth endpoints: the stand-in surface for the external identity
//! provider (register, current session, sign-out).

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use livepoll_common::AppResult;
use livepoll_core::services::RegisterInput;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{AuthSession, MaybeAuthSession},
    middleware::AppState,
    response::{ApiResponse, ok},
};

/// Register request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 128))]
    pub username: String,
    #[validate(email)]
    pub email: String,
}

/// Register response, including the issued bearer token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub token: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<ApiResponse<RegisterResponse>> {
    req.validate()?;

    let user = state
        .user_service
        .register(RegisterInput {
            username: req.username,
            email: req.email,
        })
        .await?;

    Ok(ApiResponse::ok(RegisterResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        token: user.token,
    }))
}

/// Current session response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: String,
    pub username: String,
    pub email: String,
}

/// Current session, or null when unauthenticated.
async fn session(
    MaybeAuthSession(maybe): MaybeAuthSession,
) -> ApiResponse<Option<SessionResponse>> {
    ApiResponse::ok(maybe.map(|ctx| SessionResponse {
        user_id: ctx.user_id,
        username: ctx.username,
        email: ctx.email,
    }))
}

/// Invalidate the caller's bearer token.
async fn signout(
    AuthSession(ctx): AuthSession,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    state.user_service.sign_out(&ctx).await?;
    Ok(ok())
}

/// Router for auth endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/session", get(session))
        .route("/signout", post(signout))
}
