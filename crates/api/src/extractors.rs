//! Request extractors.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use livepoll_core::services::SessionContext;

/// Authenticated session extractor.
///
/// The session context is resolved by the auth middleware and carried
/// in request extensions; handlers receive it as an explicit value.
#[derive(Debug, Clone)]
pub struct AuthSession(pub SessionContext);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .map(AuthSession)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

/// Optional authenticated session extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthSession(pub Option<SessionContext>);

impl<S> FromRequestParts<S> for MaybeAuthSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<SessionContext>().cloned()))
    }
}
