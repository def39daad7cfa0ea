//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Standard success envelope. Failures are rendered by
/// [`livepoll_common::AppError`]'s `IntoResponse` impl with a matching
/// `{"error": {...}}` shape.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// The response payload.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Empty success response.
#[must_use]
pub fn ok() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let response = ApiResponse::ok(vec![1, 2, 3]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["data"][2], 3);
    }

    #[test]
    fn test_null_data_for_anonymous_session() {
        let response = ApiResponse::ok(Option::<String>::None);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["data"].is_null());
    }
}
