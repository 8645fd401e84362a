//! API key check for mutating routes
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

pub const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !key_matches(provided, &state.api_key) {
        tracing::warn!(path = %request.uri().path(), "rejected request without a valid api key");
        return ApiError::unauthorized().into_response();
    }
    next.run(request).await
}

fn key_matches(provided: &str, expected: &str) -> bool {
    !expected.is_empty() && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matches() {
        assert!(key_matches("secret", "secret"));
        assert!(!key_matches("secreT", "secret"));
        assert!(!key_matches("secret-longer", "secret"));
        assert!(!key_matches("", "secret"));
        assert!(!key_matches("", ""));
    }
}
