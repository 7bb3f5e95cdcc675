//! Service-to-service authentication
//!
//! The dashboard backend authenticates with a shared secret, presented either
//! as `X-Bot-Api-Key: <token>` or `Authorization: Bearer <token>`.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::utils::AppError;
use crate::AppState;

/// Header carrying the service credential
pub const API_KEY_HEADER: &str = "x-bot-api-key";

/// Reject requests without a valid service credential
pub async fn service_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(presented) = presented_token(request.headers()) else {
        return Err(AppError::unauthorized("missing service credential"));
    };

    if !credential_matches(&state.config.auth.service_token, presented) {
        warn!(path = %request.uri().path(), "Rejected request with invalid service credential");
        return Err(AppError::unauthorized("invalid service credential"));
    }

    Ok(next.run(request).await)
}

/// Token from `X-Bot-Api-Key`, falling back to a bearer `Authorization` header
pub fn presented_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(extract_bearer_token)
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Constant-time comparison over SHA-256 digests of both tokens
pub fn credential_matches(expected: &str, presented: &str) -> bool {
    let expected = Sha256::digest(expected.as_bytes());
    let presented = Sha256::digest(presented.as_bytes());
    expected
        .iter()
        .zip(presented.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
