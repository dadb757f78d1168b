use super::error::ApiError;
use super::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

/// Header carrying the static API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware: when a key is configured, reject requests without it
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let authorized = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|key| keys_match(key, expected));

    match authorized {
        Some(true) => Ok(next.run(req).await),
        Some(false) => {
            warn!("Rejected request to {} with wrong API key", req.uri().path());
            Err(ApiError::InvalidApiKey)
        }
        None => {
            warn!("Rejected request to {} without API key", req.uri().path());
            Err(ApiError::InvalidApiKey)
        }
    }
}

/// Comparison whose running time does not depend on where the keys differ
fn keys_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
