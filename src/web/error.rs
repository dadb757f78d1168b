use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

pub const FAILED_TO_FETCH_EVENTS: &str = "Failed to fetch calendar events";
pub const NO_UPCOMING_EVENTS: &str = "No upcoming events found";
pub const NO_UPCOMING_YOUTH_EVENTS: &str = "No upcoming youth events found";
pub const INVALID_COUNT: &str = "Invalid count parameter";
pub const INVALID_PAGINATION: &str = "Invalid pagination parameters";
pub const INVALID_API_KEY: &str = "Invalid API key";
pub const FAILED_TO_FETCH_POSTS: &str = "Failed to fetch posts";
pub const INTERNAL_ERROR: &str = "Internal server error";

/// Standard API error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors a handler can answer with
#[derive(Debug)]
pub enum ApiError {
    /// Calendar feed unreachable or unreadable
    Upstream(Error),
    /// Query ran fine but produced nothing
    NotFound(&'static str),
    /// Query parameters out of range
    BadRequest(&'static str),
    /// Missing or wrong `x-api-key`
    InvalidApiKey,
    /// Post store unreachable
    Posts(Error),
    /// Anything else
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Fetch { .. } | Error::Parse(_) | Error::Component(_) => ApiError::Upstream(err),
            Error::Posts(_) => ApiError::Posts(err),
            other => ApiError::Internal(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Upstream(_) | ApiError::Posts(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; upstream details stay in the logs
    pub fn message(&self) -> &'static str {
        match self {
            ApiError::Upstream(_) => FAILED_TO_FETCH_EVENTS,
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => *msg,
            ApiError::InvalidApiKey => INVALID_API_KEY,
            ApiError::Posts(_) => FAILED_TO_FETCH_POSTS,
            ApiError::Internal(_) => INTERNAL_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Upstream(err) | ApiError::Posts(err) | ApiError::Internal(err) => {
                error!("Request failed: {}", err);
            }
            _ => {}
        }

        let body = Json(ErrorResponse {
            error: self.message().to_string(),
        });
        (self.status(), body).into_response()
    }
}
