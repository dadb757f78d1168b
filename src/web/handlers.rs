use super::error::{
    ApiError, INVALID_COUNT, INVALID_PAGINATION, NO_UPCOMING_EVENTS, NO_UPCOMING_YOUTH_EVENTS,
};
use super::AppState;
use crate::components::calendar::Event;
use crate::components::posts::{fetch_page, PostPage, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::components::query::{next_matching, next_n, summary_contains};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::debug;

/// Query string of the next-event routes
#[derive(Debug, Deserialize)]
pub struct CountParams {
    pub c: Option<String>,
}

/// Query string of the post feed
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /api/all - every event in feed order
pub async fn all_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state.events.events().await?;
    Ok(Json(events))
}

/// GET /api/ne - next `c` events; a single object when `c` is 1
pub async fn next_events(
    State(state): State<AppState>,
    params: Result<Query<CountParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|e| {
        debug!("Rejected count query: {}", e);
        ApiError::BadRequest(INVALID_COUNT)
    })?;
    let count = parse_positive(params.c.as_deref(), 1).ok_or(ApiError::BadRequest(INVALID_COUNT))?;

    let events = state.events.events().await?;
    let now = state.now();
    let mut next = next_n(&events, &now, count, state.past_event_policy);
    debug!("{} of {} events qualify as next at {}", next.len(), events.len(), now);

    match (count, next.len()) {
        (_, 0) => Err(ApiError::NotFound(NO_UPCOMING_EVENTS)),
        (1, _) => Ok(Json(next.swap_remove(0)).into_response()),
        _ => Ok(Json(next).into_response()),
    }
}

/// GET /api/nj - next event whose summary has the youth keyword
pub async fn next_youth_event(State(state): State<AppState>) -> Result<Json<Event>, ApiError> {
    let events = state.events.events().await?;
    let now = state.now();

    next_matching(
        &events,
        &now,
        summary_contains(&state.youth_keyword),
        state.past_event_policy,
    )
    .map(Json)
    .ok_or(ApiError::NotFound(NO_UPCOMING_YOUTH_EVENTS))
}

/// GET /api/posts - one page of the post feed, newest first
pub async fn posts(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<PostPage>, ApiError> {
    let Query(params) = params.map_err(|e| {
        debug!("Rejected pagination query: {}", e);
        ApiError::BadRequest(INVALID_PAGINATION)
    })?;
    let page = parse_positive(params.page.as_deref(), 1);
    let limit = parse_positive(params.limit.as_deref(), DEFAULT_PAGE_SIZE)
        .filter(|limit| *limit <= MAX_PAGE_SIZE);

    let (Some(page), Some(limit)) = (page, limit) else {
        return Err(ApiError::BadRequest(INVALID_PAGINATION));
    };

    let page = fetch_page(state.posts.as_ref(), page, limit).await?;
    Ok(Json(page))
}

/// GET /api/ping - liveness
pub async fn ping() -> &'static str {
    "Pong"
}

/// Missing means `default`; otherwise an integer of at least 1
fn parse_positive(raw: Option<&str>, default: usize) -> Option<usize> {
    match raw {
        None => Some(default),
        Some(raw) => raw.trim().parse::<usize>().ok().filter(|n| *n >= 1),
    }
}
