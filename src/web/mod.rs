pub mod auth;
pub mod error;
mod handlers;

use crate::components::calendar::EventSource;
use crate::components::posts::PostStore;
use crate::components::query::PastEventPolicy;
use crate::config::Config;
use crate::utils::time::Clock;
use axum::{middleware, routing::get, Router};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared, read-only state for every request
#[derive(Clone)]
pub struct AppState {
    /// Where calendar events come from
    pub events: Arc<dyn EventSource>,
    /// Where posts come from
    pub posts: Arc<dyn PostStore>,
    /// Source of "now"
    pub clock: Arc<dyn Clock>,
    /// Zone "now" is expressed in
    pub timezone: Tz,
    /// Treatment of already started events
    pub past_event_policy: PastEventPolicy,
    /// Summary substring for the youth route
    pub youth_keyword: Arc<str>,
    /// Required `x-api-key` value, if any
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        config: &Config,
        events: Arc<dyn EventSource>,
        posts: Arc<dyn PostStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            posts,
            clock,
            timezone: config.timezone,
            past_event_policy: config.past_event_policy,
            youth_keyword: Arc::from(config.youth_keyword.as_str()),
            api_key: config.api_key.as_deref().map(Arc::from),
        }
    }

    /// Reference instant for one request
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now_in(self.timezone)
    }
}

/// Build the router with all routes and middlewares
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/all", get(handlers::all_events))
        .route("/api/ne", get(handlers::next_events))
        .route("/api/next-event", get(handlers::next_events))
        .route("/api/nj", get(handlers::next_youth_event))
        .route("/api/next-ju", get(handlers::next_youth_event))
        .route("/api/posts", get(handlers::posts))
        // Apply API key middleware
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/api/ping", get(handlers::ping))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
