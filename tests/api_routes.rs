mod common;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use calfeed::components::posts::{InMemoryPostStore, Post, PostStore};
use calfeed::error::{posts_error, AppResult};
use calfeed::utils::time::FixedClock;
use calfeed::web::{router, AppState};
use chrono::Duration;
use common::{event, now_utc, test_config, test_state, MockEventSource, MockFeed};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn get(app: Router, uri: &str, api_key: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }
    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn feed_app(feed: MockFeed) -> Router {
    router(test_state(&test_config(), feed, Vec::new()))
}

fn sample_feed() -> MockFeed {
    MockFeed::Events(vec![
        event("Monatsversammlung", 48),
        event("Jugenduebung Knoten", 72),
        event("Uebung Atemschutz", 2),
        event("Fahrzeugpflege", -24),
        event("Jugenduebung Funk", -3),
    ])
}

fn summaries(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|e| e["summary"].as_str().unwrap())
        .collect()
}

fn post(id: &str, hours_ago: i64) -> Post {
    Post {
        id: id.to_string(),
        text: format!("Post {}", id),
        url: None,
        author: Some("Wehrfuehrung".to_string()),
        published_at: now_utc() - Duration::hours(hours_ago),
    }
}

#[tokio::test]
async fn test_all_events_in_feed_order() {
    let (status, body) = get(feed_app(sample_feed()), "/api/all", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        summaries(&body),
        vec![
            "Monatsversammlung",
            "Jugenduebung Knoten",
            "Uebung Atemschutz",
            "Fahrzeugpflege",
            "Jugenduebung Funk",
        ]
    );
    // Offsets are local, summer time in Berlin
    assert_eq!(body[2]["start"], "2024-06-12T20:00:00+02:00");
    assert_eq!(body[2]["end"], "2024-06-12T21:00:00+02:00");
}

#[tokio::test]
async fn test_all_events_empty_feed() {
    let (status, body) = get(feed_app(MockFeed::Events(vec![])), "/api/all", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(vec![]));
}

#[tokio::test]
async fn test_next_event_defaults_to_single_object() {
    for uri in ["/api/ne", "/api/ne?c=1", "/api/next-event"] {
        let (status, body) = get(feed_app(sample_feed()), uri, None).await;

        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert!(body.is_object(), "{}", uri);
        assert_eq!(body["summary"], "Uebung Atemschutz");
    }
}

#[tokio::test]
async fn test_next_events_as_array() {
    let (status, body) = get(feed_app(sample_feed()), "/api/ne?c=2", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summaries(&body), vec!["Uebung Atemschutz", "Monatsversammlung"]);
}

#[tokio::test]
async fn test_next_events_count_larger_than_feed() {
    let (status, body) = get(feed_app(sample_feed()), "/api/ne?c=10", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        summaries(&body),
        vec!["Uebung Atemschutz", "Monatsversammlung", "Jugenduebung Knoten"]
    );
}

#[tokio::test]
async fn test_next_events_invalid_count() {
    for uri in ["/api/ne?c=0", "/api/ne?c=-1", "/api/ne?c=abc", "/api/ne?c=1&c=2"] {
        let (status, body) = get(feed_app(sample_feed()), uri, None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"], "Invalid count parameter");
    }
}

#[tokio::test]
async fn test_next_event_none_upcoming() {
    let feed = MockFeed::Events(vec![event("Fahrzeugpflege", -24)]);
    let (status, body) = get(feed_app(feed), "/api/ne", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No upcoming events found");
}

#[tokio::test]
async fn test_next_youth_event() {
    for uri in ["/api/nj", "/api/next-ju"] {
        let (status, body) = get(feed_app(sample_feed()), uri, None).await;

        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["summary"], "Jugenduebung Knoten");
    }
}

#[tokio::test]
async fn test_next_youth_event_missing() {
    let feed = MockFeed::Events(vec![event("Uebung Atemschutz", 2)]);
    let (status, body) = get(feed_app(feed), "/api/nj", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No upcoming youth events found");
}

#[tokio::test]
async fn test_upstream_failures_are_bad_gateway() {
    for feed in [MockFeed::FetchFails, MockFeed::ParseFails] {
        for uri in ["/api/all", "/api/ne", "/api/nj"] {
            let (status, body) = get(feed_app(feed.clone()), uri, None).await;

            assert_eq!(status, StatusCode::BAD_GATEWAY, "{}", uri);
            assert_eq!(body["error"], "Failed to fetch calendar events");
        }
    }
}

#[tokio::test]
async fn test_invalid_params_skip_the_feed() {
    let source = Arc::new(MockEventSource::new(sample_feed()));
    let state = AppState::new(
        &test_config(),
        source.clone(),
        Arc::new(InMemoryPostStore::new()),
        Arc::new(FixedClock(now_utc())),
    );

    let (status, _) = get(router(state), "/api/ne?c=0", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let mut config = test_config();
    config.api_key = Some("s3cret".to_string());
    let app = router(test_state(&config, sample_feed(), Vec::new()));

    let (status, body) = get(app.clone(), "/api/all", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid API key");

    let (status, body) = get(app.clone(), "/api/ne", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid API key");

    let (status, body) = get(app, "/api/ne", Some("s3cret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "Uebung Atemschutz");
}

#[tokio::test]
async fn test_ping_is_public() {
    let mut config = test_config();
    config.api_key = Some("s3cret".to_string());
    let app = router(test_state(&config, MockFeed::FetchFails, Vec::new()));

    let response = app
        .oneshot(Request::builder().uri("/api/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Pong");
}

#[tokio::test]
async fn test_posts_pagination() {
    let posts = vec![post("a", 5), post("b", 1), post("c", 3)];
    let app = router(test_state(&test_config(), sample_feed(), posts));

    let (status, body) = get(app.clone(), "/api/posts?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["has_more"], true);
    let ids: Vec<&str> = body["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b", "c"]);

    let (status, body) = get(app, "/api/posts?page=2&limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_more"], false);
    assert_eq!(body["posts"][0]["id"], "a");
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_posts_defaults_on_empty_store() {
    let (status, body) = get(feed_app(sample_feed()), "/api/posts", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 10);
    assert_eq!(body["has_more"], false);
    assert_eq!(body["posts"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_posts_invalid_pagination() {
    for uri in [
        "/api/posts?page=0",
        "/api/posts?limit=0",
        "/api/posts?limit=51",
        "/api/posts?page=x",
        "/api/posts?page=1&page=2",
    ] {
        let (status, body) = get(feed_app(sample_feed()), uri, None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"], "Invalid pagination parameters");
    }
}

#[tokio::test]
async fn test_posts_page_far_beyond_the_end() {
    let posts = vec![post("a", 5), post("b", 1)];
    let app = router(test_state(&test_config(), sample_feed(), posts));

    let (status, body) = get(app, "/api/posts?page=18446744073709551615&limit=10", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["posts"], Value::Array(vec![]));
    assert_eq!(body["has_more"], false);
}

/// Post store that is always down
struct BrokenPostStore;

#[async_trait]
impl PostStore for BrokenPostStore {
    async fn latest(&self, _offset: usize, _limit: usize) -> AppResult<Vec<Post>> {
        Err(posts_error("connection refused"))
    }

    async fn insert(&self, _post: &Post) -> AppResult<()> {
        Err(posts_error("connection refused"))
    }
}

#[tokio::test]
async fn test_posts_store_failure() {
    let state = AppState::new(
        &test_config(),
        Arc::new(MockEventSource::new(sample_feed())),
        Arc::new(BrokenPostStore),
        Arc::new(FixedClock(now_utc())),
    );

    let (status, body) = get(router(state), "/api/posts", None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to fetch posts");
}
