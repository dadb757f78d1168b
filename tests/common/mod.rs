#![allow(dead_code)]

use async_trait::async_trait;
use calfeed::components::calendar::{Event, EventSource};
use calfeed::components::posts::{InMemoryPostStore, Post};
use calfeed::config::Config;
use calfeed::error::{fetch_error, parse_error, AppResult};
use calfeed::utils::time::FixedClock;
use calfeed::web::AppState;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 2024-06-12 18:00 in Berlin
pub fn now_utc() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 12, 16, 0, 0).unwrap()
}

pub fn at(offset_hours: i64) -> DateTime<FixedOffset> {
    (now_utc() + Duration::hours(offset_hours))
        .with_timezone(&chrono_tz::Europe::Berlin)
        .fixed_offset()
}

pub fn event(summary: &str, offset_hours: i64) -> Event {
    Event::new(summary, at(offset_hours), at(offset_hours + 1))
}

/// What the mock source answers with
#[derive(Debug, Clone)]
pub enum MockFeed {
    Events(Vec<Event>),
    FetchFails,
    ParseFails,
}

/// Mock implementation of the calendar feed for testing
#[derive(Debug)]
pub struct MockEventSource {
    feed: MockFeed,
    calls: AtomicUsize,
}

impl MockEventSource {
    pub fn new(feed: MockFeed) -> Self {
        Self {
            feed,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn events(&self) -> AppResult<Vec<Event>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.feed {
            MockFeed::Events(events) => Ok(events.clone()),
            MockFeed::FetchFails => Err(fetch_error("Calendar responded with HTTP 503")),
            MockFeed::ParseFails => Err(parse_error("event #0: missing DTSTART")),
        }
    }
}

pub fn test_config() -> Config {
    Config::with_calendar_url("https://calendar.example.com/basic.ics")
}

/// App state over a mock feed, a frozen clock and the given posts
pub fn test_state(config: &Config, feed: MockFeed, posts: Vec<Post>) -> AppState {
    AppState::new(
        config,
        Arc::new(MockEventSource::new(feed)),
        Arc::new(InMemoryPostStore::with_posts(posts)),
        Arc::new(FixedClock(now_utc())),
    )
}
