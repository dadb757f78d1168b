use super::actor::{CalendarFeedActor, CalendarFeedActorHandle};
use super::ingest::{parse_feed, ParseMode};
use super::models::Event;
use super::EventSource;
use crate::config::Config;
use crate::error::AppResult;
use async_trait::async_trait;
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Handle for reading events from the configured calendar feed
#[derive(Clone)]
pub struct CalendarFeedHandle {
    actor_handle: CalendarFeedActorHandle,
    timezone: Tz,
    parse_mode: ParseMode,
    _actor_task: Arc<JoinHandle<()>>,
}

impl CalendarFeedHandle {
    /// Create a new CalendarFeedHandle and spawn the actor
    pub fn new(config: &Config) -> AppResult<Self> {
        // Create the actor and get its handle
        let (mut actor, handle) = CalendarFeedActor::new(config)?;

        // Spawn a task to run the actor
        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Ok(Self {
            actor_handle: handle,
            timezone: config.timezone,
            parse_mode: config.parse_mode,
            _actor_task: Arc::new(actor_task),
        })
    }

    /// Fetch (or reuse) the feed and parse it into events
    pub async fn get_events(&self) -> AppResult<Vec<Event>> {
        let body = self.actor_handle.get_feed().await?;
        let report = parse_feed(&body, self.timezone, self.parse_mode)?;
        if report.skipped > 0 {
            info!("Calendar feed had {} unusable events", report.skipped);
        }
        Ok(report.events)
    }

    /// Refetch the feed now
    pub async fn refresh(&self) -> AppResult<()> {
        self.actor_handle.refresh().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        self.actor_handle.shutdown().await
    }
}

#[async_trait]
impl EventSource for CalendarFeedHandle {
    async fn events(&self) -> AppResult<Vec<Event>> {
        self.get_events().await
    }
}
