use crate::config::Config;
use crate::error::{component_error, fetch_error, transient_fetch_error, AppResult};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Pause before the single retry of a transient failure
const RETRY_DELAY: Duration = Duration::from_millis(250);

/// The calendar feed actor: owns the HTTP client and the cached feed body
pub struct CalendarFeedActor {
    url: String,
    client: Client,
    retries: u8,
    cache_ttl: Duration,
    stale_grace: Duration,
    cache: Option<CachedFeed>,
    command_rx: mpsc::Receiver<CalendarFeedCommand>,
}

/// Last successfully fetched feed body
struct CachedFeed {
    body: Arc<Vec<u8>>,
    fetched_at: Instant,
}

/// Freshness of the cached body relative to the configured windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Nothing cached yet
    Empty,
    /// Inside the TTL; serve without fetching
    Fresh,
    /// Past the TTL but usable if the upstream is failing
    Stale,
    /// Too old to serve
    Expired,
}

/// Classify a cache entry of the given age
pub fn cache_status(age: Option<Duration>, ttl: Duration, stale_grace: Duration) -> CacheStatus {
    match age {
        None => CacheStatus::Empty,
        Some(age) if age < ttl => CacheStatus::Fresh,
        Some(age) if age < ttl.saturating_add(stale_grace) => CacheStatus::Stale,
        Some(_) => CacheStatus::Expired,
    }
}

/// Commands that can be sent to the calendar feed actor
pub enum CalendarFeedCommand {
    GetFeed(oneshot::Sender<AppResult<Arc<Vec<u8>>>>),
    Refresh(oneshot::Sender<AppResult<()>>),
    Shutdown,
}

/// Handle for communicating with the calendar feed actor
#[derive(Clone)]
pub struct CalendarFeedActorHandle {
    command_tx: mpsc::Sender<CalendarFeedCommand>,
}

impl CalendarFeedActorHandle {
    /// Get the feed body, from cache when fresh
    pub async fn get_feed(&self) -> AppResult<Arc<Vec<u8>>> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(CalendarFeedCommand::GetFeed(response_tx))
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .await
            .map_err(|_| component_error("Response channel closed"))?
    }

    /// Fetch the feed now, ignoring the cache TTL
    pub async fn refresh(&self) -> AppResult<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(CalendarFeedCommand::Refresh(response_tx))
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .await
            .map_err(|_| component_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self.command_tx.send(CalendarFeedCommand::Shutdown).await;
        Ok(())
    }
}

impl CalendarFeedActor {
    /// Create a new actor and return its handle
    pub fn new(config: &Config) -> AppResult<(Self, CalendarFeedActorHandle)> {
        let (command_tx, command_rx) = mpsc::channel(32);

        let client = Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| component_error(&format!("Failed to build HTTP client: {}", e)))?;

        let actor = Self {
            url: config.calendar_url.clone(),
            client,
            retries: config.fetch_retries,
            cache_ttl: config.cache_ttl,
            stale_grace: config.stale_grace,
            cache: None,
            command_rx,
        };

        let handle = CalendarFeedActorHandle { command_tx };

        Ok((actor, handle))
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Calendar feed actor started");

        // Process commands
        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                CalendarFeedCommand::GetFeed(response_tx) => {
                    let result = self.get_feed().await;
                    let _ = response_tx.send(result);
                }
                CalendarFeedCommand::Refresh(response_tx) => {
                    let result = self.refresh().await.map(|_| ());
                    let _ = response_tx.send(result);
                }
                CalendarFeedCommand::Shutdown => {
                    info!("Calendar feed actor shutting down");
                    break;
                }
            }
        }

        info!("Calendar feed actor shut down");
    }

    fn status(&self) -> CacheStatus {
        let age = self.cache.as_ref().map(|c| c.fetched_at.elapsed());
        cache_status(age, self.cache_ttl, self.stale_grace)
    }

    /// Serve from cache when fresh, otherwise refetch with stale fallback
    async fn get_feed(&mut self) -> AppResult<Arc<Vec<u8>>> {
        let status = self.status();
        if status == CacheStatus::Fresh {
            if let Some(cached) = &self.cache {
                debug!("Serving calendar feed from cache");
                return Ok(Arc::clone(&cached.body));
            }
        }

        match self.refresh().await {
            Ok(body) => Ok(body),
            Err(e) => match (&self.cache, status) {
                (Some(cached), CacheStatus::Stale) => {
                    warn!("Calendar fetch failed, serving stale feed: {}", e);
                    Ok(Arc::clone(&cached.body))
                }
                _ => Err(e),
            },
        }
    }

    /// Fetch and replace the cached body
    async fn refresh(&mut self) -> AppResult<Arc<Vec<u8>>> {
        let body = Arc::new(self.fetch_with_retry().await?);
        self.cache = Some(CachedFeed {
            body: Arc::clone(&body),
            fetched_at: Instant::now(),
        });
        Ok(body)
    }

    async fn fetch_with_retry(&self) -> AppResult<Vec<u8>> {
        let mut attempt = 0;
        loop {
            match self.fetch_once().await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!("Calendar fetch failed ({}), retrying", e);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => {
                    tracing::error!("Calendar fetch failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_once(&self) -> AppResult<Vec<u8>> {
        debug!("Fetching calendar feed from {}", self.url);

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                transient_fetch_error(&format!("Failed to reach calendar: {}", e))
            } else {
                fetch_error(&format!("Failed to reach calendar: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("Calendar responded with HTTP {}", status);
            return Err(if status.is_server_error() {
                transient_fetch_error(&message)
            } else {
                fetch_error(&message)
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transient_fetch_error(&format!("Failed to read calendar body: {}", e)))?;

        Ok(body.to_vec())
    }
}
