mod actor;
mod handle;
pub mod ingest;
pub mod models;

pub use actor::{cache_status, CacheStatus};
pub use handle::CalendarFeedHandle;
pub use ingest::{parse_feed, ParseMode};
pub use models::{Event, IngestReport};

use crate::error::AppResult;
use async_trait::async_trait;

/// Anything that can produce the current list of calendar events
#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    /// Events in feed order, freshly parsed
    async fn events(&self) -> AppResult<Vec<Event>>;
}
