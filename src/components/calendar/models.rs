use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One concrete calendar occurrence as served by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub summary: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Event {
    pub fn new(
        summary: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            summary: summary.into(),
            start,
            end,
        }
    }
}

/// Outcome of reading a feed
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Valid events in feed order
    pub events: Vec<Event>,
    /// Components dropped in lenient mode
    pub skipped: usize,
}
