use crate::components::calendar::Event;
use chrono::{DateTime, FixedOffset};

/// Sort key for "what comes next".
///
/// Variant order matters: every `Upcoming` sorts before `Overdue`, and
/// `Upcoming` keys compare by instant regardless of offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RankKey {
    /// Starts at or after the reference instant
    Upcoming(DateTime<FixedOffset>),
    /// Already started; ranks after any real timestamp
    Overdue,
}

/// Rank an event against `now`. Starting exactly at `now` counts as upcoming.
pub fn rank_key(event: &Event, now: &DateTime<FixedOffset>) -> RankKey {
    if event.start >= *now {
        RankKey::Upcoming(event.start)
    } else {
        RankKey::Overdue
    }
}
