use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Source of the reference instant for queries
pub trait Clock: Send + Sync + 'static {
    /// Current instant in UTC
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current instant expressed in the given zone
    fn now_in(&self, tz: Tz) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&tz).fixed_offset()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant, for tests and replays
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Express an instant with the offset the zone has at that instant
pub fn in_zone<Z: TimeZone>(instant: &DateTime<Z>, tz: Tz) -> DateTime<FixedOffset> {
    instant.with_timezone(&tz).fixed_offset()
}

/// Interpret a wall-clock time in the given zone.
///
/// Ambiguous times (DST fall-back) pick the earlier instant. Times inside a
/// DST gap are moved forward an hour at a time until valid.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let mut candidate = naive;
    for _ in 0..4 {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return Some(dt.fixed_offset()),
            LocalResult::Ambiguous(earliest, _) => return Some(earliest.fixed_offset()),
            LocalResult::None => {
                candidate = candidate.checked_add_signed(chrono::Duration::hours(1))?;
            }
        }
    }
    None
}

/// Start of the given day in the zone
pub fn start_of_day(date: NaiveDate, tz: Tz) -> Option<DateTime<FixedOffset>> {
    localize(date.and_hms_opt(0, 0, 0)?, tz)
}
