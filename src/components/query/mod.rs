//! Stateless "what's next" queries over a snapshot of events.
//!
//! Callers capture `now` once per request and pass the same value to every
//! call. Nothing here performs I/O or touches shared state.

mod rank;

pub use rank::{rank_key, RankKey};

use crate::components::calendar::Event;
use crate::error::{config_error, Error};
use chrono::{DateTime, FixedOffset};
use std::str::FromStr;

/// Treatment of events whose start lies before `now`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PastEventPolicy {
    /// Drop them before ranking
    #[default]
    Exclude,
    /// Keep them, ranked after every upcoming event
    Deprioritize,
}

impl FromStr for PastEventPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(PastEventPolicy::Exclude),
            "deprioritize" => Ok(PastEventPolicy::Deprioritize),
            other => Err(config_error(&format!(
                "Invalid past event policy '{}', expected 'exclude' or 'deprioritize'",
                other
            ))),
        }
    }
}

/// The `count` events that come next, soonest first.
///
/// Ties keep their input order. Returns fewer than `count` when fewer events
/// qualify, and nothing for an empty input or `count == 0`.
pub fn next_n(
    events: &[Event],
    now: &DateTime<FixedOffset>,
    count: usize,
    policy: PastEventPolicy,
) -> Vec<Event> {
    ranked(events.iter(), now, policy)
        .into_iter()
        .take(count)
        .cloned()
        .collect()
}

/// The soonest event satisfying `predicate`, or `None` when nothing matches
pub fn next_matching<P>(
    events: &[Event],
    now: &DateTime<FixedOffset>,
    predicate: P,
    policy: PastEventPolicy,
) -> Option<Event>
where
    P: Fn(&Event) -> bool,
{
    ranked(events.iter().filter(|&e| predicate(e)), now, policy)
        .into_iter()
        .next()
        .cloned()
}

/// Predicate: summary contains `keyword` (case-sensitive)
pub fn summary_contains(keyword: &str) -> impl Fn(&Event) -> bool + '_ {
    move |event: &Event| event.summary.contains(keyword)
}

fn ranked<'a, I>(events: I, now: &DateTime<FixedOffset>, policy: PastEventPolicy) -> Vec<&'a Event>
where
    I: Iterator<Item = &'a Event>,
{
    let mut candidates: Vec<&Event> = match policy {
        PastEventPolicy::Exclude => events.filter(|e| e.start >= *now).collect(),
        PastEventPolicy::Deprioritize => events.collect(),
    };
    // sort_by_key is stable
    candidates.sort_by_key(|e| rank_key(e, now));
    candidates
}
