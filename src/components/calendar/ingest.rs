//! Turns raw iCalendar feed bytes into [`Event`] values.
//!
//! Every `VEVENT` becomes exactly one event; `RRULE` and friends are not
//! expanded. Times are expressed in the configured zone so the API output
//! carries the local offset.

use super::models::{Event, IngestReport};
use crate::error::{config_error, parse_error, AppResult, Error};
use crate::utils::time::{in_zone, localize, start_of_day};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use icalendar::parser::{read_calendar, unfold, Component, Property};
use std::str::FromStr;
use tracing::{debug, warn};

/// What to do with a feed entry that lacks a usable field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// The first bad entry fails the whole feed
    #[default]
    Strict,
    /// Bad entries are dropped and counted
    Lenient,
}

impl FromStr for ParseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ParseMode::Strict),
            "lenient" => Ok(ParseMode::Lenient),
            other => Err(config_error(&format!(
                "Invalid parse mode '{}', expected 'strict' or 'lenient'",
                other
            ))),
        }
    }
}

/// Parse a whole feed, keeping the order entries appear in
pub fn parse_feed(bytes: &[u8], tz: Tz, mode: ParseMode) -> AppResult<IngestReport> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| parse_error(&format!("Feed is not valid UTF-8: {}", e)))?;

    let unfolded = unfold(content);
    if !unfolded.contains("BEGIN:VCALENDAR") {
        return Err(parse_error("Feed does not contain a VCALENDAR"));
    }

    let calendar = read_calendar(&unfolded)
        .map_err(|e| parse_error(&format!("Invalid iCalendar data: {}", e)))?;

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let mut report = IngestReport::default();
    for (index, vevent) in vevents.into_iter().enumerate() {
        match normalize_event(vevent, tz) {
            Ok(event) => report.events.push(event),
            Err(reason) => match mode {
                ParseMode::Strict => {
                    return Err(parse_error(&format!("event #{}: {}", index, reason)));
                }
                ParseMode::Lenient => {
                    warn!("Skipping calendar event #{}: {}", index, reason);
                    report.skipped += 1;
                }
            },
        }
    }

    debug!(
        "Parsed {} events from feed ({} skipped)",
        report.events.len(),
        report.skipped
    );

    Ok(report)
}

/// Depth-first walk, so nested VEVENTs keep document order
fn collect_vevents<'c, 'a>(components: &'c [Component<'a>], out: &mut Vec<&'c Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

fn normalize_event(vevent: &Component<'_>, tz: Tz) -> Result<Event, String> {
    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .ok_or_else(|| "missing SUMMARY".to_string())?;

    let start = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| "missing DTSTART".to_string())
        .and_then(|p| parse_time_property(p, tz).map_err(|e| format!("bad DTSTART: {}", e)))?;

    let end = vevent
        .find_prop("DTEND")
        .ok_or_else(|| "missing DTEND".to_string())
        .and_then(|p| parse_time_property(p, tz).map_err(|e| format!("bad DTEND: {}", e)))?;

    if end < start {
        return Err(format!("DTEND {} is before DTSTART {}", end, start));
    }

    Ok(Event {
        summary,
        start,
        end,
    })
}

/// Parse a DTSTART/DTEND property.
///
/// Handles:
/// - UTC: `DTSTART:20240108T100000Z`
/// - TZID parameter: `DTSTART;TZID=Europe/Berlin:20240108T100000`
/// - Floating: `DTSTART:20240108T100000` (read in the configured zone)
/// - VALUE=DATE: `DTSTART;VALUE=DATE:20240108` (midnight in the configured zone)
fn parse_time_property(prop: &Property<'_>, tz: Tz) -> Result<DateTime<FixedOffset>, String> {
    let value = prop.val.as_ref().trim();

    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"))
        || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()));

    if is_date {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|e| format!("'{}': {}", value, e))?;
        return start_of_day(date, tz).ok_or_else(|| format!("'{}' has no midnight", value));
    }

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .map_err(|e| format!("'{}': {}", value, e))?;
        return Ok(in_zone(&naive.and_utc(), tz));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .map_err(|e| format!("'{}': {}", value, e))?;
    let zone = match tzid {
        Some(id) => resolve_tzid(&id).unwrap_or_else(|| {
            debug!("Unknown TZID '{}', reading time in {}", id, tz);
            tz
        }),
        None => tz,
    };

    localize(naive, zone)
        .map(|dt| in_zone(&dt, tz))
        .ok_or_else(|| format!("'{}' does not exist in {}", value, zone))
}

/// Accepts plain IANA names plus the quoted and `/vendor/Area/City` spellings
fn resolve_tzid(tzid: &str) -> Option<Tz> {
    let trimmed = tzid.trim().trim_matches('"');
    if let Ok(tz) = trimmed.parse::<Tz>() {
        return Some(tz);
    }

    // e.g. /mozilla.org/20050126_1/Europe/Berlin
    let parts: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty()).collect();
    (2..=3)
        .filter(|n| parts.len() >= *n)
        .find_map(|n| parts[parts.len() - n..].join("/").parse::<Tz>().ok())
}

/// Unescape TEXT values per RFC 5545
/// Reverses: \, → , and \; → ; and \\ → \ and \n → newline
fn unescape_text(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(',') | Some(';') | Some('\\') => {
                    if let Some(next) = chars.next() {
                        result.push(next);
                    }
                }
                Some('n') | Some('N') => {
                    result.push('\n');
                    chars.next();
                }
                _ => result.push(c),
            }
        } else {
            result.push(c);
        }
    }

    result
}
