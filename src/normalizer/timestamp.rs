//! Publication timestamp parsing.
//!
//! RSS `<pubDate>` values are tried against a fixed, ordered list of
//! RFC 1123 layouts. The leading weekday is optional and never checked
//! against the date, since feeds get it wrong often enough.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::app::{FeedtideError, Result};

const NUMERIC_ZONE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";
const NAMED_ZONE_FORMAT: &str = "%d %b %Y %H:%M:%S";

struct Layout {
    name: &'static str,
    parse: fn(&str) -> Option<DateTime<FixedOffset>>,
}

/// Tried in order; the first match wins.
const LAYOUTS: [Layout; 3] = [
    Layout {
        name: "rfc1123-numeric-zone",
        parse: parse_numeric_zone,
    },
    Layout {
        name: "rfc1123-named-zone",
        parse: parse_named_zone,
    },
    Layout {
        name: "rfc1123-numeric-zone-single-digit-day",
        parse: parse_single_digit_day,
    },
];

/// Parse a raw publication date into a UTC instant.
///
/// Fails with [`FeedtideError::UnrecognizedTimeFormat`] carrying the raw
/// input when no layout matches.
pub fn normalize_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let body = strip_weekday(raw.trim());

    for layout in &LAYOUTS {
        if let Some(parsed) = (layout.parse)(body) {
            tracing::trace!(layout = layout.name, raw, "parsed timestamp");
            return Ok(parsed.with_timezone(&Utc));
        }
    }

    Err(FeedtideError::UnrecognizedTimeFormat(raw.to_string()))
}

fn strip_weekday(s: &str) -> &str {
    match s.split_once(',') {
        Some((day, rest)) if day.len() == 3 && day.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest.trim_start()
        }
        _ => s,
    }
}

/// Width of the leading day-of-month field, or 0 if it isn't numeric.
fn day_width(s: &str) -> usize {
    match s.split_whitespace().next() {
        Some(day) if day.chars().all(|c| c.is_ascii_digit()) => day.len(),
        _ => 0,
    }
}

fn parse_numeric_zone(s: &str) -> Option<DateTime<FixedOffset>> {
    if day_width(s) != 2 {
        return None;
    }
    DateTime::parse_from_str(s, NUMERIC_ZONE_FORMAT).ok()
}

fn parse_single_digit_day(s: &str) -> Option<DateTime<FixedOffset>> {
    if day_width(s) != 1 {
        return None;
    }
    DateTime::parse_from_str(s, NUMERIC_ZONE_FORMAT).ok()
}

fn parse_named_zone(s: &str) -> Option<DateTime<FixedOffset>> {
    if day_width(s) != 2 {
        return None;
    }
    let (datetime, zone) = s.rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = NaiveDateTime::parse_from_str(datetime.trim_end(), NAMED_ZONE_FORMAT).ok()?;
    offset.from_local_datetime(&naive).single()
}

/// RFC 822 zone names. Any other alphabetic abbreviation is taken as UTC.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || zone.len() > 5 || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let hours = match zone.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}
