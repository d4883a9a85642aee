//! Duration strings for the polling interval.
//!
//! Accepts compound forms such as `"1h30m"`, `"45s"`, `"500ms"`, `"2d"`,
//! or a bare number of seconds.

use std::time::Duration;

use crate::app::{FeedtideError, Result};

/// Parse an interval string like "1m", "1h30m", "500ms" or "90".
///
/// Zero-length and malformed intervals are rejected with
/// [`FeedtideError::Config`].
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err(invalid(&s, "empty interval"));
    }

    let interval = if s.chars().all(|c| c.is_ascii_digit()) {
        let secs = s
            .parse::<u64>()
            .map_err(|_| invalid(&s, "seconds out of range"))?;
        Duration::from_secs(secs)
    } else {
        parse_compound(&s)?
    };

    if interval.is_zero() {
        return Err(invalid(&s, "interval must be positive"));
    }

    Ok(interval)
}

fn parse_compound(s: &str) -> Result<Duration> {
    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(invalid(s, "expected a number"));
        }
        let value = rest[..digits]
            .parse::<u64>()
            .map_err(|_| invalid(s, "number out of range"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let part = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(3600)),
            "d" => Duration::from_secs(value.saturating_mul(86400)),
            "" => return Err(invalid(s, "missing unit")),
            other => return Err(invalid(s, &format!("unknown unit '{}'", other))),
        };
        total = total.saturating_add(part);
    }

    Ok(total)
}

fn invalid(s: &str, reason: &str) -> FeedtideError {
    FeedtideError::Config(format!(
        "Invalid interval '{}': {}. Use a format like '30s', '1m', '1h30m'",
        s, reason
    ))
}

/// Format an interval for display, using the largest unit that divides it.
pub fn format_interval(interval: Duration) -> String {
    let millis = interval.as_millis();
    if millis % 1000 != 0 {
        return format!("{}ms", millis);
    }

    let secs = interval.as_secs();
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
