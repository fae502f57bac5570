//! RFC 5545 DURATION values, as used by alarm triggers.

use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;

use crate::error::{IcsError, IcsResult};
use crate::event::round_to_minutes;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([+-])?P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$",
    )
    .expect("duration pattern is valid")
});

/// Parse a duration such as `-PT15M` or `P1DT2H` into a signed [`Duration`].
pub fn parse_duration(value: &str) -> IcsResult<Duration> {
    let value = value.trim();
    let caps = DURATION_RE
        .captures(value)
        .ok_or_else(|| IcsError::InvalidDuration(value.to_string()))?;

    // "P", "PT" and "P1DT" match the pattern but are missing components.
    let missing =
        |range: std::ops::RangeInclusive<usize>| range.into_iter().all(|i| caps.get(i).is_none());
    if missing(2..=6) || (value.contains('T') && missing(4..=6)) {
        return Err(IcsError::InvalidDuration(value.to_string()));
    }

    let invalid = || IcsError::InvalidDuration(value.to_string());
    let component = |i: usize| -> IcsResult<i64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<i64>().map_err(|_| invalid()),
            None => Ok(0),
        }
    };

    let weeks = component(2)?;
    let days = component(3)?;
    let hours = component(4)?;
    let minutes = component(5)?;
    let secs = component(6)?;

    let seconds = weeks
        .checked_mul(7 * 86_400)
        .and_then(|s| s.checked_add(days.checked_mul(86_400)?))
        .and_then(|s| s.checked_add(hours.checked_mul(3_600)?))
        .and_then(|s| s.checked_add(minutes.checked_mul(60)?))
        .and_then(|s| s.checked_add(secs))
        .ok_or_else(invalid)?;

    let duration = Duration::try_seconds(seconds).ok_or_else(invalid)?;

    Ok(match caps.get(1).map(|m| m.as_str()) {
        Some("-") => -duration,
        _ => duration,
    })
}

/// Absolute length of a duration in minutes, rounding 30 seconds or more up.
/// Fails when the rounded length no longer fits a [`Duration`].
pub fn parse_duration_minutes(value: &str) -> IcsResult<i64> {
    let seconds = parse_duration(value)?.num_seconds().abs();
    let minutes = round_to_minutes(seconds);
    match Duration::try_minutes(minutes) {
        Some(_) => Ok(minutes),
        None => Err(IcsError::InvalidDuration(value.trim().to_string())),
    }
}

/// Format a signed duration, e.g. `-PT15M`, `P1DT2H`, `PT0S`.
pub fn format_duration(duration: Duration) -> String {
    let mut total = duration.num_seconds();
    let mut out = String::new();
    if total < 0 {
        out.push('-');
        total = -total;
    }
    out.push('P');

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 || (hours == 0 && minutes == 0) {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}
