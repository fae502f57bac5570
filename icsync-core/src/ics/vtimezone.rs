//! VTIMEZONE blocks derived from the tz database.
//!
//! chrono-tz doesn't expose transition rules, so the offsets of the given year
//! are scanned day by day and each change is pinned down to the second.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Offset, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

struct Transition {
    at: DateTime<Utc>,
    from: i32,
    to: i32,
    name: String,
}

/// The VTIMEZONE lines (unfolded) describing `tz` around `year`.
pub fn vtimezone_lines(tz: Tz, year: i32) -> Vec<String> {
    let mut lines = vec![
        "BEGIN:VTIMEZONE".to_string(),
        format!("TZID:{}", tz.name()),
    ];

    let transitions = transitions_in_year(tz, year);

    if transitions.is_empty() {
        let sample = Utc
            .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let offset = offset_seconds(tz, sample);
        lines.extend([
            "BEGIN:STANDARD".to_string(),
            "DTSTART:19700101T000000".to_string(),
            format!("TZOFFSETFROM:{}", format_offset(offset)),
            format!("TZOFFSETTO:{}", format_offset(offset)),
            format!("TZNAME:{}", tz.offset_from_utc_datetime(&sample.naive_utc())),
            "END:STANDARD".to_string(),
        ]);
    } else {
        let recurring = transitions.len() == 2;
        for transition in &transitions {
            let kind = if transition.to > transition.from {
                "DAYLIGHT"
            } else {
                "STANDARD"
            };
            // DTSTART is the wall-clock moment of the change, before it happens
            let local = transition.at.naive_utc() + Duration::seconds(transition.from.into());

            lines.push(format!("BEGIN:{kind}"));
            lines.push(format!("DTSTART:{}", local.format("%Y%m%dT%H%M%S")));
            if recurring {
                lines.push(format!(
                    "RRULE:FREQ=YEARLY;BYMONTH={};BYDAY={}",
                    local.month(),
                    by_day(local.date())
                ));
            }
            lines.push(format!("TZOFFSETFROM:{}", format_offset(transition.from)));
            lines.push(format!("TZOFFSETTO:{}", format_offset(transition.to)));
            lines.push(format!("TZNAME:{}", transition.name));
            lines.push(format!("END:{kind}"));
        }
    }

    lines.push("END:VTIMEZONE".to_string());
    lines
}

fn offset_seconds(tz: Tz, at: DateTime<Utc>) -> i32 {
    tz.offset_from_utc_datetime(&at.naive_utc())
        .fix()
        .local_minus_utc()
}

fn transitions_in_year(tz: Tz, year: i32) -> Vec<Transition> {
    let (Some(mut day), Some(end)) = (
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single(),
        Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single(),
    ) else {
        return Vec::new();
    };

    let mut transitions = Vec::new();
    while day < end {
        let next = day + Duration::days(1);
        let (before, after) = (offset_seconds(tz, day), offset_seconds(tz, next));
        if before != after {
            let at = find_change(tz, day, next, before);
            transitions.push(Transition {
                at,
                from: before,
                to: after,
                name: tz.offset_from_utc_datetime(&at.naive_utc()).to_string(),
            });
        }
        day = next;
    }
    transitions
}

/// First second in `(low, high]` whose offset differs from `before`.
fn find_change(
    tz: Tz,
    mut low: DateTime<Utc>,
    mut high: DateTime<Utc>,
    before: i32,
) -> DateTime<Utc> {
    while high - low > Duration::seconds(1) {
        let mid = low + (high - low) / 2;
        if offset_seconds(tz, mid) == before {
            low = mid;
        } else {
            high = mid;
        }
    }
    high
}

fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.abs();
    let (hours, minutes, secs) = (abs / 3600, (abs % 3600) / 60, abs % 60);
    if secs == 0 {
        format!("{sign}{hours:02}{minutes:02}")
    } else {
        format!("{sign}{hours:02}{minutes:02}{secs:02}")
    }
}

/// `BYDAY` for the n-th (or last) weekday of the month containing `date`.
fn by_day(date: NaiveDate) -> String {
    let weekday = match date.weekday() {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    };

    let is_last = (date + Duration::days(7)).month() != date.month();
    if is_last {
        format!("-1{weekday}")
    } else {
        format!("{}{weekday}", (date.day() - 1) / 7 + 1)
    }
}
