//! ICS file generation.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::IcsResult;
use crate::event::{Alarm, Calendar, Event, Trigger};
use crate::ics::duration::format_duration;
use crate::ics::line::{Property, escape_text, fold};
use crate::ics::vtimezone::vtimezone_lines;
use crate::tz;

const PRODID: &str = concat!("-//icsync//icsync ", env!("CARGO_PKG_VERSION"), "//EN");

const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";
const DATE_FORMAT: &str = "%Y%m%d";

/// Generate .ics content for a whole calendar.
pub fn generate_ics(calendar: &Calendar) -> IcsResult<String> {
    for event in &calendar.events {
        event.validate()?;
    }

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
    ];

    if !calendar.name.is_empty() {
        lines.push(Property::new("X-WR-CALNAME", escape_text(&calendar.name)).to_line());
    }
    if !calendar.default_timezone.is_empty() {
        lines.push(Property::new("X-WR-TIMEZONE", calendar.default_timezone.as_str()).to_line());
    }

    if calendar.include_vtimezone {
        for (zone, year) in referenced_zones(calendar) {
            lines.extend(vtimezone_lines(zone, year));
        }
    }

    for event in &calendar.events {
        push_event(&mut lines, event, &calendar.default_timezone);
    }

    lines.push("END:VCALENDAR".to_string());

    Ok(fold(lines.iter().map(String::as_str)))
}

/// Generate .ics content holding a single event.
pub fn generate_event_ics(event: &Event) -> IcsResult<String> {
    let calendar = Calendar {
        events: vec![event.clone()],
        ..Default::default()
    };
    generate_ics(&calendar)
}

fn push_event(lines: &mut Vec<String>, event: &Event, default_tz: &str) {
    lines.push("BEGIN:VEVENT".to_string());

    let uid = if event.uid.is_empty() {
        format!("{}@icsync", uuid::Uuid::new_v4())
    } else {
        event.uid.clone()
    };
    lines.push(Property::new("UID", uid).to_line());

    // DTSTAMP is required; LAST-MODIFIED doubles as it when known
    let dtstamp = event.last_modified.unwrap_or_else(Utc::now);
    lines.push(format!("DTSTAMP:{}", dtstamp.format(UTC_FORMAT)));
    if let Some(created) = event.created {
        lines.push(format!("CREATED:{}", created.format(UTC_FORMAT)));
    }
    if let Some(last_modified) = event.last_modified {
        lines.push(format!("LAST-MODIFIED:{}", last_modified.format(UTC_FORMAT)));
    }

    lines.push(Property::new("SUMMARY", escape_text(&event.summary)).to_line());
    if let Some(ref description) = event.description {
        lines.push(Property::new("DESCRIPTION", escape_text(description)).to_line());
    }
    if let Some(ref location) = event.location {
        lines.push(Property::new("LOCATION", escape_text(location)).to_line());
    }

    let start_zone = event.start_tz.as_str();
    let end_zone = event.end_timezone();
    for (name, instant, zone) in [
        ("DTSTART", event.start, start_zone),
        ("DTEND", event.end, end_zone),
    ] {
        lines.push(time_property(name, instant, zone, event.all_day, default_tz).to_line());
    }

    if let Some(ref rrule) = event.rrule {
        lines.push(format!("RRULE:{}", rrule.trim()));
    }
    for exdate in &event.exdates {
        let prop = time_property("EXDATE", *exdate, start_zone, event.all_day, default_tz);
        lines.push(prop.to_line());
    }

    if !event.categories.is_empty() {
        let categories: Vec<String> = event.categories.iter().map(|c| escape_text(c)).collect();
        lines.push(Property::new("CATEGORIES", categories.join(",")).to_line());
    }

    for attendee in &event.attendees {
        let value = if attendee.contains(':') {
            attendee.clone()
        } else {
            format!("mailto:{attendee}")
        };
        lines.push(Property::new("ATTENDEE", value).to_line());
    }

    if (1..=9).contains(&event.priority) {
        lines.push(format!("PRIORITY:{}", event.priority));
    }
    if let Some(ref status) = event.status {
        lines.push(Property::new("STATUS", status.to_ascii_uppercase()).to_line());
    }

    for alarm in &event.alarms {
        push_alarm(lines, alarm);
    }

    lines.push("END:VEVENT".to_string());
}

fn push_alarm(lines: &mut Vec<String>, alarm: &Alarm) {
    let action = if alarm.action.is_empty() {
        "DISPLAY"
    } else {
        alarm.action.as_str()
    };
    let description = if alarm.description.is_empty() {
        "Reminder"
    } else {
        alarm.description.as_str()
    };

    lines.push("BEGIN:VALARM".to_string());
    lines.push(format!("ACTION:{}", action.to_ascii_uppercase()));
    lines.push(Property::new("DESCRIPTION", escape_text(description)).to_line());
    let trigger = match alarm.trigger {
        Trigger::Relative(offset) => Property::new("TRIGGER", format_duration(offset)),
        Trigger::Absolute(at) => Property::new("TRIGGER", at.format(UTC_FORMAT).to_string())
            .with_param("VALUE", "DATE-TIME"),
    };
    lines.push(trigger.to_line());
    lines.push("END:VALARM".to_string());
}

/// DTSTART/DTEND/EXDATE in the form the decoder reads back to the same instant.
///
/// All-day values are bare dates; they carry TZID whenever the event names a
/// zone so the date is read in that zone again. Timed values in a known,
/// non-UTC zone are local wall-clock times with TZID, everything else is UTC.
fn time_property(
    name: &str,
    instant: DateTime<Utc>,
    zone_label: &str,
    all_day: bool,
    default_tz: &str,
) -> Property {
    if all_day {
        let zone = tz::resolve([zone_label, default_tz]);
        let date = instant.with_timezone(&zone).date_naive();
        let prop =
            Property::new(name, date.format(DATE_FORMAT).to_string()).with_param("VALUE", "DATE");
        return if zone_label.trim().is_empty() {
            prop
        } else {
            prop.with_param("TZID", zone_label.trim())
        };
    }

    if tz::is_utc_label(zone_label) {
        return Property::new(name, instant.format(UTC_FORMAT).to_string());
    }

    match tz::lookup(zone_label) {
        Some(zone) => {
            let local = instant.with_timezone(&zone);
            Property::new(name, local.format(LOCAL_FORMAT).to_string())
                .with_param("TZID", zone.name())
        }
        None => {
            warn!(zone = zone_label, "Unknown timezone, writing {} as UTC", name);
            Property::new(name, instant.format(UTC_FORMAT).to_string())
        }
    }
}

/// Zones that appear in a TZID parameter, in first-use order, with the year
/// of their first use.
fn referenced_zones(calendar: &Calendar) -> Vec<(Tz, i32)> {
    let mut zones: Vec<(Tz, i32)> = Vec::new();

    for event in &calendar.events {
        for (label, instant) in [
            (event.start_tz.as_str(), event.start),
            (event.end_timezone(), event.end),
        ] {
            if tz::is_utc_label(label) {
                continue;
            }
            let Some(zone) = tz::lookup(label) else {
                continue;
            };
            if !zones.iter().any(|(z, _)| *z == zone) {
                zones.push((zone, instant.with_timezone(&zone).year()));
            }
        }
    }

    zones
}
