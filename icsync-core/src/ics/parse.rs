//! ICS parsing.
//!
//! The decoder is a small state machine over unfolded content lines:
//! outside any event, inside a VEVENT, or inside a VALARM of that VEVENT.
//! Fields that fail to parse are skipped and reported as [`ParseWarning`]s
//! instead of failing the whole document.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::error::IcsError;
use crate::event::{Alarm, Event, Trigger, minutes_between};
use crate::ics::duration::parse_duration_minutes;
use crate::ics::line::{Property, parse_property, split_text_list, unescape_text, unfold};
use crate::tz;

/// Result of decoding an ICS document.
#[derive(Debug, Clone, Default)]
pub struct ParsedCalendar {
    /// `X-WR-CALNAME`, if present
    pub name: Option<String>,
    /// First `X-WR-TIMEZONE` seen
    pub default_timezone: Option<String>,
    /// Events in document order
    pub events: Vec<Event>,
    /// Fields that were skipped because they couldn't be parsed
    pub warnings: Vec<ParseWarning>,
}

/// A field that was dropped while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based logical (unfolded) line number
    pub line: usize,
    pub property: String,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: {} {:?}: {}",
            self.line, self.property, self.value, self.reason
        )
    }
}

/// Decode every VEVENT in `content`.
pub fn parse_calendar(content: &str) -> ParsedCalendar {
    let mut decoder = Decoder::default();
    for (index, line) in unfold(content).iter().enumerate() {
        decoder.feed(index + 1, line);
    }
    decoder.finish()
}

/// Decode every VEVENT in `content`, discarding warnings.
pub fn parse_events(content: &str) -> Vec<Event> {
    parse_calendar(content).events
}

#[derive(Default)]
enum State {
    #[default]
    Outside,
    InEvent(Box<EventDraft>),
    InAlarm(Box<EventDraft>, AlarmDraft),
}

#[derive(Default)]
struct EventDraft {
    line: usize,
    uid: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    start_tz: String,
    end_tz: String,
    all_day: bool,
    rrule: Option<String>,
    exdates: BTreeSet<DateTime<Utc>>,
    alarms: Vec<Alarm>,
    categories: BTreeSet<String>,
    attendees: BTreeSet<String>,
    priority: u8,
    status: Option<String>,
    created: Option<DateTime<Utc>>,
    last_modified: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct AlarmDraft {
    action: Option<String>,
    description: Option<String>,
    /// Whichever TRIGGER form parsed last
    trigger: Option<Trigger>,
}

/// A date or date-time resolved to an instant.
struct Resolved {
    at: DateTime<Utc>,
    all_day: bool,
    zone: String,
}

#[derive(Default)]
struct Decoder {
    state: State,
    name: Option<String>,
    default_tz: Option<String>,
    events: Vec<Event>,
    warnings: Vec<ParseWarning>,
}

impl Decoder {
    fn feed(&mut self, line_no: usize, line: &str) {
        let Some(prop) = parse_property(line) else {
            if !matches!(self.state, State::Outside) {
                self.warn(line_no, "", line, "not a property line");
            }
            return;
        };

        match prop.name.as_str() {
            "BEGIN" => self.begin(line_no, &prop),
            "END" => self.end(line_no, &prop),
            "X-WR-TIMEZONE" => {
                if self.default_tz.is_none() && !prop.value.is_empty() {
                    self.default_tz = Some(prop.value.clone());
                }
            }
            "X-WR-CALNAME" => {
                if self.name.is_none() {
                    self.name = Some(unescape_text(&prop.value));
                }
            }
            _ => match std::mem::take(&mut self.state) {
                State::Outside => {}
                State::InEvent(mut draft) => {
                    self.event_property(line_no, &prop, &mut draft);
                    self.state = State::InEvent(draft);
                }
                State::InAlarm(draft, mut alarm) => {
                    self.alarm_property(line_no, &prop, &draft, &mut alarm);
                    self.state = State::InAlarm(draft, alarm);
                }
            },
        }
    }

    fn begin(&mut self, line_no: usize, prop: &Property) {
        let component = prop.value.to_ascii_uppercase();
        self.state = match (std::mem::take(&mut self.state), component.as_str()) {
            (State::Outside, "VEVENT") => State::InEvent(Box::new(EventDraft {
                line: line_no,
                ..Default::default()
            })),
            (State::InEvent(draft), "VEVENT") | (State::InAlarm(draft, _), "VEVENT") => {
                self.warn(draft.line, "BEGIN", "VEVENT", "event never ended");
                State::InEvent(Box::new(EventDraft {
                    line: line_no,
                    ..Default::default()
                }))
            }
            (State::InEvent(draft), "VALARM") => State::InAlarm(draft, AlarmDraft::default()),
            (state, _) => state,
        };
    }

    fn end(&mut self, line_no: usize, prop: &Property) {
        let component = prop.value.to_ascii_uppercase();
        self.state = match (std::mem::take(&mut self.state), component.as_str()) {
            (State::InAlarm(mut draft, alarm), "VALARM") => {
                self.commit_alarm(line_no, &mut draft, alarm);
                State::InEvent(draft)
            }
            (State::InEvent(draft), "VEVENT") => {
                self.finalize(*draft);
                State::Outside
            }
            (State::InAlarm(draft, _), "VEVENT") => {
                self.warn(line_no, "END", "VEVENT", "alarm never ended");
                self.finalize(*draft);
                State::Outside
            }
            (state, _) => state,
        };
    }

    fn event_property(&mut self, line_no: usize, prop: &Property, draft: &mut EventDraft) {
        match prop.name.as_str() {
            "UID" => draft.uid = Some(prop.value.clone()),
            "SUMMARY" => draft.summary = Some(unescape_text(&prop.value)),
            "DESCRIPTION" => draft.description = Some(unescape_text(&prop.value)),
            "LOCATION" => draft.location = Some(unescape_text(&prop.value)),
            "RRULE" => draft.rrule = Some(prop.value.trim().to_string()),
            "DTSTART" => {
                let candidates = self.zone_candidates(line_no, prop, None);
                match parse_time_value(&prop.value, prop.is_date_value(), &candidates) {
                    Ok(resolved) => {
                        draft.start = Some(resolved.at);
                        draft.all_day |= resolved.all_day;
                        if !resolved.zone.is_empty() {
                            draft.start_tz = resolved.zone;
                        }
                    }
                    Err(reason) => self.warn(line_no, "DTSTART", &prop.value, &reason),
                }
            }
            "DTEND" => {
                let candidates =
                    self.zone_candidates(line_no, prop, Some(draft.start_tz.as_str()));
                match parse_time_value(&prop.value, prop.is_date_value(), &candidates) {
                    Ok(resolved) => {
                        draft.end = Some(resolved.at);
                        draft.all_day |= resolved.all_day;
                        if !resolved.zone.is_empty() {
                            draft.end_tz = resolved.zone;
                        }
                    }
                    Err(reason) => self.warn(line_no, "DTEND", &prop.value, &reason),
                }
            }
            "EXDATE" => {
                let candidates =
                    self.zone_candidates(line_no, prop, Some(draft.start_tz.as_str()));
                for value in prop.value.split(',').map(str::trim).filter(|v| !v.is_empty()) {
                    match parse_time_value(value, prop.is_date_value(), &candidates) {
                        Ok(resolved) => {
                            draft.exdates.insert(resolved.at);
                        }
                        Err(reason) => self.warn(line_no, "EXDATE", value, &reason),
                    }
                }
            }
            "CATEGORIES" => draft.categories.extend(split_text_list(&prop.value)),
            "ATTENDEE" => {
                let value = prop.value.trim();
                let address = match value.get(..7) {
                    Some(scheme) if scheme.eq_ignore_ascii_case("mailto:") => &value[7..],
                    _ => value,
                };
                if !address.is_empty() {
                    draft.attendees.insert(address.to_string());
                }
            }
            "PRIORITY" => match prop.value.parse::<u8>() {
                Ok(priority) if priority <= 9 => draft.priority = priority,
                _ => self.warn(line_no, "PRIORITY", &prop.value, "expected 0-9"),
            },
            "STATUS" => draft.status = Some(prop.value.to_ascii_uppercase()),
            "CREATED" | "LAST-MODIFIED" => {
                let candidates = self.zone_candidates(line_no, prop, None);
                match parse_time_value(&prop.value, false, &candidates) {
                    Ok(resolved) if prop.name == "CREATED" => draft.created = Some(resolved.at),
                    Ok(resolved) => draft.last_modified = Some(resolved.at),
                    Err(reason) => self.warn(line_no, &prop.name, &prop.value, &reason),
                }
            }
            _ => {}
        }
    }

    fn alarm_property(
        &mut self,
        line_no: usize,
        prop: &Property,
        draft: &EventDraft,
        alarm: &mut AlarmDraft,
    ) {
        match prop.name.as_str() {
            "ACTION" => alarm.action = Some(prop.value.to_ascii_uppercase()),
            "DESCRIPTION" => alarm.description = Some(unescape_text(&prop.value)),
            "TRIGGER" => {
                let candidates =
                    self.zone_candidates(line_no, prop, Some(draft.start_tz.as_str()));
                if let Ok(resolved) =
                    parse_time_value(&prop.value, prop.is_date_value(), &candidates)
                {
                    alarm.trigger = Some(Trigger::Absolute(resolved.at));
                    return;
                }
                let offset = parse_duration_minutes(&prop.value)
                    .and_then(|minutes| {
                        Duration::try_minutes(minutes)
                            .ok_or_else(|| IcsError::InvalidDuration(prop.value.clone()))
                    });
                match offset {
                    Ok(offset) => alarm.trigger = Some(Trigger::Relative(-offset)),
                    Err(err) => self.warn(line_no, "TRIGGER", &prop.value, &err.to_string()),
                }
            }
            _ => {}
        }
    }

    fn commit_alarm(&mut self, line_no: usize, draft: &mut EventDraft, alarm: AlarmDraft) {
        let Some(trigger) = alarm.trigger else {
            self.warn(line_no, "VALARM", "", "alarm has no usable TRIGGER");
            return;
        };

        // Relative reminders must land strictly before the start; absolute ones
        // are checked once DTSTART is known.
        if let Trigger::Relative(offset) = trigger {
            if offset >= Duration::zero() {
                debug!(line = line_no, "Dropping alarm that does not fire before the start");
                return;
            }
        }

        draft.alarms.push(Alarm {
            action: alarm.action.unwrap_or_else(|| "DISPLAY".to_string()),
            description: alarm.description.unwrap_or_else(|| "Reminder".to_string()),
            trigger,
        });
    }

    fn finalize(&mut self, draft: EventDraft) {
        let Some(start) = draft.start else {
            self.warn(draft.line, "DTSTART", "", "event has no usable DTSTART; skipped");
            return;
        };

        let default_length = if draft.all_day {
            Duration::days(1)
        } else {
            Duration::hours(1)
        };
        let end = match draft.end {
            Some(end) if end > start || (draft.all_day && end == start) => end,
            Some(end) => {
                self.warn(
                    draft.line,
                    "DTEND",
                    &end.to_rfc3339(),
                    "end is not after start; using the default length",
                );
                start + default_length
            }
            None => start + default_length,
        };

        let end_tz = if draft.end_tz.is_empty() {
            draft.start_tz.clone()
        } else {
            draft.end_tz
        };

        let alarms = draft
            .alarms
            .into_iter()
            .filter(|alarm| match alarm.trigger {
                Trigger::Absolute(at) => minutes_between(start, at) > 0,
                Trigger::Relative(_) => true,
            })
            .collect();

        self.events.push(Event {
            uid: draft.uid.unwrap_or_default(),
            summary: draft.summary.unwrap_or_default(),
            description: draft.description,
            location: draft.location,
            start,
            end,
            start_tz: draft.start_tz,
            end_tz,
            all_day: draft.all_day,
            rrule: draft.rrule.filter(|r| !r.is_empty()),
            exdates: draft.exdates,
            alarms,
            categories: draft.categories,
            attendees: draft.attendees,
            priority: draft.priority,
            status: draft.status,
            created: draft.created,
            last_modified: draft.last_modified,
        });
    }

    /// Zone names to try for a value, most specific first. An unknown TZID is
    /// reported and skipped.
    fn zone_candidates(
        &mut self,
        line_no: usize,
        prop: &Property,
        start_tz: Option<&str>,
    ) -> Vec<String> {
        let mut candidates = Vec::with_capacity(3);
        if let Some(tzid) = prop.param("TZID") {
            if tz::lookup(tzid).is_none() {
                self.warn(line_no, &prop.name, tzid, "unknown TZID; using fallback zone");
            }
            candidates.push(tzid.to_string());
        }
        if let Some(start_tz) = start_tz {
            candidates.push(start_tz.to_string());
        }
        if let Some(ref default_tz) = self.default_tz {
            candidates.push(default_tz.clone());
        }
        candidates
    }

    fn warn(&mut self, line: usize, property: &str, value: &str, reason: &str) {
        warn!(line, property, value, "{}", reason);
        self.warnings.push(ParseWarning {
            line,
            property: property.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        });
    }

    fn finish(mut self) -> ParsedCalendar {
        match std::mem::take(&mut self.state) {
            State::Outside => {}
            State::InEvent(draft) | State::InAlarm(draft, _) => {
                self.warn(draft.line, "BEGIN", "VEVENT", "event never ended; skipped");
            }
        }

        ParsedCalendar {
            name: self.name,
            default_timezone: self.default_tz,
            events: self.events,
            warnings: self.warnings,
        }
    }
}

/// Parse a DATE or DATE-TIME value.
///
/// Bare dates are midnight in the resolved zone and mark the value all-day.
/// `Z`-suffixed values are UTC. Anything else is wall-clock time in the first
/// known zone among `candidates`, or the system zone.
fn parse_time_value(
    value: &str,
    date_only: bool,
    candidates: &[String],
) -> Result<Resolved, String> {
    let value = value.trim();

    if date_only || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit())) {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|e| format!("invalid date: {e}"))?;
        let zone = resolve_zone(candidates);
        let at = tz::start_of_day(zone, date).map_err(|e| e.to_string())?;
        return Ok(Resolved {
            at,
            all_day: true,
            zone: zone.name().to_string(),
        });
    }

    if let Some(utc) = value.strip_suffix(['Z', 'z']) {
        return Ok(Resolved {
            at: parse_naive(utc)?.and_utc(),
            all_day: false,
            zone: "UTC".to_string(),
        });
    }

    let naive = parse_naive(value)?;
    let zone = resolve_zone(candidates);
    Ok(Resolved {
        at: tz::from_wall_clock(zone, naive).map_err(|e| e.to_string())?,
        all_day: false,
        zone: zone.name().to_string(),
    })
}

fn parse_naive(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M"))
        .map_err(|e| format!("invalid date-time: {e}"))
}

fn resolve_zone(candidates: &[String]) -> Tz {
    tz::resolve(candidates.iter().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wrap(body: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\n{body}END:VCALENDAR\r\n")
    }

    fn single(body: &str) -> (Event, Vec<ParseWarning>) {
        let parsed = parse_calendar(&wrap(body));
        assert_eq!(parsed.events.len(), 1, "warnings: {:?}", parsed.warnings);
        (parsed.events.into_iter().next().unwrap(), parsed.warnings)
    }

    #[test]
    fn test_parse_basic_event() {
        let (event, warnings) = single(
            "BEGIN:VEVENT\r\n\
             UID:abc-123\r\n\
             SUMMARY:Team sync\\, weekly\r\n\
             DESCRIPTION:Agenda:\\n1. Status\\; 2. Plans\r\n\
             LOCATION:Room \\\\ 4\r\n\
             DTSTART:20250301T093000Z\r\n\
             DTEND:20250301T103000Z\r\n\
             END:VEVENT\r\n",
        );

        assert!(warnings.is_empty());
        assert_eq!(event.uid, "abc-123");
        assert_eq!(event.summary, "Team sync, weekly");
        assert_eq!(event.description.as_deref(), Some("Agenda:\n1. Status; 2. Plans"));
        assert_eq!(event.location.as_deref(), Some("Room \\ 4"));
        assert_eq!(event.start, Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap());
        assert_eq!(event.end, Utc.with_ymd_and_hms(2025, 3, 1, 10, 30, 0).unwrap());
        assert_eq!(event.start_tz, "UTC");
        assert_eq!(event.end_tz, "UTC");
        assert!(!event.all_day);
    }

    #[test]
    fn test_parse_tzid_and_end_inherits_start_zone() {
        let (event, _) = single(
            "BEGIN:VEVENT\r\n\
             DTSTART;TZID=America/New_York:20250301T093000\r\n\
             DTEND:20250301T103000\r\n\
             END:VEVENT\r\n",
        );

        assert_eq!(event.start, Utc.with_ymd_and_hms(2025, 3, 1, 14, 30, 0).unwrap());
        assert_eq!(event.end, Utc.with_ymd_and_hms(2025, 3, 1, 15, 30, 0).unwrap());
        assert_eq!(event.start_tz, "America/New_York");
        assert_eq!(event.end_tz, "America/New_York");
    }

    #[test]
    fn test_parse_calendar_default_timezone_first_wins() {
        let parsed = parse_calendar(&wrap(
            "X-WR-TIMEZONE:Europe/Paris\r\n\
             X-WR-TIMEZONE:Asia/Tokyo\r\n\
             BEGIN:VEVENT\r\n\
             DTSTART:20250301T093000\r\n\
             END:VEVENT\r\n",
        ));

        assert_eq!(parsed.default_timezone.as_deref(), Some("Europe/Paris"));
        let event = &parsed.events[0];
        assert_eq!(event.start, Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap());
        assert_eq!(event.start_tz, "Europe/Paris");
    }

    #[test]
    fn test_parse_all_day_defaults_end_to_next_day() {
        let (event, _) = single(
            "BEGIN:VEVENT\r\n\
             DTSTART;VALUE=DATE;TZID=Europe/Paris:20250305\r\n\
             END:VEVENT\r\n",
        );

        assert!(event.all_day);
        assert_eq!(event.start, Utc.with_ymd_and_hms(2025, 3, 4, 23, 0, 0).unwrap());
        assert_eq!(event.end - event.start, Duration::days(1));
    }

    #[test]
    fn test_parse_timed_event_defaults_end_to_one_hour() {
        let (event, _) = single(
            "BEGIN:VEVENT\r\n\
             DTSTART:20250301T093000Z\r\n\
             END:VEVENT\r\n",
        );
        assert_eq!(event.end - event.start, Duration::hours(1));
    }

    #[test]
    fn test_parse_relative_and_absolute_alarms() {
        let (event, _) = single(
            "BEGIN:VEVENT\r\n\
             DTSTART:20250301T093000Z\r\n\
             BEGIN:VALARM\r\n\
             ACTION:DISPLAY\r\n\
             TRIGGER:-PT15M\r\n\
             END:VALARM\r\n\
             BEGIN:VALARM\r\n\
             TRIGGER;VALUE=DATE-TIME:20250301T090000Z\r\n\
             END:VALARM\r\n\
             BEGIN:VALARM\r\n\
             TRIGGER;VALUE=DATE-TIME:20250301T100000Z\r\n\
             END:VALARM\r\n\
             BEGIN:VALARM\r\n\
             TRIGGER:PT0S\r\n\
             END:VALARM\r\n\
             END:VEVENT\r\n",
        );

        assert_eq!(event.alarms.len(), 2);
        assert_eq!(event.reminder_minutes(), vec![15, 30]);
    }

    #[test]
    fn test_parse_positive_duration_counts_as_before_start() {
        let (event, _) = single(
            "BEGIN:VEVENT\r\n\
             DTSTART:20250301T093000Z\r\n\
             BEGIN:VALARM\r\n\
             TRIGGER:PT1H30M\r\n\
             END:VALARM\r\n\
             END:VEVENT\r\n",
        );
        assert_eq!(event.reminder_minutes(), vec![90]);
    }

    #[test]
    fn test_parse_trigger_too_large_for_minutes_is_a_warning() {
        let (event, warnings) = single(
            "BEGIN:VEVENT\r\n\
             DTSTART:20250301T093000Z\r\n\
             BEGIN:VALARM\r\n\
             TRIGGER:-PT9223372036854775S\r\n\
             END:VALARM\r\n\
             END:VEVENT\r\n",
        );

        assert!(event.alarms.is_empty());
        assert!(warnings.iter().any(|w| w.property == "TRIGGER"), "{:?}", warnings);
    }

    #[test]
    fn test_parse_last_successful_trigger_wins() {
        let (event, _) = single(
            "BEGIN:VEVENT\r\n\
             DTSTART:20250301T093000Z\r\n\
             BEGIN:VALARM\r\n\
             TRIGGER:-PT10M\r\n\
             TRIGGER:20250301T090000Z\r\n\
             TRIGGER:garbage\r\n\
             END:VALARM\r\n\
             END:VEVENT\r\n",
        );

        assert_eq!(
            event.alarms[0].trigger,
            Trigger::Absolute(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_malformed_fields_become_warnings() {
        let parsed = parse_calendar(&wrap(
            "BEGIN:VEVENT\r\n\
             SUMMARY:Broken end\r\n\
             DTSTART:20250301T093000Z\r\n\
             DTEND:not-a-date\r\n\
             PRIORITY:12\r\n\
             END:VEVENT\r\n\
             BEGIN:VEVENT\r\n\
             SUMMARY:No start\r\n\
             DTSTART:2025-03-01\r\n\
             END:VEVENT\r\n",
        ));

        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].summary, "Broken end");
        assert_eq!(parsed.events[0].end - parsed.events[0].start, Duration::hours(1));

        let properties: Vec<&str> = parsed.warnings.iter().map(|w| w.property.as_str()).collect();
        assert_eq!(properties, vec!["DTEND", "PRIORITY", "DTSTART", "DTSTART"]);
    }

    #[test]
    fn test_parse_ignores_properties_outside_events() {
        let parsed = parse_calendar(&wrap(
            "SUMMARY:Not an event\r\n\
             BEGIN:VTIMEZONE\r\n\
             TZID:Europe/Paris\r\n\
             BEGIN:STANDARD\r\n\
             DTSTART:19701025T030000\r\n\
             END:STANDARD\r\n\
             END:VTIMEZONE\r\n",
        ));

        assert!(parsed.events.is_empty());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_parse_exdate_preserves_tzid_parameter() {
        let (event, _) = single(
            "BEGIN:VEVENT\r\n\
             DTSTART;TZID=America/New_York:20240101T100000\r\n\
             RRULE:FREQ=WEEKLY;BYDAY=MO\r\n\
             EXDATE;TZID=America/New_York:20240108T100000,20240115T100000\r\n\
             EXDATE:20240122T150000Z\r\n\
             END:VEVENT\r\n",
        );

        assert_eq!(event.rrule.as_deref(), Some("FREQ=WEEKLY;BYDAY=MO"));
        let exdates: Vec<_> = event.exdates.iter().copied().collect();
        assert_eq!(
            exdates,
            vec![
                Utc.with_ymd_and_hms(2024, 1, 8, 15, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 22, 15, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_parse_line_folding_preserves_whitespace() {
        let (event, _) = single(
            "BEGIN:VEVENT\r\n\
             DTSTART:20240101T100000Z\r\n\
             DESCRIPTION:Hello \r\n world and \r\n more text\r\n\
             END:VEVENT\r\n",
        );

        assert_eq!(event.description.as_deref(), Some("Hello world and more text"));
    }

    #[test]
    fn test_parse_supplementary_properties() {
        let (event, _) = single(
            "BEGIN:VEVENT\r\n\
             DTSTART:20240101T100000Z\r\n\
             CATEGORIES:Work,Travel\\, abroad\r\n\
             ATTENDEE;CN=Alice:MAILTO:alice@example.com\r\n\
             PRIORITY:2\r\n\
             STATUS:confirmed\r\n\
             CREATED:20231201T080000Z\r\n\
             LAST-MODIFIED:20231202T080000Z\r\n\
             END:VEVENT\r\n",
        );

        assert!(event.categories.contains("Travel, abroad"));
        assert!(event.categories.contains("Work"));
        assert!(event.attendees.contains("alice@example.com"));
        assert_eq!(event.priority, 2);
        assert_eq!(event.status.as_deref(), Some("CONFIRMED"));
        assert_eq!(event.created, Some(Utc.with_ymd_and_hms(2023, 12, 1, 8, 0, 0).unwrap()));
        assert_eq!(
            event.last_modified,
            Some(Utc.with_ymd_and_hms(2023, 12, 2, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_unterminated_event_is_reported() {
        let parsed = parse_calendar("BEGIN:VEVENT\nDTSTART:20240101T100000Z\n");
        assert!(parsed.events.is_empty());
        assert_eq!(parsed.warnings.len(), 1);
    }
}
