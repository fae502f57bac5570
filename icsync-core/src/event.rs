//! Calendar, event and alarm types.
//!
//! These are what the encoder consumes and the decoder produces. The remote
//! dispatcher maps them onto the calendar API's JSON schema.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{IcsError, IcsResult};
use crate::tz;

/// A calendar: a named, ordered list of events.
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    /// Emitted as `X-WR-CALNAME`
    pub name: String,
    /// Insertion order is VEVENT emission order
    pub events: Vec<Event>,
    /// Whether a VTIMEZONE block is emitted for each referenced zone
    pub include_vtimezone: bool,
    /// IANA zone used for events without an explicit zone (`X-WR-TIMEZONE`)
    pub default_timezone: String,
}

impl Calendar {
    pub fn new(name: impl Into<String>) -> Self {
        Calendar {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// A calendar event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Generated at encode time when empty
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,

    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA zone name; empty means UTC (or the calendar default for all-day events)
    pub start_tz: String,
    /// Falls back to `start_tz` when empty
    pub end_tz: String,
    pub all_day: bool,

    /// Raw RRULE value, kept opaque
    pub rrule: Option<String>,
    /// Instances excluded from the recurrence
    pub exdates: BTreeSet<DateTime<Utc>>,

    pub alarms: Vec<Alarm>,

    pub categories: BTreeSet<String>,
    pub attendees: BTreeSet<String>,
    /// 0 means unset, otherwise 1 (highest) to 9 (lowest)
    pub priority: u8,
    pub status: Option<String>,

    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl Event {
    fn blank(summary: String, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Event {
            uid: String::new(),
            summary,
            description: None,
            location: None,
            start,
            end,
            start_tz: String::new(),
            end_tz: String::new(),
            all_day: false,
            rrule: None,
            exdates: BTreeSet::new(),
            alarms: Vec::new(),
            categories: BTreeSet::new(),
            attendees: BTreeSet::new(),
            priority: 0,
            status: None,
            created: None,
            last_modified: None,
        }
    }

    /// A timed event. `end` must be strictly after `start`.
    pub fn timed(
        summary: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> IcsResult<Self> {
        let event = Self::blank(summary.into(), start, end);
        event.validate()?;
        Ok(event)
    }

    /// An all-day event spanning `start` up to (exclusive) `end`, with dates
    /// interpreted in `timezone` (or the system zone when it's empty).
    /// Without an `end` the event lasts one day. The zone the dates were
    /// read in is recorded as the start zone so they encode to the same days.
    pub fn all_day(
        summary: impl Into<String>,
        timezone: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> IcsResult<Self> {
        let summary = summary.into();
        if !timezone.trim().is_empty() && tz::lookup(timezone).is_none() {
            return Err(IcsError::UnknownTimezone(timezone.to_string()));
        }
        let zone = tz::resolve([timezone]);
        let end = end.unwrap_or(start + Duration::days(1));

        let mut event = Self::blank(
            summary,
            tz::start_of_day(zone, start)?,
            tz::start_of_day(zone, end)?,
        );
        event.all_day = true;
        event.start_tz = zone.name().to_string();
        event.validate()?;
        Ok(event)
    }

    /// Set the start (and end) zone label. Does not move the instants.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.start_tz = timezone.into();
        self
    }

    pub fn with_rrule(mut self, rrule: impl Into<String>) -> Self {
        self.rrule = Some(rrule.into());
        self
    }

    pub fn with_alarm(mut self, alarm: Alarm) -> Self {
        self.alarms.push(alarm);
        self
    }

    /// Check the construction invariants.
    pub fn validate(&self) -> IcsResult<()> {
        if self.all_day {
            if self.end < self.start {
                return Err(IcsError::invalid_event(
                    &self.summary,
                    "all-day event ends before it starts",
                ));
            }
        } else if self.end <= self.start {
            return Err(IcsError::invalid_event(
                &self.summary,
                "end time must be after start time",
            ));
        }

        if self.priority > 9 {
            return Err(IcsError::invalid_event(
                &self.summary,
                format!("priority {} is outside 1-9", self.priority),
            ));
        }

        Ok(())
    }

    /// The effective end zone label.
    pub fn end_timezone(&self) -> &str {
        if self.end_tz.is_empty() {
            &self.start_tz
        } else {
            &self.end_tz
        }
    }

    /// Zone the start is expressed in, given the calendar's default.
    pub fn start_zone(&self, fallback: &str) -> Tz {
        tz::resolve([self.start_tz.as_str(), fallback])
    }

    /// Zone the end is expressed in, given the calendar's default.
    pub fn end_zone(&self, fallback: &str) -> Tz {
        tz::resolve([self.end_timezone(), fallback])
    }

    /// Positive minutes-before-start for every alarm that resolves to one.
    pub fn reminder_minutes(&self) -> Vec<i64> {
        self.alarms
            .iter()
            .map(|alarm| alarm.minutes_before(self.start))
            .filter(|minutes| *minutes > 0)
            .collect()
    }
}

/// A reminder attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Alarm {
    /// e.g. DISPLAY, AUDIO, EMAIL
    pub action: String,
    pub description: String,
    pub trigger: Trigger,
}

/// When an alarm fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Offset from the event start; negative fires before it
    Relative(Duration),
    /// A fixed instant
    Absolute(DateTime<Utc>),
}

impl Alarm {
    pub fn display(description: impl Into<String>, trigger: Trigger) -> Self {
        Alarm {
            action: "DISPLAY".to_string(),
            description: description.into(),
            trigger,
        }
    }

    /// A display alarm firing `minutes` before the event start.
    pub fn before_start(minutes: i64) -> Self {
        Self::display("Reminder", Trigger::Relative(-Duration::minutes(minutes)))
    }

    /// Whole minutes between the trigger and `start`, positive when the
    /// alarm fires before the event. Relative offsets round to the nearest
    /// minute the same way a decoded TRIGGER does.
    pub fn minutes_before(&self, start: DateTime<Utc>) -> i64 {
        match self.trigger {
            Trigger::Relative(offset) => round_to_minutes(-offset.num_seconds()),
            Trigger::Absolute(at) => minutes_between(start, at),
        }
    }
}

/// Nearest whole minute, with half a minute rounding away from zero.
pub(crate) fn round_to_minutes(seconds: i64) -> i64 {
    let minutes = seconds / 60;
    match seconds % 60 {
        rest if rest >= 30 => minutes + 1,
        rest if rest <= -30 => minutes - 1,
        _ => minutes,
    }
}

/// Whole minutes from `trigger` up to `start`; 0 when the trigger is at or
/// after the start.
pub fn minutes_between(start: DateTime<Utc>, trigger: DateTime<Utc>) -> i64 {
    if trigger >= start {
        return 0;
    }
    (start - trigger).num_minutes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn timed_event_rejects_non_positive_duration() {
        assert!(Event::timed("Same", at(9, 0), at(9, 0)).is_err());
        assert!(Event::timed("Backwards", at(10, 0), at(9, 0)).is_err());
        assert!(Event::timed("Fine", at(9, 0), at(9, 1)).is_ok());
    }

    #[test]
    fn all_day_event_defaults_to_one_day() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let event = Event::all_day("Holiday", "Europe/Paris", start, None).unwrap();

        assert!(event.all_day);
        assert_eq!(event.end - event.start, Duration::days(1));
        assert_eq!(
            event.start,
            Utc.with_ymd_and_hms(2025, 3, 4, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn all_day_event_rejects_end_before_start() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        assert!(Event::all_day("Oops", "UTC", start, Some(end)).is_err());
    }

    #[test]
    fn all_day_event_rejects_unknown_zone() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert!(matches!(
            Event::all_day("Oops", "Nowhere/Special", start, None),
            Err(IcsError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn end_timezone_falls_back_to_start() {
        let event = Event::timed("Call", at(9, 0), at(10, 0))
            .unwrap()
            .with_timezone("Europe/Berlin");
        assert_eq!(event.end_timezone(), "Europe/Berlin");
    }

    #[test]
    fn minutes_between_counts_whole_minutes_before_start() {
        assert_eq!(minutes_between(at(9, 30), at(9, 0)), 30);
        assert_eq!(minutes_between(at(9, 30), at(9, 45)), 0);
        assert_eq!(minutes_between(at(9, 30), at(9, 30)), 0);

        let trigger = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 30).unwrap();
        assert_eq!(minutes_between(at(9, 30), trigger), 29);
    }

    #[test]
    fn all_day_event_without_zone_records_the_system_zone() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let event = Event::all_day("Holiday", "", start, None).unwrap();
        assert_eq!(event.start_tz, tz::system_local().name());
    }

    #[test]
    fn relative_triggers_round_to_the_nearest_minute() {
        let start = at(9, 30);
        let alarm = |secs| Alarm::display("Soon", Trigger::Relative(Duration::seconds(secs)));

        assert_eq!(alarm(-630).minutes_before(start), 11);
        assert_eq!(alarm(-629).minutes_before(start), 10);
        assert_eq!(alarm(-600).minutes_before(start), 10);
        assert_eq!(alarm(90).minutes_before(start), -2);
    }

    #[test]
    fn reminder_minutes_skips_alarms_at_or_after_start() {
        let event = Event::timed("Standup", at(9, 30), at(10, 0))
            .unwrap()
            .with_alarm(Alarm::before_start(15))
            .with_alarm(Alarm::before_start(-5))
            .with_alarm(Alarm::before_start(0))
            .with_alarm(Alarm::display("Heads up", Trigger::Absolute(at(9, 0))));

        assert_eq!(event.reminder_minutes(), vec![15, 30]);
    }
}
