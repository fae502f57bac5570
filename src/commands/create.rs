use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::Args;
use icsync_core::ics::{generate_ics, parse_duration};
use icsync_core::{Alarm, Calendar, Event, tz};
use owo_colors::OwoColorize;

#[derive(Args)]
pub struct CreateArgs {
    title: String,

    /// Start date/time (e.g. "2025-03-20T15:00", or "2025-03-20" for all-day)
    #[arg(short, long)]
    start: String,

    /// End date/time, same format as --start
    #[arg(short, long, conflicts_with = "duration")]
    end: Option<String>,

    /// ISO 8601 duration (e.g. "PT30M", "P2D")
    #[arg(short, long)]
    duration: Option<String>,

    /// IANA timezone the times are given in (defaults to the system zone)
    #[arg(short = 'z', long)]
    timezone: Option<String>,

    #[arg(short, long)]
    location: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// Raw RRULE value, e.g. "FREQ=WEEKLY;COUNT=4"
    #[arg(long)]
    rrule: Option<String>,

    /// Minutes before the start to show a reminder (repeatable)
    #[arg(short, long = "reminder")]
    reminders: Vec<i64>,

    /// Embed VTIMEZONE definitions for the zones used
    #[arg(long)]
    vtimezone: bool,

    /// Output file (defaults to the title, slugged, with .ics)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

enum When {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

pub fn run(args: CreateArgs) -> Result<()> {
    let zone_label = args.timezone.clone().unwrap_or_default();
    if !zone_label.is_empty() && tz::lookup(&zone_label).is_none() {
        anyhow::bail!("Unknown timezone: \"{}\"", zone_label);
    }

    let event = build_event(&args, &zone_label)?;

    let mut calendar = Calendar::new(args.title.clone());
    calendar.default_timezone = zone_label;
    calendar.include_vtimezone = args.vtimezone;
    calendar.push(event);

    let ics = generate_ics(&calendar).context("Failed to generate ICS")?;
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.ics", file_stem(&args.title))));

    std::fs::write(&path, ics).with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{}",
        format!("  Created: {} ({})", args.title, path.display()).green()
    );

    Ok(())
}

fn build_event(args: &CreateArgs, zone_label: &str) -> Result<Event> {
    let zone = tz::resolve([zone_label]);

    let mut event = match parse_when(&args.start)? {
        When::Date(start) => {
            let end = match (&args.end, &args.duration) {
                (Some(end), _) => match parse_when(end)? {
                    When::Date(date) => Some(date),
                    When::DateTime(_) => anyhow::bail!("An all-day event needs a date-only --end"),
                },
                (None, Some(duration)) => {
                    let days = chrono::Days::new(parse_duration(duration)?.num_days().max(1) as u64);
                    Some(start.checked_add_days(days).ok_or_else(too_long)?)
                }
                (None, None) => None,
            };
            Event::all_day(args.title.clone(), zone_label, start, end)?
        }
        When::DateTime(naive) => {
            let start = tz::from_wall_clock(zone, naive)?;
            let end = match (&args.end, &args.duration) {
                (Some(end), _) => match parse_when(end)? {
                    When::DateTime(naive) => tz::from_wall_clock(zone, naive)?,
                    When::Date(_) => anyhow::bail!("A timed event needs a date-time --end"),
                },
                (None, Some(duration)) => start
                    .checked_add_signed(parse_duration(duration)?)
                    .ok_or_else(too_long)?,
                (None, None) => start + chrono::Duration::hours(1),
            };
            Event::timed(args.title.clone(), start, end)?.with_timezone(zone_label)
        }
    };

    event.location = args.location.clone();
    event.description = args.description.clone();
    event.rrule = args.rrule.clone();
    for minutes in &args.reminders {
        event = event.with_alarm(Alarm::before_start(*minutes));
    }

    Ok(event)
}

fn too_long() -> anyhow::Error {
    anyhow::anyhow!("--duration reaches past the last representable date")
}

fn parse_when(input: &str) -> Result<When> {
    let input = input.trim();

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(When::DateTime(dt));
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(When::Date)
        .map_err(|_| anyhow::anyhow!("Could not parse date/time: \"{}\"", input))
}

fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();

    let stem = stem
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if stem.is_empty() { "event".to_string() } else { stem }
}
