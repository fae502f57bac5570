use std::path::Path;

use anyhow::Result;
use icsync_core::Event;
use icsync_core::ics::parse_calendar;
use owo_colors::OwoColorize;

use super::read_ics;

pub fn run(file: &Path) -> Result<()> {
    let parsed = parse_calendar(&read_ics(file)?);

    if let Some(name) = &parsed.name {
        println!("{}", name.bold());
    }
    if let Some(zone) = &parsed.default_timezone {
        println!("Default timezone: {}", zone);
    }

    if parsed.events.is_empty() {
        println!("{}", "No events found.".dimmed());
    }

    for event in &parsed.events {
        println!("{}", render_event(event));
    }

    if !parsed.warnings.is_empty() {
        eprintln!();
        eprintln!("{}", format!("{} warning(s):", parsed.warnings.len()).yellow());
        for warning in &parsed.warnings {
            eprintln!("  {}", warning.to_string().yellow());
        }
    }

    Ok(())
}

fn render_event(event: &Event) -> String {
    let when = if event.all_day {
        let zone = event.start_zone("");
        format!(
            "{} (all day)",
            event.start.with_timezone(&zone).format("%Y-%m-%d")
        )
    } else {
        let zone = event.start_zone("");
        format!(
            "{} - {} {}",
            event.start.with_timezone(&zone).format("%Y-%m-%d %H:%M"),
            event.end.with_timezone(&event.end_zone("")).format("%H:%M"),
            zone.name()
        )
    };

    let mut lines = vec![format!("  {}  {}", event.summary.green(), when)];
    if let Some(location) = &event.location {
        lines.push(format!("    at {}", location));
    }
    if let Some(rrule) = &event.rrule {
        lines.push(format!("    repeats {}", rrule));
    }
    let reminders = event.reminder_minutes();
    if !reminders.is_empty() {
        let minutes: Vec<String> = reminders.iter().map(|m| format!("{}m", m)).collect();
        lines.push(format!("    reminders {}", minutes.join(", ")));
    }

    lines.join("\n")
}
