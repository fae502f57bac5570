//! ICS file generation and parsing.
//!
//! This module handles reading and writing .ics files according to RFC 5545.

mod duration;
mod generate;
mod line;
mod parse;
mod vtimezone;

pub use duration::{format_duration, parse_duration, parse_duration_minutes};
pub use generate::{generate_event_ics, generate_ics};
pub use line::{
    MAX_LINE_OCTETS, Property, escape_text, fold, fold_line, parse_property, unescape_text, unfold,
};
pub use parse::{ParseWarning, ParsedCalendar, parse_calendar, parse_events};
