//! Core types for icsync.
//!
//! This crate provides:
//! - `Calendar`, `Event` and `Alarm`, the in-memory calendar model
//! - `ics`, the RFC 5545 encoder and decoder for that model
//! - `tz`, the timezone resolution both sides agree on

pub mod error;
pub mod event;
pub mod ics;
pub mod tz;

pub use error::{IcsError, IcsResult};
pub use event::{Alarm, Calendar, Event, Trigger, minutes_between};
