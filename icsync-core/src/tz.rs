//! Timezone lookup helpers shared by the encoder and decoder.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{IcsError, IcsResult};

/// Look up an IANA zone name. Empty names and unknown zones yield `None`.
pub fn lookup(name: &str) -> Option<Tz> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    name.parse::<Tz>().ok()
}

/// The system's local zone, falling back to UTC when it can't be determined
/// or isn't a known IANA name.
pub fn system_local() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| lookup(&name))
        .unwrap_or(Tz::UTC)
}

/// Pick the first candidate that names a known zone, else the system zone.
pub fn resolve<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Tz {
    candidates
        .into_iter()
        .find_map(lookup)
        .unwrap_or_else(system_local)
}

/// Whether a zone label means "plain UTC" for output purposes.
pub fn is_utc_label(name: &str) -> bool {
    matches!(name.trim(), "" | "UTC" | "Etc/UTC" | "Z")
}

/// Interpret a wall-clock time in `tz`. Ambiguous times (DST fall-back)
/// take the earlier instant; times inside a DST gap are an error.
pub fn from_wall_clock(tz: Tz, naive: NaiveDateTime) -> IcsResult<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(IcsError::InvalidDateTime(format!(
            "{} does not exist in {}",
            naive, tz
        ))),
    }
}

/// Midnight of `date` in `tz`.
pub fn start_of_day(tz: Tz, date: NaiveDate) -> IcsResult<DateTime<Utc>> {
    from_wall_clock(tz, date.and_time(chrono::NaiveTime::MIN))
}
