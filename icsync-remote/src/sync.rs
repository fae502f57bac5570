//! Pushes decoded ICS events to the remote calendar API.

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use icsync_core::ics::{ParseWarning, parse_calendar};
use icsync_core::{Event, tz};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::AuthClient;
use crate::error::{RemoteError, RemoteResult};
use crate::token::Token;

/// Outcome of a successful import.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Remote IDs, in insertion order.
    pub inserted_ids: Vec<String>,
    /// Fields the decoder had to skip.
    pub warnings: Vec<ParseWarning>,
}

/// Event body accepted by `POST /calendars/{id}/events`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Reminders>,
}

/// Either `date` (all-day) or `dateTime` is set, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

#[derive(Deserialize)]
struct InsertResponse {
    #[serde(default)]
    id: String,
}

impl EventPayload {
    /// `default_timezone` places events whose own zone is empty.
    pub fn from_event(event: &Event, default_timezone: &str) -> Self {
        EventPayload {
            summary: event.summary.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            start: event_time(
                event.start,
                event.all_day,
                event.start_zone(default_timezone),
                &event.start_tz,
            ),
            end: event_time(
                event.end,
                event.all_day,
                event.end_zone(default_timezone),
                event.end_timezone(),
            ),
            recurrence: recurrence(event, default_timezone),
            reminders: reminders(&event.reminder_minutes()),
        }
    }
}

fn event_time(at: DateTime<Utc>, all_day: bool, zone: Tz, label: &str) -> EventTime {
    let time_zone = (!label.is_empty()).then(|| label.to_string());
    let local = at.with_timezone(&zone);

    if all_day {
        EventTime {
            date: Some(local.format("%Y-%m-%d").to_string()),
            date_time: None,
            time_zone,
        }
    } else {
        EventTime {
            date: None,
            date_time: Some(local.to_rfc3339_opts(SecondsFormat::Secs, true)),
            time_zone,
        }
    }
}

fn recurrence(event: &Event, default_timezone: &str) -> Vec<String> {
    let Some(rule) = event.rrule.as_deref() else {
        return Vec::new();
    };

    let rule = rule.strip_prefix("RRULE:").unwrap_or(rule);
    let mut lines = vec![format!("RRULE:{}", rule)];

    let zone = event.start_zone(default_timezone);
    for exdate in &event.exdates {
        let local = exdate.with_timezone(&zone);
        let line = if event.all_day {
            format!("EXDATE;VALUE=DATE:{}", local.format("%Y%m%d"))
        } else if tz::is_utc_label(&event.start_tz) {
            format!("EXDATE:{}", exdate.format("%Y%m%dT%H%M%SZ"))
        } else {
            format!("EXDATE;TZID={}:{}", zone.name(), local.format("%Y%m%dT%H%M%S"))
        };
        lines.push(line);
    }

    lines
}

/// Popup overrides for the strictly positive entries; `None` if there are none.
fn reminders(minutes: &[i64]) -> Option<Reminders> {
    let overrides: Vec<ReminderOverride> = minutes
        .iter()
        .filter(|m| **m > 0)
        .map(|m| ReminderOverride {
            method: "popup".to_string(),
            minutes: *m,
        })
        .collect();

    if overrides.is_empty() {
        return None;
    }

    Some(Reminders {
        use_default: false,
        overrides,
    })
}

/// Imports ICS text into a remote calendar, one event at a time.
pub struct SyncClient {
    auth: AuthClient,
}

impl SyncClient {
    pub fn new(auth: AuthClient) -> Self {
        SyncClient { auth }
    }

    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// Decodes `ics_text` and inserts every event into `calendar_id`.
    ///
    /// Stops at the first failed insertion. Events inserted before it stay
    /// in the remote calendar.
    pub async fn import_ics(
        &self,
        cancel: &CancellationToken,
        calendar_id: &str,
        ics_text: &str,
    ) -> RemoteResult<ImportReport> {
        if calendar_id.trim().is_empty() {
            return Err(RemoteError::Validation("Calendar ID is required".into()));
        }
        if ics_text.trim().is_empty() {
            return Err(RemoteError::Validation("ICS payload is empty".into()));
        }

        let token = self.auth.ensure_token(cancel).await?;

        let parsed = parse_calendar(ics_text);
        for warning in &parsed.warnings {
            warn!(%warning, "Skipped malformed ICS field");
        }
        if parsed.events.is_empty() {
            return Err(RemoteError::Validation("No events found in ICS payload".into()));
        }

        let default_timezone = parsed.default_timezone.clone().unwrap_or_default();
        let url = events_url(self.auth.config().api_base(), calendar_id)?;
        let mut report = ImportReport {
            inserted_ids: Vec::with_capacity(parsed.events.len()),
            warnings: parsed.warnings,
        };

        for event in &parsed.events {
            let payload = EventPayload::from_event(event, &default_timezone);

            match self.insert(&url, &token, &payload, cancel).await {
                Ok(id) => {
                    info!(summary = %event.summary, id = %id, "Inserted event");
                    report.inserted_ids.push(id);
                }
                Err(e) => {
                    return Err(RemoteError::Insert {
                        inserted: report.inserted_ids.len(),
                        summary: event.summary.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(report)
    }

    async fn insert(
        &self,
        url: &Url,
        token: &Token,
        payload: &EventPayload,
        cancel: &CancellationToken,
    ) -> RemoteResult<String> {
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }

        debug!(summary = %payload.summary, "Inserting event");

        let request = async {
            let response = self
                .auth
                .http()
                .post(url.clone())
                .header(reqwest::header::AUTHORIZATION, token.authorization_header())
                .json(payload)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, RemoteError>((status, body))
        };

        let (status, body) = tokio::select! {
            _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
            result = request => result?,
        };

        if !status.is_success() {
            return Err(RemoteError::Http { status, body });
        }

        let response: InsertResponse = serde_json::from_str(&body)?;
        Ok(response.id)
    }
}

/// `{api_base}/calendars/{calendar_id}/events`, with the ID percent-encoded.
fn events_url(api_base: &str, calendar_id: &str) -> RemoteResult<Url> {
    let mut url = Url::parse(api_base)?;
    url.path_segments_mut()
        .map_err(|_| RemoteError::Validation(format!("Invalid API base URL: {}", api_base)))?
        .pop_if_empty()
        .extend(["calendars", calendar_id, "events"]);
    Ok(url)
}
