use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Appointment status tags carried in the event's private extended
/// properties. The reminder flow reads them back by patient phone.
pub const STATUS_BOOKED: &str = "agendada";
pub const STATUS_CONFIRMED: &str = "confirmada";

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Calendar API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed event payload: {0}")]
    MalformedEvent(String),
}

/// Structured booking metadata attached to the calendar event. Replaces the
/// older habit of packing phone and status into the free-text summary; the
/// summary keeps a human-readable "{treatment} - {phone}" label only.
#[derive(Debug, Clone)]
pub struct EventMetadata {
    pub patient_phone: String,
    pub treatment: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub patient_phone: Option<String>,
    pub treatment: Option<String>,
    pub status: Option<String>,
}

impl CalendarEvent {
    pub fn is_confirmed(&self) -> bool {
        self.status.as_deref() == Some(STATUS_CONFIRMED)
    }
}

// ==============================================================================
// GOOGLE CALENDAR WIRE FORMAT
// ==============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct WireEventList {
    #[serde(default)]
    pub items: Vec<WireEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireEvent {
    pub id: String,
    pub summary: Option<String>,
    pub start: WireEventTime,
    pub end: WireEventTime,
    pub extended_properties: Option<WireExtendedProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireEventTime {
    pub date_time: Option<String>,
    /// All-day events carry a plain date instead of a timestamp.
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireExtendedProperties {
    #[serde(default)]
    pub private: std::collections::HashMap<String, String>,
}

impl WireEventTime {
    fn resolve(&self) -> Result<DateTime<Utc>, CalendarError> {
        if let Some(ts) = &self.date_time {
            return DateTime::parse_from_rfc3339(ts)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| CalendarError::MalformedEvent(format!("bad dateTime {}: {}", ts, e)));
        }
        if let Some(date) = &self.date {
            let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| CalendarError::MalformedEvent(format!("bad date {}: {}", date, e)))?;
            let midnight = day
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| CalendarError::MalformedEvent(format!("bad date {}", date)))?;
            return Ok(midnight.and_utc());
        }
        Err(CalendarError::MalformedEvent(
            "event time has neither dateTime nor date".to_string(),
        ))
    }
}

impl TryFrom<WireEvent> for CalendarEvent {
    type Error = CalendarError;

    fn try_from(wire: WireEvent) -> Result<Self, CalendarError> {
        let start = wire.start.resolve()?;
        let end = wire.end.resolve()?;
        let private = wire
            .extended_properties
            .map(|p| p.private)
            .unwrap_or_default();

        Ok(CalendarEvent {
            id: wire.id,
            summary: wire.summary.unwrap_or_default(),
            start,
            end,
            patient_phone: private.get("patientPhone").cloned(),
            treatment: private.get("treatment").cloned(),
            status: private.get("status").cloned(),
        })
    }
}
