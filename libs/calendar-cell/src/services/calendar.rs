use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_google_auth::GoogleAuth;

use crate::models::{CalendarError, CalendarEvent, EventMetadata, WireEvent, WireEventList};

/// External calendar boundary consumed by the scheduling cell.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// All events intersecting `[from, to)`, ordered by start time.
    async fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Events in the window tagged with the given patient phone.
    async fn list_events_for_patient(
        &self,
        phone: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Creates a booking and returns the new event id.
    async fn create_event(
        &self,
        summary: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        metadata: &EventMetadata,
    ) -> Result<String, CalendarError>;

    async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError>;

    /// Rewrites the status tag in the event's private metadata.
    async fn patch_event_status(&self, event_id: &str, status: &str) -> Result<(), CalendarError>;
}

pub struct GoogleCalendarClient {
    client: reqwest::Client,
    auth: Arc<GoogleAuth>,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(config: &AppConfig, auth: Arc<GoogleAuth>) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth,
            base_url: config.calendar_base_url.clone(),
            calendar_id: config.calendar_id.clone(),
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, CalendarError> {
        let token = self
            .auth
            .bearer_token()
            .await
            .map_err(|e| CalendarError::Auth(e.to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        debug!("Calendar request {} {}", method, url);

        let mut req = self.client.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Calendar API error ({}): {}", status, body);
            return Err(CalendarError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // DELETE answers 204 with an empty body
        if status.as_u16() == 204 {
            return Ok(None);
        }
        Ok(Some(response.json::<Value>().await?))
    }

    async fn list_with_query(&self, query: String) -> Result<Vec<CalendarEvent>, CalendarError> {
        let path = format!("/calendars/{}/events?{}", self.calendar_id, query);
        let raw = self
            .request(Method::GET, &path, None)
            .await?
            .unwrap_or_else(|| json!({}));

        let list: WireEventList = serde_json::from_value(raw)
            .map_err(|e| CalendarError::MalformedEvent(e.to_string()))?;

        list.items
            .into_iter()
            .map(CalendarEvent::try_from)
            .collect()
    }
}

#[async_trait]
impl CalendarStore for GoogleCalendarClient {
    async fn list_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let query = format!(
            "timeMin={}&timeMax={}&singleEvents=true&orderBy=startTime",
            urlencoding::encode(&from.to_rfc3339()),
            urlencoding::encode(&to.to_rfc3339()),
        );
        self.list_with_query(query).await
    }

    async fn list_events_for_patient(
        &self,
        phone: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let property = format!("patientPhone={}", phone);
        let query = format!(
            "timeMin={}&timeMax={}&singleEvents=true&orderBy=startTime&privateExtendedProperty={}",
            urlencoding::encode(&from.to_rfc3339()),
            urlencoding::encode(&to.to_rfc3339()),
            urlencoding::encode(&property),
        );
        self.list_with_query(query).await
    }

    async fn create_event(
        &self,
        summary: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        metadata: &EventMetadata,
    ) -> Result<String, CalendarError> {
        let path = format!("/calendars/{}/events", self.calendar_id);
        let body = json!({
            "summary": summary,
            "start": { "dateTime": start.to_rfc3339() },
            "end": { "dateTime": end.to_rfc3339() },
            // the bot sends its own reminder, not Google
            "reminders": { "useDefault": false },
            "extendedProperties": {
                "private": {
                    "patientPhone": metadata.patient_phone,
                    "treatment": metadata.treatment,
                    "status": metadata.status,
                }
            }
        });

        let raw = self
            .request(Method::POST, &path, Some(body))
            .await?
            .unwrap_or_else(|| json!({}));

        let created: WireEvent = serde_json::from_value(raw)
            .map_err(|e| CalendarError::MalformedEvent(e.to_string()))?;
        Ok(created.id)
    }

    async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError> {
        let path = format!(
            "/calendars/{}/events/{}",
            self.calendar_id,
            urlencoding::encode(event_id)
        );
        self.request(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn patch_event_status(&self, event_id: &str, status: &str) -> Result<(), CalendarError> {
        let path = format!(
            "/calendars/{}/events/{}",
            self.calendar_id,
            urlencoding::encode(event_id)
        );
        let body = json!({
            "extendedProperties": { "private": { "status": status } }
        });
        self.request(Method::PATCH, &path, Some(body)).await?;
        Ok(())
    }
}
