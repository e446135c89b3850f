use std::sync::Arc;

use chrono::{TimeZone, Utc};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use calendar_cell::{CalendarStore, EventMetadata, GoogleCalendarClient, STATUS_BOOKED};
use shared_config::AppConfig;
use shared_google_auth::GoogleAuth;

async fn setup() -> (MockServer, GoogleCalendarClient) {
    let server = MockServer::start().await;
    let mut config = AppConfig::test_defaults();
    config.calendar_base_url = server.uri();
    let auth = Arc::new(GoogleAuth::new(&config));
    let client = GoogleCalendarClient::new(&config, auth);
    (server, client)
}

#[tokio::test]
async fn list_events_parses_wire_events() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param("singleEvents", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [{
                "id": "ev1",
                "summary": "Limpieza - 5215512345678",
                "start": { "dateTime": "2025-07-15T16:00:00-06:00" },
                "end": { "dateTime": "2025-07-15T17:00:00-06:00" },
                "extendedProperties": {
                    "private": { "patientPhone": "5215512345678", "status": "agendada" }
                }
            }]
        })))
        .mount(&server)
        .await;

    let from = Utc.with_ymd_and_hms(2025, 7, 15, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2025, 7, 16, 0, 0, 0).unwrap();
    let events = client.list_events(from, to).await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "ev1");
    assert_eq!(events[0].patient_phone.as_deref(), Some("5215512345678"));
}

#[tokio::test]
async fn patient_lookup_filters_by_private_property() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(query_param(
            "privateExtendedProperty",
            "patientPhone=5215512345678",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let from = Utc.with_ymd_and_hms(2025, 7, 15, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2025, 7, 16, 0, 0, 0).unwrap();
    let events = client
        .list_events_for_patient("5215512345678", from, to)
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn create_event_returns_new_id_with_metadata() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(body_partial_json(serde_json::json!({
            "summary": "Limpieza - 5215512345678",
            "reminders": { "useDefault": false },
            "extendedProperties": {
                "private": {
                    "patientPhone": "5215512345678",
                    "treatment": "Limpieza",
                    "status": "agendada"
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "new-event",
            "start": { "dateTime": "2025-07-15T16:00:00Z" },
            "end": { "dateTime": "2025-07-15T17:00:00Z" }
        })))
        .mount(&server)
        .await;

    let start = Utc.with_ymd_and_hms(2025, 7, 15, 16, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 7, 15, 17, 0, 0).unwrap();
    let metadata = EventMetadata {
        patient_phone: "5215512345678".to_string(),
        treatment: "Limpieza".to_string(),
        status: STATUS_BOOKED.to_string(),
    };

    let id = client
        .create_event("Limpieza - 5215512345678", start, end, &metadata)
        .await
        .unwrap();
    assert_eq!(id, "new-event");
}

#[tokio::test]
async fn delete_event_tolerates_empty_204() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/calendars/primary/events/ev1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_event("ev1").await.unwrap();
}

#[tokio::test]
async fn patch_event_status_sends_private_property() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/calendars/primary/events/ev1"))
        .and(body_partial_json(serde_json::json!({
            "extendedProperties": { "private": { "status": "confirmada" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "ev1",
            "start": { "dateTime": "2025-07-15T16:00:00Z" },
            "end": { "dateTime": "2025-07-15T17:00:00Z" }
        })))
        .mount(&server)
        .await;

    client.patch_event_status("ev1", "confirmada").await.unwrap();
}

#[tokio::test]
async fn api_failure_maps_to_calendar_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
        .mount(&server)
        .await;

    let from = Utc.with_ymd_and_hms(2025, 7, 15, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2025, 7, 16, 0, 0, 0).unwrap();
    let err = client.list_events(from, to).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}
