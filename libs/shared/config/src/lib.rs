use std::collections::HashSet;
use std::env;
use std::fs;

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use tracing::warn;

/// Process-wide configuration, read once at startup from the environment.
/// Base URLs are overridable so tests can point the clients at a mock server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Clinic schedule
    pub clinic_timezone: Tz,
    pub working_weekdays: Vec<Weekday>,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub slot_minutes: i64,
    pub holidays: HashSet<String>,

    // WhatsApp Cloud API
    pub verify_token: String,
    pub wa_access_token: String,
    pub wa_phone_number_id: String,
    pub wa_base_url: String,

    // Google service account (calendar + sheets)
    pub google_sa_email: String,
    pub google_private_key: String,
    pub google_token_url: String,
    /// Bypasses the service-account flow entirely when set. Used by tests
    /// and local runs against a mock server.
    pub google_static_token: Option<String>,
    pub calendar_id: String,
    pub calendar_base_url: String,
    pub sheet_id: String,
    pub sheets_base_url: String,

    // Conversation state store
    pub redis_url: Option<String>,
    pub conversation_ttl_seconds: u64,

    // Static catalog / templates
    pub treatments_path: String,
    pub templates_path: String,

    // Reminder sweep
    pub reminder_lead_hours: i64,
    pub reply_window_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let clinic_timezone = env::var("CLINIC_TIMEZONE")
            .unwrap_or_else(|_| {
                warn!("CLINIC_TIMEZONE not set, using America/Mexico_City");
                "America/Mexico_City".to_string()
            })
            .parse::<Tz>()
            .unwrap_or_else(|_| {
                warn!("CLINIC_TIMEZONE is not a valid IANA zone, using America/Mexico_City");
                chrono_tz::America::Mexico_City
            });

        let working_weekdays = parse_weekdays(
            &env::var("WORKING_WEEKDAYS").unwrap_or_else(|_| "0,1,2,3,4".to_string()),
        );

        let opening_time = parse_time(&env::var("OPENING_TIME").unwrap_or_default(), 9);
        let closing_time = parse_time(&env::var("CLOSING_TIME").unwrap_or_default(), 19);

        let slot_minutes = env::var("SLOT_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let holidays_path =
            env::var("HOLIDAYS_PATH").unwrap_or_else(|_| "config/festivos.json".to_string());

        let config = Self {
            clinic_timezone,
            working_weekdays,
            opening_time,
            closing_time,
            slot_minutes,
            holidays: load_holidays(&holidays_path),
            verify_token: env::var("WEBHOOK_VERIFY_TOKEN").unwrap_or_else(|_| {
                warn!("WEBHOOK_VERIFY_TOKEN not set, using empty value");
                String::new()
            }),
            wa_access_token: env::var("WA_ACCESS_TOKEN").unwrap_or_else(|_| {
                warn!("WA_ACCESS_TOKEN not set, using empty value");
                String::new()
            }),
            wa_phone_number_id: env::var("WA_PHONE_NUMBER_ID").unwrap_or_else(|_| {
                warn!("WA_PHONE_NUMBER_ID not set, using empty value");
                String::new()
            }),
            wa_base_url: env::var("WA_BASE_URL")
                .unwrap_or_else(|_| "https://graph.facebook.com/v18.0".to_string()),
            google_sa_email: env::var("GOOGLE_SA_EMAIL").unwrap_or_else(|_| {
                warn!("GOOGLE_SA_EMAIL not set, using empty value");
                String::new()
            }),
            google_private_key: env::var("GOOGLE_PRIVATE_KEY").unwrap_or_else(|_| {
                warn!("GOOGLE_PRIVATE_KEY not set, using empty value");
                String::new()
            }),
            google_token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            google_static_token: env::var("GOOGLE_STATIC_TOKEN").ok(),
            calendar_id: env::var("CALENDAR_ID").unwrap_or_else(|_| "primary".to_string()),
            calendar_base_url: env::var("CALENDAR_BASE_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/calendar/v3".to_string()),
            sheet_id: env::var("SHEET_ID").unwrap_or_else(|_| {
                warn!("SHEET_ID not set, using empty value");
                String::new()
            }),
            sheets_base_url: env::var("SHEETS_BASE_URL")
                .unwrap_or_else(|_| "https://sheets.googleapis.com/v4".to_string()),
            redis_url: env::var("REDIS_URL").ok(),
            conversation_ttl_seconds: env::var("CONVERSATION_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            treatments_path: env::var("TREATMENTS_PATH")
                .unwrap_or_else(|_| "config/tratamientos.json".to_string()),
            templates_path: env::var("TEMPLATES_PATH")
                .unwrap_or_else(|_| "config/templates.json".to_string()),
            reminder_lead_hours: env::var("REMINDER_LEAD_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            reply_window_hours: env::var("REPLY_WINDOW_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(6),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Baseline configuration for tests and local experiments. External
    /// endpoints point at localhost and are meant to be overridden per test.
    pub fn test_defaults() -> Self {
        Self {
            clinic_timezone: chrono_tz::America::Mexico_City,
            working_weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            opening_time: NaiveTime::from_hms_opt(9, 0, 0).expect("static time is valid"),
            closing_time: NaiveTime::from_hms_opt(19, 0, 0).expect("static time is valid"),
            slot_minutes: 30,
            holidays: HashSet::new(),
            verify_token: "test-verify-token".to_string(),
            wa_access_token: "test-wa-token".to_string(),
            wa_phone_number_id: "1000000001".to_string(),
            wa_base_url: "http://localhost:0".to_string(),
            google_sa_email: String::new(),
            google_private_key: String::new(),
            google_token_url: "http://localhost:0/token".to_string(),
            google_static_token: Some("test-google-token".to_string()),
            calendar_id: "primary".to_string(),
            calendar_base_url: "http://localhost:0".to_string(),
            sheet_id: "sheet-1".to_string(),
            sheets_base_url: "http://localhost:0".to_string(),
            redis_url: None,
            conversation_ttl_seconds: 3600,
            treatments_path: "config/tratamientos.json".to_string(),
            templates_path: "config/templates.json".to_string(),
            reminder_lead_hours: 5,
            reply_window_hours: 6,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.verify_token.is_empty()
            && !self.wa_access_token.is_empty()
            && !self.wa_phone_number_id.is_empty()
    }

}

/// Weekday indices follow the original deployment convention: 0 = Monday.
fn parse_weekdays(raw: &str) -> Vec<Weekday> {
    let days: Vec<Weekday> = raw
        .split(',')
        .filter_map(|part| match part.trim() {
            "0" => Some(Weekday::Mon),
            "1" => Some(Weekday::Tue),
            "2" => Some(Weekday::Wed),
            "3" => Some(Weekday::Thu),
            "4" => Some(Weekday::Fri),
            "5" => Some(Weekday::Sat),
            "6" => Some(Weekday::Sun),
            _ => None,
        })
        .collect();

    if days.is_empty() {
        warn!("WORKING_WEEKDAYS yielded no valid days, using Monday-Friday");
        return vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ];
    }
    days
}

fn parse_time(raw: &str, default_hour: u32) -> NaiveTime {
    NaiveTime::parse_from_str(raw, "%H:%M").unwrap_or_else(|_| {
        NaiveTime::from_hms_opt(default_hour, 0, 0).expect("static time is valid")
    })
}

/// Holiday file is a flat JSON array of "YYYY-MM-DD" strings. A missing or
/// unreadable file means no holidays, with a warning, never a crash.
fn load_holidays(path: &str) -> HashSet<String> {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(dates) => dates.into_iter().collect(),
            Err(e) => {
                warn!("Holiday file {} is not a JSON string array: {}", path, e);
                HashSet::new()
            }
        },
        Err(_) => {
            warn!("Holiday file {} not found, assuming no holidays", path);
            HashSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekday_indices_are_monday_based() {
        let days = parse_weekdays("0,4,6");
        assert_eq!(days, vec![Weekday::Mon, Weekday::Fri, Weekday::Sun]);
    }

    #[test]
    fn invalid_weekday_list_falls_back_to_monday_friday() {
        let days = parse_weekdays("x,9");
        assert_eq!(days.len(), 5);
        assert_eq!(days[0], Weekday::Mon);
    }

    #[test]
    fn opening_time_parses_or_defaults() {
        assert_eq!(parse_time("08:30", 9), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(parse_time("garbage", 9), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }
}
