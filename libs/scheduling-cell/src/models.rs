use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use calendar_cell::CalendarError;
use sheets_cell::SheetsError;
use whatsapp_cell::WhatsAppError;

use crate::services::store::StoreError;

/// Texts that restart the conversation from scratch.
pub const GREETINGS: [&str; 4] = ["hola", "ola", "buenas", "hello"];

/// Reminder reply-button ids (also accepted typed out).
pub const CONFIRM_KEYWORDS: [&str; 2] = ["conf", "confirmar"];
pub const CANCEL_KEYWORDS: [&str; 2] = ["canc", "cancelar"];

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Messaging error: {0}")]
    Messaging(#[from] WhatsAppError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Appointment log error: {0}")]
    Log(#[from] SheetsError),

    #[error("Conversation store error: {0}")]
    Store(#[from] StoreError),
}

/// Catalog entry loaded from `tratamientos.json`. Field names on the wire
/// stay Spanish to match the document the clinic edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: String,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "duracion")]
    pub duration_minutes: i64,
}

/// Per-patient conversation state, keyed by phone number in the store.
/// The store enforces the one-hour TTL; a greeting always resets it.
/// What the engine does with a message follows from what is set: a
/// treatment without an event means the patient owes us a date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub treatment: Option<Treatment>,
    pub event_id: Option<String>,
}

/// Result of the alternative-slot search. `degenerate` marks the fixed
/// `dt + 1h` placeholder pair used when no real open slot was found within
/// scan bounds; callers render "nothing found nearby" in that case.
#[derive(Debug, Clone)]
pub struct Alternatives {
    pub slots: Vec<DateTime<Tz>>,
    pub degenerate: bool,
}
