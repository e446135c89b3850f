use chrono::DateTime;
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Sheets API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// One row of the appointment log. Column order matches the sheet header:
/// Fecha, Hora, Paciente, Tratamiento, Teléfono, Estado, Registrado.
#[derive(Debug, Clone)]
pub struct AppointmentRow {
    pub date: String,
    pub time: String,
    pub patient_name: String,
    pub treatment: String,
    pub phone: String,
    pub status: String,
    pub logged_at: String,
}

impl AppointmentRow {
    /// The bot never asks for a name, so Paciente stays empty; the clinic
    /// fills it in by hand.
    pub fn new(
        appointment: DateTime<Tz>,
        treatment: &str,
        phone: &str,
        status: &str,
        now: DateTime<Tz>,
    ) -> Self {
        Self {
            date: appointment.format("%d/%m/%Y").to_string(),
            time: appointment.format("%I:%M %p").to_string(),
            patient_name: String::new(),
            treatment: treatment.to_string(),
            phone: phone.to_string(),
            status: status.to_string(),
            logged_at: now.format("%d/%m/%Y %H:%M").to_string(),
        }
    }

    pub fn as_values(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.time.clone(),
            self.patient_name.clone(),
            self.treatment.clone(),
            self.phone.clone(),
            self.status.clone(),
            self.logged_at.clone(),
        ]
    }
}
