use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_google_auth::GoogleAuth;

use crate::models::{AppointmentRow, SheetsError};

/// Append-only appointment log. Production wires in the Google Sheets
/// client; a failed append is a warning for the caller, never a crash.
#[async_trait]
pub trait AppendOnlyLog: Send + Sync {
    async fn append(&self, row: &AppointmentRow) -> Result<(), SheetsError>;
}

pub struct GoogleSheetsClient {
    client: reqwest::Client,
    auth: Arc<GoogleAuth>,
    base_url: String,
    sheet_id: String,
}

impl GoogleSheetsClient {
    pub fn new(config: &AppConfig, auth: Arc<GoogleAuth>) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth,
            base_url: config.sheets_base_url.clone(),
            sheet_id: config.sheet_id.clone(),
        }
    }
}

#[async_trait]
impl AppendOnlyLog for GoogleSheetsClient {
    async fn append(&self, row: &AppointmentRow) -> Result<(), SheetsError> {
        let token = self
            .auth
            .bearer_token()
            .await
            .map_err(|e| SheetsError::Auth(e.to_string()))?;

        let url = format!(
            "{}/spreadsheets/{}/values/A1:append?valueInputOption=USER_ENTERED",
            self.base_url, self.sheet_id
        );
        debug!("Appending {} row for {}", row.status, row.phone);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "values": [row.as_values()] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Sheets API error ({}): {}", status, body);
            return Err(SheetsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
