use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::models::{ReplyButton, WhatsAppError};

/// Outbound messaging boundary. The scheduling cell only ever talks to this
/// trait; production wires in `WhatsAppClient`.
#[async_trait]
pub trait MessagingSender: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), WhatsAppError>;

    async fn send_buttons(
        &self,
        to: &str,
        body: &str,
        buttons: &[ReplyButton],
    ) -> Result<(), WhatsAppError>;
}

pub struct WhatsAppClient {
    client: reqwest::Client,
    base_url: String,
    phone_number_id: String,
    access_token: String,
}

impl WhatsAppClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.wa_base_url.clone(),
            phone_number_id: config.wa_phone_number_id.clone(),
            access_token: config.wa_access_token.clone(),
        }
    }

    async fn post_message(&self, payload: Value) -> Result<(), WhatsAppError> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);
        debug!("Sending WhatsApp message to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("WhatsApp API error ({}): {}", status, body);
            return Err(WhatsAppError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl MessagingSender for WhatsAppClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), WhatsAppError> {
        self.post_message(json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": { "body": body }
        }))
        .await
    }

    async fn send_buttons(
        &self,
        to: &str,
        body: &str,
        buttons: &[ReplyButton],
    ) -> Result<(), WhatsAppError> {
        let rendered: Vec<Value> = buttons
            .iter()
            .map(|b| json!({ "type": "reply", "reply": { "id": b.id, "title": b.title } }))
            .collect();

        self.post_message(json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "interactive",
            "interactive": {
                "type": "button",
                "body": { "text": body },
                "action": { "buttons": rendered }
            }
        }))
        .await
    }
}
