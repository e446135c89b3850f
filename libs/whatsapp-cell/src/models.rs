use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WhatsAppError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WhatsApp API error ({status}): {body}")]
    Api { status: u16, body: String },
}

/// Quick-reply button. The `id` comes back as the next inbound message's
/// text when the patient taps it.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyButton {
    pub id: String,
    pub title: String,
}

impl ReplyButton {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// A single normalized inbound message: who wrote and what they said.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    pub phone: String,
    pub text: String,
}

// ==============================================================================
// WEBHOOK PAYLOAD (Cloud API wire format, mapped to explicit structs)
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub value: ChangeValue,
}

#[derive(Debug, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub text: Option<TextContent>,
    pub interactive: Option<InteractiveContent>,
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractiveContent {
    pub button_reply: Option<ButtonReply>,
}

#[derive(Debug, Deserialize)]
pub struct ButtonReply {
    pub id: String,
}

impl WebhookPayload {
    /// Extracts the first user message, if this notification carries one.
    /// Delivery receipts and other status callbacks yield `None`.
    /// A tapped button surfaces its `id` as the message text.
    pub fn first_message(&self) -> Option<IncomingMessage> {
        let message = self
            .entry
            .first()?
            .changes
            .first()?
            .value
            .messages
            .first()?;

        let text = match (&message.text, &message.interactive) {
            (Some(text), _) => text.body.clone(),
            (None, Some(interactive)) => interactive.button_reply.as_ref()?.id.clone(),
            (None, None) => return None,
        };

        Some(IncomingMessage {
            phone: message.from.clone(),
            text: text.trim().to_lowercase(),
        })
    }
}
