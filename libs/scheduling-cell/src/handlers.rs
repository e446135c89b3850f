use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_models::AppError;
use whatsapp_cell::WebhookPayload;

use crate::services::conversation::ConversationEngine;

/// Shared state for the webhook routes.
pub struct BotState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<ConversationEngine>,
}

/// Meta's subscription handshake parameters. All optional because the
/// endpoint also receives bare GETs from health probes.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /webhook: echo the challenge iff the verify token matches.
pub async fn verify_webhook(
    State(state): State<Arc<BotState>>,
    Query(params): Query<VerifyParams>,
) -> Result<String, AppError> {
    match (params.mode.as_deref(), params.verify_token.as_deref()) {
        (Some(mode), Some(token)) => {
            if mode == "subscribe" && token == state.config.verify_token {
                info!("Webhook verification succeeded");
                Ok(params.challenge.unwrap_or_default())
            } else {
                Err(AppError::Forbidden("Invalid verify token".to_string()))
            }
        }
        _ => Err(AppError::NotFound("Not a verification request".to_string())),
    }
}

/// POST /webhook: hand the first text or button reply to the engine.
/// Always answers 200 so Meta does not retry payloads we chose to skip.
pub async fn receive_webhook(
    State(state): State<Arc<BotState>>,
    Json(payload): Json<WebhookPayload>,
) -> &'static str {
    match payload.first_message() {
        Some(message) => {
            state
                .engine
                .handle_message(&message.phone, &message.text)
                .await;
        }
        None => debug!("Webhook payload carried no usable message"),
    }
    "ok"
}
