use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::handlers::{receive_webhook, verify_webhook, BotState};

pub fn webhook_routes(state: Arc<BotState>) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .with_state(state)
}
