use std::sync::Arc;

use axum::{routing::get, Router};

use scheduling_cell::{webhook_routes, BotState};

pub fn create_router(state: Arc<BotState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Citas bot is running!" }))
        .merge(webhook_routes(state))
}
