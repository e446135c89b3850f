pub mod catalog;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use handlers::BotState;
pub use models::*;
pub use router::webhook_routes;
pub use services::conversation::ConversationEngine;
pub use services::reminders::run_reminder_sweep;
pub use services::store::{ConversationStore, RedisConversationStore, StoreError};
