pub mod models;
pub mod services;

pub use models::*;
pub use services::client::{MessagingSender, WhatsAppClient};
