pub mod availability;
pub mod conversation;
pub mod reminders;
pub mod resolver;
pub mod store;
