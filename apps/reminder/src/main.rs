use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use calendar_cell::GoogleCalendarClient;
use scheduling_cell::catalog::MessageTemplates;
use scheduling_cell::run_reminder_sweep;
use shared_config::AppConfig;
use shared_google_auth::GoogleAuth;
use whatsapp_cell::WhatsAppClient;

/// One-shot reminder job, meant to run from cron once an hour.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let templates = MessageTemplates::load(&config.templates_path)
        .context("message templates failed to load")?;

    let auth = Arc::new(GoogleAuth::new(&config));
    let calendar = Arc::new(GoogleCalendarClient::new(&config, auth));
    let messaging = Arc::new(WhatsAppClient::new(&config));

    let sent = run_reminder_sweep(calendar, messaging, &templates, &config).await?;
    info!("Done, {} reminder(s) sent", sent);
    Ok(())
}
