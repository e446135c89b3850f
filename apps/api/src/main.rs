use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use calendar_cell::GoogleCalendarClient;
use scheduling_cell::catalog::{MessageTemplates, TreatmentCatalog};
use scheduling_cell::{BotState, ConversationEngine, RedisConversationStore};
use shared_config::AppConfig;
use shared_google_auth::GoogleAuth;
use sheets_cell::GoogleSheetsClient;
use whatsapp_cell::WhatsAppClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting citas API server");

    // Load configuration
    let config = Arc::new(AppConfig::from_env());

    let catalog = TreatmentCatalog::load(&config.treatments_path)
        .context("treatment catalog failed to load")?;
    let templates = MessageTemplates::load(&config.templates_path)
        .context("message templates failed to load")?;

    let auth = Arc::new(GoogleAuth::new(&config));
    let messaging = Arc::new(WhatsAppClient::new(&config));
    let calendar = Arc::new(GoogleCalendarClient::new(&config, auth.clone()));
    let log = Arc::new(GoogleSheetsClient::new(&config, auth));
    let store = Arc::new(
        RedisConversationStore::new(&config)
            .await
            .context("conversation store failed to connect")?,
    );

    let engine = Arc::new(ConversationEngine::new(
        &config, catalog, templates, messaging, calendar, log, store,
    ));

    let state = Arc::new(BotState {
        config: config.clone(),
        engine,
    });

    // Build the application router
    let app = router::create_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
            .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
    );

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
