use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, list_watchdogs, watchdog, webhook, AppState};
use crate::config::ServerConfig;
use crate::notify::{ChatTransport, LogChat, Notifier, TemplateService, WebhookChat};
use crate::watchdog::{ExpirySweeper, NotificationSink, WatchdogStore};

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Alertmanager receivers
        .route("/webhook", post(webhook))
        .route("/watchdog", post(watchdog))
        // Inspection
        .route("/watchdogs", get(list_watchdogs))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let templates = match &config.template_dir {
        Some(dir) => TemplateService::with_dir(dir)?,
        None => TemplateService::new()?,
    };
    tracing::info!("Templates loaded successfully");

    let chat: Arc<dyn ChatTransport> = match &config.chat_url {
        Some(url) => Arc::new(WebhookChat::new(url.clone(), config.chat_channel.clone())),
        None => {
            tracing::warn!("No chat URL configured, messages will only be logged");
            Arc::new(LogChat)
        }
    };

    let notifier = Arc::new(Notifier::new(templates, chat));
    let store = Arc::new(WatchdogStore::new());

    let state = Arc::new(AppState {
        store: Arc::clone(&store),
        notifier: Arc::clone(&notifier),
    });

    // Start the watchdog sweeper
    let sweeper = Arc::new(
        ExpirySweeper::new(
            Arc::clone(&store),
            notifier as Arc<dyn NotificationSink>,
            config.interval,
            config.expiry,
        )
        .with_eviction(config.evict_after),
    );
    let sweeper_handle = Arc::clone(&sweeper).start();

    // Build router
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting alertbridge on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&sweeper)))
        .await?;

    sweeper_handle.abort();

    tracing::info!("alertbridge stopped");
    Ok(())
}

async fn shutdown_signal(sweeper: Arc<ExpirySweeper>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, stopping sweeper...");
    sweeper.stop();
}
