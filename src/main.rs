//! alertbridge server
//!
//! Run with: cargo run
//!
//! Configuration comes from `ALERTBRIDGE_*` environment variables (see
//! `alertbridge::config`). `RUST_LOG` sets the log level (default: info).
//!
//! Point an Alertmanager webhook receiver at `/webhook` to relay alerts, and
//! a receiver for an always-firing alert at `/watchdog` to track it as a
//! dead-man's switch.

use alertbridge::api::run_server;
use alertbridge::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alertbridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    tracing::info!("alertbridge configuration:");
    tracing::info!("  Listen: {}:{}", config.host, config.port);
    tracing::info!("  Sweep interval: {:?}", config.interval);
    tracing::info!("  Watchdog expiry: {:?}", config.expiry);
    match config.evict_after {
        Some(age) => tracing::info!("  Evict idle watchdogs after: {:?}", age),
        None => tracing::info!("  Eviction: DISABLED"),
    }
    match &config.template_dir {
        Some(dir) => tracing::info!("  Template overrides: {}", dir.display()),
        None => tracing::info!("  Templates: built-in"),
    }
    match &config.chat_url {
        Some(_) => tracing::info!(
            "  Chat: webhook (channel: {})",
            config.chat_channel.as_deref().unwrap_or("default")
        ),
        None => tracing::info!("  Chat: log only"),
    }

    run_server(config).await
}
