use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::alerts::WebhookMessage;
use crate::notify::Notifier;
use crate::watchdog::{identify_labels, NotificationSink, WatchdogSnapshot, WatchdogStore};

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<WatchdogStore>,
    pub notifier: Arc<Notifier>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Webhook relay
// ============================================================================

#[derive(Serialize)]
pub struct RelayResponse {
    pub alerts: usize,
}

pub async fn webhook(
    State(state): State<Arc<AppState>>,
    Json(message): Json<WebhookMessage>,
) -> Result<Json<RelayResponse>, ApiError> {
    tracing::info!(
        receiver = %message.receiver,
        status = %message.status,
        alerts = message.alerts.len(),
        "Received webhook"
    );

    state.notifier.relay(&message).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to relay webhook");
        ApiError::Delivery(e.to_string())
    })?;

    Ok(Json(RelayResponse {
        alerts: message.alerts.len(),
    }))
}

// ============================================================================
// Watchdog pings
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WatchdogResponse {
    /// Firing alerts recorded as pings
    pub tracked: usize,
    /// Pings that recovered a fired watchdog
    pub recovered: usize,
    /// Alerts ignored because they were resolved or malformed
    pub skipped: usize,
}

pub async fn watchdog(
    State(state): State<Arc<AppState>>,
    Json(message): Json<WebhookMessage>,
) -> Json<WatchdogResponse> {
    let now = Utc::now();
    let mut tracked = 0;
    let mut skipped = message.alerts.len();
    let mut recoveries = Vec::new();

    for alert in message.firing() {
        if let Err(e) = alert.validate() {
            tracing::warn!(labels = ?alert.labels, error = %e, "Ignoring watchdog alert");
            continue;
        }

        let id = identify_labels(&alert.labels);
        tracing::debug!(watchdog_id = %id, labels = ?alert.labels, "Watchdog ping");

        if let Some(event) = state.store.upsert(&id, alert.clone(), now) {
            recoveries.push(event);
        }
        tracked += 1;
        skipped -= 1;
    }

    for event in &recoveries {
        tracing::info!(watchdog_id = %event.id, "Watchdog recovered");
        if let Err(e) = state.notifier.deliver(event).await {
            tracing::error!(
                watchdog_id = %event.id,
                error = %e,
                "Failed to deliver watchdog notification"
            );
        }
    }

    Json(WatchdogResponse {
        tracked,
        recovered: recoveries.len(),
        skipped,
    })
}

#[derive(Serialize)]
pub struct WatchdogsResponse {
    pub watchdogs: Vec<WatchdogSnapshot>,
}

pub async fn list_watchdogs(State(state): State<Arc<AppState>>) -> Json<WatchdogsResponse> {
    Json(WatchdogsResponse {
        watchdogs: state.store.snapshot(),
    })
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Delivery(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Delivery(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
