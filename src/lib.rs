//! alertbridge: Alertmanager to chat relay with watchdog tracking
//!
//! Receives Alertmanager webhook notifications, renders them through
//! minijinja templates and posts the result to a chat incoming webhook.
//!
//! # Features
//!
//! - **Relay**: `POST /webhook` forwards every notification as a chat message
//! - **Watchdogs**: `POST /watchdog` treats firing alerts as "still alive"
//!   pings and reports when one goes silent and when it comes back
//! - **Templates**: built-in message templates, overridable from a directory
//!
//! # Example
//!
//! ```
//! use alertbridge::alerts::Alert;
//! use alertbridge::watchdog::{identify_labels, WatchdogStore};
//! use chrono::{Duration, Utc};
//!
//! let store = WatchdogStore::new();
//! let alert = Alert::firing([("alertname", "Watchdog")]);
//! let id = identify_labels(&alert.labels);
//!
//! let t0 = Utc::now();
//! assert!(store.upsert(&id, alert.clone(), t0).is_none());
//!
//! let fired = store.sweep_expired(t0 + Duration::minutes(3), std::time::Duration::from_secs(120));
//! assert_eq!(fired.len(), 1);
//!
//! let recovered = store.upsert(&id, alert, t0 + Duration::minutes(4));
//! assert!(recovered.is_some());
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod notify;
pub mod watchdog;

// Re-export commonly used types
pub use alerts::{Alert, WebhookMessage};
pub use config::{ConfigError, ServerConfig};
pub use watchdog::{ExpirySweeper, WatchdogEvent, WatchdogStore};
