//! Alertmanager webhook payloads

pub mod model;

pub use model::{Alert, InvalidAlert, WebhookMessage, KV, STATUS_FIRING, STATUS_RESOLVED};
