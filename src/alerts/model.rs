//! Alertmanager webhook payload types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label or annotation set. Decoding a JSON object with a repeated key keeps
/// the last value.
pub type KV = BTreeMap<String, String>;

/// Status value Alertmanager uses for active alerts
pub const STATUS_FIRING: &str = "firing";
/// Status value Alertmanager uses for resolved alerts
pub const STATUS_RESOLVED: &str = "resolved";

/// Webhook notification body as posted by Alertmanager
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub group_key: String,
    #[serde(default)]
    pub truncated_alerts: u64,
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub group_labels: KV,
    #[serde(default)]
    pub common_labels: KV,
    #[serde(default)]
    pub common_annotations: KV,
    #[serde(default, rename = "externalURL")]
    pub external_url: String,
}

impl WebhookMessage {
    /// Alerts currently firing in this message
    pub fn firing(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|a| a.is_firing())
    }

    /// Alerts resolved in this message
    pub fn resolved(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|a| !a.is_firing())
    }
}

/// A single alert inside a webhook message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub labels: KV,
    #[serde(default)]
    pub annotations: KV,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "generatorURL")]
    pub generator_url: String,
    #[serde(default)]
    pub fingerprint: String,
}

impl Alert {
    /// Create a firing alert with the given labels
    pub fn firing<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            status: STATUS_FIRING.to_string(),
            labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Default::default()
        }
    }

    /// Add an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn is_firing(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_FIRING)
    }

    /// Check that the alert carries a usable label set.
    ///
    /// Alerts failing this check must not reach the watchdog store.
    pub fn validate(&self) -> Result<(), InvalidAlert> {
        if self.labels.is_empty() {
            return Err(InvalidAlert::NoLabels);
        }
        if self.labels.keys().any(|k| k.trim().is_empty()) {
            return Err(InvalidAlert::EmptyLabelName);
        }
        Ok(())
    }
}

/// Reasons an incoming alert is rejected at the ingestion boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAlert {
    #[error("alert has no labels")]
    NoLabels,

    #[error("alert has a label with an empty name")]
    EmptyLabelName,
}
