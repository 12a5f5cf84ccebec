//! Watchdog transition events and the sink contract that consumes them

use serde::Serialize;

use crate::alerts::Alert;
use crate::notify::NotifierError;

/// Kind of watchdog transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A previously pinging watchdog went silent past the expiry threshold
    Fired,
    /// A fired watchdog started pinging again
    Recovered,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Fired => write!(f, "fired"),
            EventKind::Recovered => write!(f, "recovered"),
        }
    }
}

/// One state transition of one watchdog, detached from the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchdogEvent {
    pub kind: EventKind,
    /// Watchdog identity
    pub id: String,
    /// Alert snapshot the notification should describe
    pub alert: Alert,
}

impl WatchdogEvent {
    pub fn fired(id: impl Into<String>, alert: Alert) -> Self {
        Self {
            kind: EventKind::Fired,
            id: id.into(),
            alert,
        }
    }

    pub fn recovered(id: impl Into<String>, alert: Alert) -> Self {
        Self {
            kind: EventKind::Recovered,
            id: id.into(),
            alert,
        }
    }
}

/// Consumer of watchdog events.
///
/// Called at most once per transition. Implementations own rendering and
/// transport; the caller does not retry on failure.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &WatchdogEvent) -> Result<(), NotifierError>;
}
