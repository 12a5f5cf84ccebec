use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time;

use super::event::NotificationSink;
use super::store::WatchdogStore;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub fired: usize,
    pub delivered: usize,
    pub failed: usize,
    pub evicted: usize,
}

/// Periodic driver that fires silent watchdogs
pub struct ExpirySweeper {
    store: Arc<WatchdogStore>,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
    expiry: Duration,
    evict_after: Option<Duration>,
    running: Arc<AtomicBool>,
}

impl ExpirySweeper {
    pub fn new(
        store: Arc<WatchdogStore>,
        sink: Arc<dyn NotificationSink>,
        interval: Duration,
        expiry: Duration,
    ) -> Self {
        Self {
            store,
            sink,
            interval,
            expiry,
            evict_after: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Also drop idle entries silent for longer than `evict_after`
    pub fn with_eviction(mut self, evict_after: Option<Duration>) -> Self {
        self.evict_after = evict_after;
        self
    }

    /// Start the background worker
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!(
                "Watchdog sweeper started with interval {:?}, expiry {:?}",
                self.interval,
                self.expiry
            );

            let mut interval = time::interval(self.interval);

            while self.running.load(Ordering::SeqCst) {
                interval.tick().await;

                let stats = self.sweep_once(Utc::now()).await;
                if stats.fired > 0 || stats.evicted > 0 {
                    tracing::info!(
                        fired = stats.fired,
                        delivered = stats.delivered,
                        failed = stats.failed,
                        evicted = stats.evicted,
                        "Watchdog sweep complete"
                    );
                }
            }

            tracing::info!("Watchdog sweeper stopped");
        })
    }

    /// Stop the worker
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if worker is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run a single sweep at `now` and deliver the resulting events in order.
    ///
    /// A failed delivery is logged and does not stop the remaining ones.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepStats {
        let events = self.store.sweep_expired(now, self.expiry);
        let mut stats = SweepStats {
            fired: events.len(),
            ..Default::default()
        };

        for event in &events {
            tracing::warn!(
                watchdog_id = %event.id,
                labels = ?event.alert.labels,
                "Watchdog expired"
            );

            match self.sink.deliver(event).await {
                Ok(()) => stats.delivered += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!(
                        watchdog_id = %event.id,
                        error = %e,
                        "Failed to deliver watchdog notification"
                    );
                }
            }
        }

        if let Some(max_silence) = self.evict_after {
            stats.evicted = self.store.evict_idle(now, max_silence);
        }

        stats
    }
}
