//! In-memory watchdog state and the fire/recover decision

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::event::WatchdogEvent;
use crate::alerts::Alert;

/// Watchdog state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchdogState {
    Idle,
    Firing,
}

/// Tracked watchdog. Only the store mutates these.
#[derive(Debug, Clone)]
struct WatchdogEntry {
    last_ping: DateTime<Utc>,
    last_alert: Alert,
    state: WatchdogState,
}

/// Read-only copy of an entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchdogSnapshot {
    pub id: String,
    pub last_ping: DateTime<Utc>,
    pub last_alert: Alert,
    pub state: WatchdogState,
}

/// Concurrency-safe map from identity to watchdog state.
///
/// A single mutex guards the whole map. Every decision is made and applied
/// while holding it, and callers only ever get owned events back, so
/// delivery always happens after the lock is released.
#[derive(Debug, Default)]
pub struct WatchdogStore {
    entries: Mutex<BTreeMap<String, WatchdogEntry>>,
}

impl WatchdogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ping.
    ///
    /// The first ping for an identity only creates the entry. A ping for a
    /// firing entry returns a recovered event carrying the alert captured when
    /// it fired, then resets the entry to the new ping.
    pub fn upsert(&self, id: &str, alert: Alert, now: DateTime<Utc>) -> Option<WatchdogEvent> {
        let mut entries = self.entries.lock();

        let Some(entry) = entries.get_mut(id) else {
            entries.insert(
                id.to_string(),
                WatchdogEntry {
                    last_ping: now,
                    last_alert: alert,
                    state: WatchdogState::Idle,
                },
            );
            tracing::debug!(watchdog_id = %id, "New watchdog registered");
            return None;
        };

        let previous = std::mem::replace(&mut entry.last_alert, alert);
        entry.last_ping = entry.last_ping.max(now);

        match entry.state {
            WatchdogState::Idle => None,
            WatchdogState::Firing => {
                entry.state = WatchdogState::Idle;
                Some(WatchdogEvent::recovered(id, previous))
            }
        }
    }

    /// Fire every idle entry silent for longer than `expiry`.
    ///
    /// Entries already firing are skipped, so a long silence produces a single
    /// event no matter how many sweeps observe it. Events come back ordered by
    /// identity.
    pub fn sweep_expired(&self, now: DateTime<Utc>, expiry: Duration) -> Vec<WatchdogEvent> {
        let mut entries = self.entries.lock();

        entries
            .iter_mut()
            .filter(|(_, entry)| {
                entry.state == WatchdogState::Idle && exceeds(now, entry.last_ping, expiry)
            })
            .map(|(id, entry)| {
                entry.state = WatchdogState::Firing;
                WatchdogEvent::fired(id.clone(), entry.last_alert.clone())
            })
            .collect()
    }

    /// Drop idle entries silent for longer than `max_silence`.
    ///
    /// Firing entries stay so their recovery can still be reported. Returns
    /// the number of entries removed.
    pub fn evict_idle(&self, now: DateTime<Utc>, max_silence: Duration) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();

        entries.retain(|_, entry| {
            entry.state == WatchdogState::Firing || !exceeds(now, entry.last_ping, max_silence)
        });

        before - entries.len()
    }

    /// Copy of a single entry
    pub fn get(&self, id: &str) -> Option<WatchdogSnapshot> {
        let entries = self.entries.lock();
        entries.get(id).map(|entry| snapshot(id, entry))
    }

    /// Copies of all entries, ordered by identity
    pub fn snapshot(&self) -> Vec<WatchdogSnapshot> {
        let entries = self.entries.lock();
        entries
            .iter()
            .map(|(id, entry)| snapshot(id, entry))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn snapshot(id: &str, entry: &WatchdogEntry) -> WatchdogSnapshot {
    WatchdogSnapshot {
        id: id.to_string(),
        last_ping: entry.last_ping,
        last_alert: entry.last_alert.clone(),
        state: entry.state,
    }
}

/// Whether more than `limit` has passed between `since` and `now`
fn exceeds(now: DateTime<Utc>, since: DateTime<Utc>, limit: Duration) -> bool {
    match (now - since).to_std() {
        Ok(elapsed) => elapsed > limit,
        // negative: clock went backwards relative to the last ping
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watchdog::event::EventKind;
    use std::sync::{Arc, Barrier};
    use std::thread;

    const EXPIRY: Duration = Duration::from_secs(120);

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::seconds(secs)
    }

    fn alert(marker: &str) -> Alert {
        Alert::firing([("alertname", "Watchdog")]).with_annotation("marker", marker)
    }

    #[test]
    fn test_first_ping_never_fires() {
        let store = WatchdogStore::new();
        assert!(store.upsert("a", alert("t0"), at(0)).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().state, WatchdogState::Idle);
    }

    #[test]
    fn test_fire_after_threshold() {
        let store = WatchdogStore::new();
        store.upsert("a", alert("t0"), at(0));

        assert!(store.sweep_expired(at(90), EXPIRY).is_empty());

        let events = store.sweep_expired(at(150), EXPIRY);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Fired);
        assert_eq!(events[0].id, "a");
        assert_eq!(events[0].alert, alert("t0"));
        assert_eq!(store.get("a").unwrap().state, WatchdogState::Firing);
    }

    #[test]
    fn test_threshold_is_strict() {
        let store = WatchdogStore::new();
        store.upsert("a", alert("t0"), at(0));
        assert!(store.sweep_expired(at(120), EXPIRY).is_empty());
        assert_eq!(store.sweep_expired(at(121), EXPIRY).len(), 1);
    }

    #[test]
    fn test_recover_carries_fire_time_snapshot() {
        let store = WatchdogStore::new();
        store.upsert("a", alert("t0"), at(0));
        store.sweep_expired(at(150), EXPIRY);

        let event = store.upsert("a", alert("t165"), at(165)).unwrap();
        assert_eq!(event.kind, EventKind::Recovered);
        assert_eq!(event.alert, alert("t0"));

        let entry = store.get("a").unwrap();
        assert_eq!(entry.state, WatchdogState::Idle);
        assert_eq!(entry.last_ping, at(165));
        assert_eq!(entry.last_alert, alert("t165"));

        // Next ping is a plain refresh
        assert!(store.upsert("a", alert("t170"), at(170)).is_none());
    }

    #[test]
    fn test_idle_ping_refreshes_snapshot() {
        let store = WatchdogStore::new();
        store.upsert("a", alert("t0"), at(0));
        assert!(store.upsert("a", alert("t60"), at(60)).is_none());

        let entry = store.get("a").unwrap();
        assert_eq!(entry.last_ping, at(60));
        assert_eq!(entry.last_alert, alert("t60"));

        // Silence is measured from the refreshed ping
        assert!(store.sweep_expired(at(150), EXPIRY).is_empty());
        let events = store.sweep_expired(at(190), EXPIRY);
        assert_eq!(events[0].alert, alert("t60"));
    }

    #[test]
    fn test_single_fire_per_silence_episode() {
        let store = WatchdogStore::new();
        store.upsert("b", alert("t0"), at(0));

        assert_eq!(store.sweep_expired(at(600), EXPIRY).len(), 1);
        for minute in 11..20 {
            assert!(store.sweep_expired(at(minute * 60), EXPIRY).is_empty());
        }
    }

    #[test]
    fn test_last_ping_never_moves_backwards() {
        let store = WatchdogStore::new();
        store.upsert("a", alert("t100"), at(100));
        store.upsert("a", alert("t50"), at(50));
        assert_eq!(store.get("a").unwrap().last_ping, at(100));
    }

    #[test]
    fn test_sweep_orders_by_identity() {
        let store = WatchdogStore::new();
        for id in ["c", "a", "b"] {
            store.upsert(id, alert(id), at(0));
        }

        let ids: Vec<_> = store
            .sweep_expired(at(300), EXPIRY)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_evict_idle_keeps_firing_entries() {
        let store = WatchdogStore::new();
        store.upsert("stale", alert("t0"), at(0));
        store.upsert("firing", alert("t0"), at(0));
        store.sweep_expired(at(150), EXPIRY);
        store.upsert("stale", alert("t0"), at(150));
        store.upsert("fresh", alert("t3500"), at(3500));

        let evicted = store.evict_idle(at(3600), Duration::from_secs(600));
        assert_eq!(evicted, 1);
        assert!(store.get("stale").is_none());
        assert!(store.get("fresh").is_some());
        assert_eq!(store.get("firing").unwrap().state, WatchdogState::Firing);
    }

    #[test]
    fn test_concurrent_ping_and_sweep() {
        // Each round: A fires, then a ping races a repeat sweep. Whatever the
        // interleaving, exactly one fire and one recovery must come out.
        for _ in 0..200 {
            let store = Arc::new(WatchdogStore::new());
            store.upsert("a", alert("t0"), at(0));
            let fired = store.sweep_expired(at(150), EXPIRY);
            assert_eq!(fired.len(), 1);

            let barrier = Arc::new(Barrier::new(2));

            let pinger = {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.upsert("a", alert("t160"), at(160))
                })
            };
            let sweeper = {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.sweep_expired(at(170), EXPIRY)
                })
            };

            let recovered = pinger.join().unwrap();
            let refired = sweeper.join().unwrap();

            assert_eq!(recovered.map(|e| e.kind), Some(EventKind::Recovered));
            assert!(refired.is_empty());
            assert_eq!(store.get("a").unwrap().state, WatchdogState::Idle);
        }
    }

    #[test]
    fn test_concurrent_sweeps_fire_once() {
        let store = Arc::new(WatchdogStore::new());
        for i in 0..50 {
            store.upsert(&format!("w{i}"), alert("t0"), at(0));
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.sweep_expired(at(300), EXPIRY).len())
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
    }

    #[test]
    fn test_concurrent_upserts_same_identity() {
        let store = Arc::new(WatchdogStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.upsert("a", alert("x"), at(i)))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_none());
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().last_ping, at(15));
    }
}
