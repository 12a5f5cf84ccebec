//! Dead-man's-switch tracking for alerts that are expected to ping
//! periodically.
//!
//! Pings are fingerprinted by label set and recorded in a [`WatchdogStore`].
//! An [`ExpirySweeper`] periodically fires entries that went silent, and a
//! later ping for a fired entry produces a recovery. Both transitions are
//! handed to a [`NotificationSink`].

pub mod event;
pub mod fingerprint;
pub mod store;
pub mod sweeper;

pub use event::{EventKind, NotificationSink, WatchdogEvent};
pub use fingerprint::{identify, identify_labels};
pub use store::{WatchdogSnapshot, WatchdogState, WatchdogStore};
pub use sweeper::{ExpirySweeper, SweepStats};
