//! In-process fan-out of ingestion progress to live observers.
//!
//! A bounded trailing buffer lets late joiners catch up: `subscribe`
//! returns the buffered backlog and a live receiver taken under the same
//! lock, so an event lands in exactly one of the two for any observer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::platform::Platform;

/// How many trailing events late subscribers can replay.
pub const BACKLOG_CAPACITY: usize = 200;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
}

/// A unit of observable run status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// A new ingestion run started; `total` is the precomputed job count.
    Reset { total: usize },
    /// One job finished, successfully or not.
    Log {
        platform: Platform,
        username: String,
        status: LogStatus,
        message: String,
    },
}

/// Process-wide progress broadcaster. Cheap to clone; all clones share the
/// same buffer and channel.
#[derive(Clone)]
pub struct ProgressHub {
    backlog: Arc<Mutex<VecDeque<ProgressEvent>>>,
    capacity: usize,
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::with_capacity(BACKLOG_CAPACITY)
    }

    pub fn with_capacity(backlog_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY.max(backlog_capacity));
        Self {
            backlog: Arc::new(Mutex::new(VecDeque::with_capacity(backlog_capacity))),
            capacity: backlog_capacity,
            tx,
        }
    }

    /// Append to the backlog (evicting the oldest beyond capacity) and
    /// forward to every live subscriber. Never blocks; a send with no
    /// receivers is a no-op, and a receiver that went away just stops
    /// receiving.
    pub fn publish(&self, event: ProgressEvent) {
        let mut backlog = self.backlog.lock().expect("progress backlog poisoned");
        while backlog.len() >= self.capacity.max(1) {
            backlog.pop_front();
        }
        backlog.push_back(event.clone());
        // Send while still holding the lock so a concurrent subscribe sees
        // this event either in its snapshot or on its receiver, never both.
        let _ = self.tx.send(event);
    }

    /// Snapshot of the backlog plus a live receiver for everything after it.
    pub fn subscribe(&self) -> (Vec<ProgressEvent>, broadcast::Receiver<ProgressEvent>) {
        let backlog = self.backlog.lock().expect("progress backlog poisoned");
        (backlog.iter().cloned().collect(), self.tx.subscribe())
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(n: usize) -> ProgressEvent {
        ProgressEvent::Log {
            platform: Platform::Leetcode,
            username: format!("user{n}"),
            status: LogStatus::Success,
            message: format!("job {n} done"),
        }
    }

    #[tokio::test]
    async fn late_subscriber_replays_backlog_then_receives_live() {
        let hub = ProgressHub::new();
        hub.publish(ProgressEvent::Reset { total: 6 });
        for n in 1..=4 {
            hub.publish(log(n));
        }

        let (backlog, mut rx) = hub.subscribe();
        assert_eq!(backlog.len(), 5);
        assert_eq!(backlog[0], ProgressEvent::Reset { total: 6 });
        assert_eq!(backlog[4], log(4));

        hub.publish(log(5));
        let live = rx.recv().await.unwrap();
        assert_eq!(live, log(5));
        // the live event is not duplicated into the snapshot we took
        assert!(!backlog.contains(&log(5)));
    }

    #[tokio::test]
    async fn backlog_evicts_oldest_beyond_capacity() {
        let hub = ProgressHub::with_capacity(3);
        for n in 1..=5 {
            hub.publish(log(n));
        }
        let (backlog, _rx) = hub.subscribe();
        assert_eq!(backlog, vec![log(3), log(4), log(5)]);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let hub = ProgressHub::new();
        hub.publish(ProgressEvent::Reset { total: 1 });
        // no panic, and the event is still buffered for later subscribers
        let (backlog, _rx) = hub.subscribe();
        assert_eq!(backlog.len(), 1);
    }

    #[tokio::test]
    async fn dropped_subscriber_does_not_affect_others() {
        let hub = ProgressHub::new();
        let (_, rx_dead) = hub.subscribe();
        let (_, mut rx_live) = hub.subscribe();
        drop(rx_dead);

        hub.publish(log(1));
        assert_eq!(rx_live.recv().await.unwrap(), log(1));
    }

    #[test]
    fn wire_form_matches_ui_contract() {
        let reset = serde_json::to_value(ProgressEvent::Reset { total: 12 }).unwrap();
        assert_eq!(reset, serde_json::json!({"type": "reset", "total": 12}));

        let log = serde_json::to_value(ProgressEvent::Log {
            platform: Platform::Codechef,
            username: "chef1".into(),
            status: LogStatus::Error,
            message: "profile not found (404)".into(),
        })
        .unwrap();
        assert_eq!(
            log,
            serde_json::json!({
                "type": "log",
                "platform": "codechef",
                "username": "chef1",
                "status": "error",
                "message": "profile not found (404)"
            })
        );
    }
}
