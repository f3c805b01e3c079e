//! Live stream hub: in-process fan-out of freshly appended events to
//! subscribed observers.
//!
//! # Invariants
//!
//! - **Persist before publish**: the hub is only ever handed events that the
//!   ledger already accepted. The hub itself does not persist anything.
//! - **Per-topic ordering**: one subscriber sees one topic's frames in
//!   publish order. No cross-topic ordering is guaranteed.
//! - **A slow sink is a dropped sink**: delivery is a single non-blocking
//!   write attempt into the subscriber's bounded channel; a full or closed
//!   channel removes the subscriber silently. The publisher never blocks.
//!
//! Each frame is one JSON line: `{"topic": ..., "data": ...}\n`, serialised
//! once per publish and shared across sinks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// One-shot greeting pushed to a sink at subscribe time.
    Connected,
    /// Keep-alive so intermediaries do not close an idle stream.
    Ping,
    /// Every persisted ledger event.
    Ledger,
    /// Every persisted audit log.
    Audit,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Connected => "connected",
            Topic::Ping => "ping",
            Topic::Ledger => "ledger",
            Topic::Audit => "audit",
        }
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

struct Sink {
    id: u64,
    tx: mpsc::Sender<Vec<u8>>,
}

/// Handle returned by [`StreamHub::subscribe`]; dropping it does NOT
/// unsubscribe (the sink stays until a write fails), calling
/// [`SubscriberHandle::unsubscribe`] removes it immediately.
pub struct SubscriberHandle {
    id: u64,
    sinks: Arc<Mutex<Vec<Sink>>>,
}

impl SubscriberHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {
        let mut sinks = self.sinks.lock().expect("hub lock poisoned");
        sinks.retain(|s| s.id != self.id);
    }
}

// ---------------------------------------------------------------------------
// Hub
// ---------------------------------------------------------------------------

/// Fan-out hub. Cheap to share via `Arc`.
pub struct StreamHub {
    sinks: Arc<Mutex<Vec<Sink>>>,
    next_id: AtomicU64,
    /// Per-sink channel capacity; a subscriber this far behind is dropped.
    capacity: usize,
    last_publish: Mutex<Instant>,
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl StreamHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
            capacity,
            last_publish: Mutex::new(Instant::now()),
        }
    }

    /// Register a new byte sink. The subscriber receives a one-shot
    /// `connected` frame immediately, then frames as they are published.
    pub fn subscribe(&self) -> (SubscriberHandle, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // The greeting is best-effort like every other write.
        let frame = encode_frame(Topic::Connected, &serde_json::json!({"subscriber_id": id}));
        let _ = tx.try_send(frame);

        self.sinks
            .lock()
            .expect("hub lock poisoned")
            .push(Sink { id, tx });

        (
            SubscriberHandle {
                id,
                sinks: Arc::clone(&self.sinks),
            },
            rx,
        )
    }

    /// Serialise once, write to every live sink. Sinks whose write fails
    /// (full or closed) are removed.
    pub fn publish<T: Serialize>(&self, topic: Topic, data: &T) {
        let frame = encode_frame(topic, data);

        let mut sinks = self.sinks.lock().expect("hub lock poisoned");
        let before = sinks.len();
        sinks.retain(|sink| sink.tx.try_send(frame.clone()).is_ok());
        let dropped = before - sinks.len();
        if dropped > 0 {
            debug!(topic = topic.as_str(), dropped, "dropped slow/closed subscribers");
        }

        *self.last_publish.lock().expect("hub lock poisoned") = Instant::now();
    }

    /// Live subscriber count.
    pub fn count(&self) -> usize {
        self.sinks.lock().expect("hub lock poisoned").len()
    }

    /// Duration since the last publish on any topic.
    pub fn idle_for(&self) -> Duration {
        self.last_publish
            .lock()
            .expect("hub lock poisoned")
            .elapsed()
    }
}

fn encode_frame<T: Serialize>(topic: Topic, data: &T) -> Vec<u8> {
    // A frame is one JSON line. Serialisation of hub-controlled shapes does
    // not fail; a subscriber-visible error frame is still a valid frame.
    let line = serde_json::to_string(&serde_json::json!({
        "topic": topic.as_str(),
        "data": data,
    }))
    .unwrap_or_else(|e| format!("{{\"topic\":\"{}\",\"error\":\"{e}\"}}", topic.as_str()));
    let mut bytes = line.into_bytes();
    bytes.push(b'\n');
    bytes
}

// ---------------------------------------------------------------------------
// Keep-alive
// ---------------------------------------------------------------------------

/// Ping cadence required by the stream contract.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Spawn the keep-alive task: publishes a `ping` whenever the hub has been
/// idle for `interval`. Returns the task handle so owners can abort it on
/// shutdown.
pub fn spawn_keepalive(hub: Arc<StreamHub>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if hub.idle_for() >= interval {
                hub.publish(Topic::Ping, &serde_json::json!({}));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(frame: &[u8]) -> serde_json::Value {
        serde_json::from_slice(frame).unwrap()
    }

    #[test]
    fn subscriber_gets_connected_then_frames_in_order() {
        let hub = StreamHub::new(8);
        let (_handle, mut rx) = hub.subscribe();

        hub.publish(Topic::Ledger, &serde_json::json!({"n": 1}));
        hub.publish(Topic::Ledger, &serde_json::json!({"n": 2}));

        let first = decode(&rx.try_recv().unwrap());
        assert_eq!(first["topic"], "connected");

        let a = decode(&rx.try_recv().unwrap());
        let b = decode(&rx.try_recv().unwrap());
        assert_eq!(a["data"]["n"], 1);
        assert_eq!(b["data"]["n"], 2);
    }

    #[test]
    fn slow_sink_is_dropped_not_blocked() {
        // Capacity 2: the connected frame plus one publish fill the channel.
        let hub = StreamHub::new(2);
        let (_handle, _rx) = hub.subscribe();
        assert_eq!(hub.count(), 1);

        hub.publish(Topic::Ledger, &serde_json::json!({"n": 1}));
        assert_eq!(hub.count(), 1, "still within capacity");

        hub.publish(Topic::Ledger, &serde_json::json!({"n": 2}));
        assert_eq!(hub.count(), 0, "full sink silently removed");
    }

    #[test]
    fn closed_sink_is_removed_on_next_publish() {
        let hub = StreamHub::new(8);
        let (_handle, rx) = hub.subscribe();
        drop(rx);

        hub.publish(Topic::Audit, &serde_json::json!({}));
        assert_eq!(hub.count(), 0);
    }

    #[test]
    fn unsubscribe_removes_immediately() {
        let hub = StreamHub::new(8);
        let (handle, _rx) = hub.subscribe();
        let (_handle2, _rx2) = hub.subscribe();
        assert_eq!(hub.count(), 2);

        handle.unsubscribe();
        assert_eq!(hub.count(), 1);
    }

    #[test]
    fn frames_are_newline_terminated_json() {
        let hub = StreamHub::new(8);
        let (_handle, mut rx) = hub.subscribe();
        hub.publish(Topic::Ledger, &serde_json::json!({"k": "v"}));

        let _connected = rx.try_recv().unwrap();
        let frame = rx.try_recv().unwrap();
        assert_eq!(*frame.last().unwrap(), b'\n');
        let v = decode(&frame);
        assert_eq!(v["topic"], "ledger");
        assert_eq!(v["data"]["k"], "v");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn keepalive_pings_idle_subscribers() {
        let hub = Arc::new(StreamHub::new(8));
        let (_handle, mut rx) = hub.subscribe();
        let task = spawn_keepalive(Arc::clone(&hub), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(80)).await;
        task.abort();

        let _connected = rx.try_recv().unwrap();
        let mut saw_ping = false;
        while let Ok(frame) = rx.try_recv() {
            if decode(&frame)["topic"] == "ping" {
                saw_ping = true;
            }
        }
        assert!(saw_ping, "expected at least one ping while idle");
    }
}
