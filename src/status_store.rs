//! Capability readiness status, shared across the explorer.
//!
//! One [`CapabilityRecord`] per plugin id. Every write pushes the full
//! status map to all live subscribers, synchronously and in write order.
//! Subscribers are unbounded channels; a dropped subscription is pruned on
//! the next write.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Readiness of one capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityStatus {
    #[default]
    Unknown,
    Checking,
    Ready,
    NotRegistered,
    NotRunning,
    Error,
}

impl CapabilityStatus {
    /// True for the states a check cycle ends in.
    pub fn is_terminal(self) -> bool {
        !matches!(self, CapabilityStatus::Unknown | CapabilityStatus::Checking)
    }
}

/// Everything the store knows about one capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRecord {
    pub id: String,
    /// Route prefixes served by this capability (insert-only).
    pub known_routes: BTreeSet<String>,
    pub status: CapabilityStatus,
    pub updated_at: DateTime<Utc>,
}

impl CapabilityRecord {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            known_routes: BTreeSet::new(),
            status: CapabilityStatus::Unknown,
            updated_at: Utc::now(),
        }
    }
}

/// Status of every known capability at one point in time.
pub type StatusSnapshot = Arc<HashMap<String, CapabilityStatus>>;

struct Inner {
    records: HashMap<String, CapabilityRecord>,
    subscribers: Vec<mpsc::UnboundedSender<StatusSnapshot>>,
}

impl Inner {
    fn snapshot(&self) -> StatusSnapshot {
        Arc::new(
            self.records
                .iter()
                .map(|(id, record)| (id.clone(), record.status))
                .collect(),
        )
    }

    fn broadcast(&mut self) {
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(&snapshot)).is_ok());
    }

    fn add_subscriber(&mut self) -> mpsc::UnboundedReceiver<StatusSnapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Replay the latest state before any future change.
        let _ = tx.send(self.snapshot());
        self.subscribers.push(tx);
        rx
    }
}

/// Process-wide readiness state. Construct once, share via `Arc`.
///
/// Writers: the readiness poller and explicit `set_status` callers.
/// Everyone else only reads or subscribes.
pub struct StatusStore {
    inner: Mutex<Inner>,
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: HashMap::new(),
                subscribers: Vec::new(),
            }),
        }
    }

    /// Set a capability's status and notify every subscriber.
    pub fn set_status(&self, capability_id: &str, status: CapabilityStatus) {
        let mut inner = self.inner.lock();
        let record = inner
            .records
            .entry(capability_id.to_string())
            .or_insert_with(|| CapabilityRecord::new(capability_id));
        let previous = record.status;
        record.status = status;
        record.updated_at = Utc::now();
        tracing::debug!(capability = capability_id, ?previous, ?status, "status changed");
        inner.broadcast();
    }

    /// Current status, `Unknown` if the capability was never seen.
    pub fn get_status(&self, capability_id: &str) -> CapabilityStatus {
        self.inner
            .lock()
            .records
            .get(capability_id)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    /// Record a route prefix for a capability. Returns false if already known.
    pub fn register_route(&self, capability_id: &str, route: &str) -> bool {
        let mut inner = self.inner.lock();
        let is_new = !inner.records.contains_key(capability_id);
        let record = inner
            .records
            .entry(capability_id.to_string())
            .or_insert_with(|| CapabilityRecord::new(capability_id));
        let added = record.known_routes.insert(route.to_string());
        // A brand new record is a visible change for map subscribers.
        if is_new {
            inner.broadcast();
        }
        added
    }

    pub fn record(&self, capability_id: &str) -> Option<CapabilityRecord> {
        self.inner.lock().records.get(capability_id).cloned()
    }

    /// All records, sorted by id.
    pub fn records(&self) -> Vec<CapabilityRecord> {
        let mut records: Vec<CapabilityRecord> =
            self.inner.lock().records.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.lock().snapshot()
    }

    /// Follow one capability. The current status is delivered first.
    pub fn subscribe(&self, capability_id: &str) -> StatusSubscription {
        let rx = self.inner.lock().add_subscriber();
        StatusSubscription {
            capability_id: capability_id.to_string(),
            rx,
            last: None,
        }
    }

    /// Follow the whole status map. The current snapshot is delivered first.
    pub fn subscribe_all(&self) -> StatusMapSubscription {
        StatusMapSubscription {
            rx: self.inner.lock().add_subscriber(),
        }
    }

    /// Number of live subscriptions.
    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Status changes of a single capability. Drop (or `unsubscribe`) to stop.
pub struct StatusSubscription {
    capability_id: String,
    rx: mpsc::UnboundedReceiver<StatusSnapshot>,
    last: Option<CapabilityStatus>,
}

impl StatusSubscription {
    pub fn capability_id(&self) -> &str {
        &self.capability_id
    }

    /// Filter a snapshot down to this capability, collapsing repeats.
    fn accept(&mut self, snapshot: &StatusSnapshot) -> Option<CapabilityStatus> {
        let status = snapshot
            .get(&self.capability_id)
            .copied()
            .unwrap_or_default();
        if self.last == Some(status) {
            return None;
        }
        self.last = Some(status);
        Some(status)
    }

    /// Wait for the next status. `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<CapabilityStatus> {
        loop {
            let snapshot = self.rx.recv().await?;
            if let Some(status) = self.accept(&snapshot) {
                return Some(status);
            }
        }
    }

    /// Next already-delivered status, without waiting.
    pub fn try_recv(&mut self) -> Option<CapabilityStatus> {
        while let Ok(snapshot) = self.rx.try_recv() {
            if let Some(status) = self.accept(&snapshot) {
                return Some(status);
            }
        }
        None
    }

    pub fn into_stream(mut self) -> impl Stream<Item = CapabilityStatus> {
        async_stream::stream! {
            while let Some(status) = self.recv().await {
                yield status;
            }
        }
    }

    pub fn unsubscribe(self) {}
}

/// Full status map on every write.
pub struct StatusMapSubscription {
    rx: mpsc::UnboundedReceiver<StatusSnapshot>,
}

impl StatusMapSubscription {
    pub async fn recv(&mut self) -> Option<StatusSnapshot> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<StatusSnapshot> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
