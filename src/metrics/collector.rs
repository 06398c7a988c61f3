use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use super::timer::LatencyTimer;
use super::{GroupKey, LabelTuple};

// ─── Registry ────────────────────────────────────────────────────

/// Process-wide set of metric groups, keyed by (name, namespace).
#[derive(Default)]
pub struct MetricsRegistry {
    groups: DashMap<GroupKey, Arc<MetricGroup>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the group for `name`/`namespace`, creating it on first use.
    pub fn group(&self, name: &str, namespace: &str) -> Arc<MetricGroup> {
        let key = GroupKey::new(name, namespace);
        self.groups
            .entry(key.clone())
            .or_insert_with(|| Arc::new(MetricGroup::new(key)))
            .clone()
    }

    /// Point-in-time list of every registered group, in no particular order.
    pub fn groups(&self) -> Vec<Arc<MetricGroup>> {
        self.groups.iter().map(|e| e.value().clone()).collect()
    }
}

// ─── Metric group ────────────────────────────────────────────────

/// Errors, in-flight gauges and latency timers for one subsystem.
///
/// All three maps are keyed by the same label tuples, but a tuple only shows
/// up in a map once something was recorded there.  Every accessor is safe to
/// call while other threads are recording.
pub struct MetricGroup {
    key: GroupKey,
    errors: DashMap<LabelTuple, Arc<ErrorCounter>>,
    gauges: DashMap<LabelTuple, Arc<AtomicI64>>,
    timers: DashMap<LabelTuple, Arc<LatencyTimer>>,
}

impl MetricGroup {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            errors: DashMap::new(),
            gauges: DashMap::new(),
            timers: DashMap::new(),
        }
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    // ── Write side ──────────────────────────────────────────────

    /// Record one completed operation.
    pub fn observe(&self, labels: &LabelTuple, latency: Duration) {
        self.timer(labels).record(latency);
    }

    pub fn record_error(&self, labels: &LabelTuple) {
        self.add_errors(labels, 1.0);
    }

    pub fn add_errors(&self, labels: &LabelTuple, amount: f64) {
        self.errors
            .entry(labels.clone())
            .or_default()
            .clone()
            .add(amount);
    }

    /// Mark an operation as in flight until the returned guard drops.
    pub fn begin(&self, labels: &LabelTuple) -> InFlight {
        let gauge = self.gauges.entry(labels.clone()).or_default().clone();
        gauge.fetch_add(1, Ordering::Relaxed);
        InFlight { gauge }
    }

    /// Latency timer for `labels`, created on first use.
    pub fn timer(&self, labels: &LabelTuple) -> Arc<LatencyTimer> {
        self.timers.entry(labels.clone()).or_default().clone()
    }

    // ── Read side ───────────────────────────────────────────────
    //
    // Each method copies what it needs out of the map so no shard lock is
    // held while the caller works with the values.

    pub fn timers(&self) -> Vec<(LabelTuple, Arc<LatencyTimer>)> {
        self.timers
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn error_counts(&self) -> Vec<(LabelTuple, f64)> {
        self.errors
            .iter()
            .map(|e| (e.key().clone(), e.value().count()))
            .collect()
    }

    pub fn error_count(&self, labels: &LabelTuple) -> Option<f64> {
        self.errors.get(labels).map(|c| c.count())
    }

    pub fn concurrency(&self, labels: &LabelTuple) -> Option<i64> {
        self.gauges.get(labels).map(|g| g.load(Ordering::Relaxed))
    }
}

// ─── Primitives ──────────────────────────────────────────────────

/// Monotonic `f64` counter stored as raw bits.
#[derive(Default)]
struct ErrorCounter {
    bits: AtomicU64,
}

impl ErrorCounter {
    fn add(&self, amount: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + amount).to_bits())
            });
    }

    fn count(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Decrements the concurrency gauge it was taken from when dropped.
pub struct InFlight {
    gauge: Arc<AtomicI64>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.gauge.fetch_sub(1, Ordering::Relaxed);
    }
}
