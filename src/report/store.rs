use std::collections::HashMap;
use std::time::Instant;

use crate::metrics::{GroupKey, LabelTuple};

/// Cumulative values of one group at the end of a cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupCumulative {
    pub error_counts: HashMap<LabelTuple, f64>,
    pub sample_counts: HashMap<LabelTuple, u64>,
}

/// Previous-cycle baseline for delta computation.
///
/// Always built whole from the groups of one cycle and swapped in by the
/// caller.  Nothing is merged: a group or label tuple missing from a cycle
/// has no baseline in the next one.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    groups: HashMap<GroupKey, GroupCumulative>,
    captured_at: Option<Instant>,
}

impl SnapshotStore {
    /// Empty store, as seen by the very first cycle.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups(groups: HashMap<GroupKey, GroupCumulative>, captured_at: Instant) -> Self {
        Self {
            groups,
            captured_at: Some(captured_at),
        }
    }

    pub fn group(&self, key: &GroupKey) -> Option<&GroupCumulative> {
        self.groups.get(key)
    }

    pub fn contains_group(&self, key: &GroupKey) -> bool {
        self.groups.contains_key(key)
    }

    pub fn group_keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.keys()
    }

    /// Last cumulative error count, 0 when there is no baseline.
    pub fn error_count(&self, key: &GroupKey, labels: &LabelTuple) -> f64 {
        self.group(key)
            .and_then(|g| g.error_counts.get(labels))
            .copied()
            .unwrap_or(0.0)
    }

    /// Last cumulative sample count, 0 when there is no baseline.
    pub fn sample_count(&self, key: &GroupKey, labels: &LabelTuple) -> u64 {
        self.group(key)
            .and_then(|g| g.sample_counts.get(labels))
            .copied()
            .unwrap_or(0)
    }

    /// When the cycle that built this store finished; `None` before the
    /// first cycle.
    pub fn captured_at(&self) -> Option<Instant> {
        self.captured_at
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
