use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ReportError;
use crate::metrics::MetricGroup;

// ─── Strategies ──────────────────────────────────────────────────

/// Picks the groups to print this cycle, in print order.
pub trait GroupSelector: Send + Sync {
    fn choose_groups(&self, all: &[Arc<MetricGroup>]) -> Result<Vec<Arc<MetricGroup>>, ReportError>;
}

impl<T: GroupSelector + ?Sized> GroupSelector for Box<T> {
    fn choose_groups(&self, all: &[Arc<MetricGroup>]) -> Result<Vec<Arc<MetricGroup>>, ReportError> {
        (**self).choose_groups(all)
    }
}

/// Computes the `[<prefix>] - ` tag put in front of every line of a group.
pub trait PrefixStrategy: Send + Sync {
    fn prefix(&self, group: &MetricGroup) -> String;
}

/// `pref-<name>-<namespace>`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPrefix;

impl PrefixStrategy for DefaultPrefix {
    fn prefix(&self, group: &MetricGroup) -> String {
        format!("pref-{}-{}", group.name(), group.namespace())
    }
}

// ─── Implementations ─────────────────────────────────────────────

/// Reports the name shared by the most namespaces (smallest name wins a
/// tie), one table per namespace in namespace order.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostCommonNameSelector;

impl GroupSelector for MostCommonNameSelector {
    fn choose_groups(&self, all: &[Arc<MetricGroup>]) -> Result<Vec<Arc<MetricGroup>>, ReportError> {
        let mut by_name: BTreeMap<&str, Vec<&Arc<MetricGroup>>> = BTreeMap::new();
        for group in all {
            by_name.entry(group.name()).or_default().push(group);
        }

        // BTreeMap iterates names ascending; keep the first maximum
        let mut best: Option<Vec<&Arc<MetricGroup>>> = None;
        for groups in by_name.into_values() {
            if best.as_ref().map_or(true, |b| groups.len() > b.len()) {
                best = Some(groups);
            }
        }

        let mut chosen: Vec<_> = best.unwrap_or_default().into_iter().cloned().collect();
        chosen.sort_by(|a, b| a.namespace().cmp(b.namespace()));
        Ok(chosen)
    }
}

/// Every namespace of one named subsystem, in namespace order.
#[derive(Debug, Clone)]
pub struct NamedSelector {
    pub name: String,
}

impl NamedSelector {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl GroupSelector for NamedSelector {
    fn choose_groups(&self, all: &[Arc<MetricGroup>]) -> Result<Vec<Arc<MetricGroup>>, ReportError> {
        let mut chosen: Vec<_> = all.iter().filter(|g| g.name() == self.name).cloned().collect();
        chosen.sort_by(|a, b| a.namespace().cmp(b.namespace()));
        Ok(chosen)
    }
}

/// Every group, ordered by name then namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllGroupsSelector;

impl GroupSelector for AllGroupsSelector {
    fn choose_groups(&self, all: &[Arc<MetricGroup>]) -> Result<Vec<Arc<MetricGroup>>, ReportError> {
        let mut chosen = all.to_vec();
        chosen.sort_by(|a, b| a.key().cmp(b.key()));
        Ok(chosen)
    }
}
