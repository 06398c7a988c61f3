use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::metrics::{GroupKey, LabelTuple, MetricGroup};

use super::delta::{DeltaComputer, MetricRow};
use super::selector::{DefaultPrefix, GroupSelector, MostCommonNameSelector, PrefixStrategy};
use super::sink::LogSink;
use super::store::SnapshotStore;
use super::table::TableRenderer;

/// What one group printed this cycle.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub group: GroupKey,
    pub prefix: String,
    pub rows: Vec<MetricRow>,
    #[serde(skip)]
    pub lines: Vec<String>,
}

/// Result of one reporting cycle.
#[derive(Debug)]
pub struct CycleOutcome {
    /// Baseline for the next cycle.  Replaces the previous store outright.
    pub store: SnapshotStore,
    pub reports: Vec<GroupReport>,
    pub diagnostics: Vec<ReportError>,
}

impl CycleOutcome {
    /// Every line handed to the sink, in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.reports.iter().flat_map(|r| r.lines.iter().map(String::as_str))
    }
}

/// Runs select → compute → render → write for every chosen group.
///
/// The driver holds no state between cycles: the caller passes the previous
/// store in and keeps the returned one.  Calls must not overlap for the same
/// store, the last returned store wins.
pub struct ReportDriver {
    selector: Box<dyn GroupSelector>,
    prefix: Box<dyn PrefixStrategy>,
    sink: Arc<dyn LogSink>,
    computer: DeltaComputer,
    renderer: TableRenderer,
}

impl ReportDriver {
    pub fn new(config: ReportConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            selector: Box::new(MostCommonNameSelector),
            prefix: Box::new(DefaultPrefix),
            sink,
            computer: DeltaComputer::new(config),
            renderer: TableRenderer,
        }
    }

    pub fn with_selector(mut self, selector: impl GroupSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn with_prefix(mut self, prefix: impl PrefixStrategy + 'static) -> Self {
        self.prefix = Box::new(prefix);
        self
    }

    #[tracing::instrument(name = "report_cycle", skip_all, fields(known_groups = all.len()))]
    pub fn run_cycle(&self, all: &[Arc<MetricGroup>], previous: &SnapshotStore) -> CycleOutcome {
        let chosen = match self.selector.choose_groups(all) {
            Ok(chosen) => chosen,
            Err(err) => {
                tracing::warn!(error = %err, "skipping report cycle");
                return CycleOutcome {
                    store: previous.clone(),
                    reports: Vec::new(),
                    diagnostics: vec![err],
                };
            }
        };

        let mut cumulative = HashMap::with_capacity(chosen.len());
        let mut reports = Vec::with_capacity(chosen.len());
        let mut diagnostics = Vec::new();

        for group in &chosen {
            let key = group.key().clone();
            let prefix = self.prefix.prefix(group);

            let delta = self.computer.compute(group, previous);
            let table = self.renderer.render(&key, &prefix, &delta.rows);

            // Rows the renderer refused are not part of the report either
            let refused: HashSet<LabelTuple> = table
                .diagnostics
                .iter()
                .filter_map(|err| match err {
                    ReportError::Format { labels, .. } => Some(labels.clone()),
                    _ => None,
                })
                .collect();
            let rows = delta
                .rows
                .into_iter()
                .filter(|row| !refused.contains(&row.labels))
                .collect();

            diagnostics.extend(delta.diagnostics);
            diagnostics.extend(table.diagnostics);

            if let Err(source) = self.sink.write_lines(&key, &table.lines) {
                diagnostics.push(ReportError::Sink {
                    group: key.clone(),
                    source,
                });
            }

            // Published even when the sink failed; lost lines are not replayed
            cumulative.insert(key.clone(), delta.cumulative);
            reports.push(GroupReport {
                group: key,
                prefix,
                rows,
                lines: table.lines,
            });
        }

        for err in &diagnostics {
            tracing::warn!(error = %err, "incomplete performance report");
        }
        tracing::debug!(
            groups = reports.len(),
            diagnostics = diagnostics.len(),
            "report cycle finished"
        );

        CycleOutcome {
            store: SnapshotStore::from_groups(cumulative, Instant::now()),
            reports,
            diagnostics,
        }
    }
}
