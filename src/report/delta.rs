use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

use crate::config::{NegativeDeltaPolicy, ReportConfig, ThroughputWindow};
use crate::error::{Field, ReportError};
use crate::metrics::{GroupKey, LabelTuple, MetricGroup};

use super::store::{GroupCumulative, SnapshotStore};

/// One line of the report, kept at full precision until rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub tag: String,
    pub labels: LabelTuple,
    pub max_ms: f64,
    pub concurrent: i64,
    pub error_delta: f64,
    pub sample_delta: i64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub p999_ms: f64,
    pub qps: f64,
}

/// Everything one group contributes to a cycle.
#[derive(Debug, Default)]
pub struct GroupDelta {
    /// Rows sorted by label tuple.
    pub rows: Vec<MetricRow>,
    /// Baseline for the next cycle.
    pub cumulative: GroupCumulative,
    /// Rows that were dropped, and why.
    pub diagnostics: Vec<ReportError>,
}

/// Turns cumulative registry values into per-cycle rows.
#[derive(Debug, Clone, Default)]
pub struct DeltaComputer {
    config: ReportConfig,
}

impl DeltaComputer {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn compute(&self, group: &MetricGroup, previous: &SnapshotStore) -> GroupDelta {
        self.compute_at(group, previous, Instant::now())
    }

    pub(crate) fn compute_at(&self, group: &MetricGroup, previous: &SnapshotStore, now: Instant) -> GroupDelta {
        let key = group.key();
        let window_secs = self.window_secs(previous, now);

        // Read the error counters once so the delta and the stored
        // baseline agree.
        let error_counts: HashMap<LabelTuple, f64> = group.error_counts().into_iter().collect();

        let mut timers = group.timers();
        timers.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = GroupDelta {
            cumulative: GroupCumulative {
                error_counts: error_counts.clone(),
                sample_counts: HashMap::with_capacity(timers.len()),
            },
            ..GroupDelta::default()
        };

        for (labels, timer) in timers {
            let snapshot = timer.take_snapshot();
            out.cumulative.sample_counts.insert(labels.clone(), snapshot.count);

            let error_delta = match error_counts.get(&labels) {
                Some(&now_errors) => self.apply_policy_f64(now_errors - previous.error_count(key, &labels)),
                None => 0.0,
            };
            let sample_delta = self.apply_policy_i64(
                snapshot.count as i64 - previous.sample_count(key, &labels) as i64,
            );

            let value = |percentile: f64| snapshot.value_at(percentile).unwrap_or(0.0);
            let row = MetricRow {
                tag: labels.tag().to_string(),
                max_ms: value(0.99999),
                concurrent: group.concurrency(&labels).unwrap_or(0),
                error_delta,
                sample_delta,
                p90_ms: value(0.9),
                p99_ms: value(0.99),
                p999_ms: value(0.999),
                qps: sample_delta as f64 / window_secs,
                labels,
            };

            match check_finite(key, &row) {
                Ok(()) => out.rows.push(row),
                Err(err) => out.diagnostics.push(err),
            }
        }

        out
    }

    /// Seconds the sample delta is spread over.
    fn window_secs(&self, previous: &SnapshotStore, now: Instant) -> f64 {
        let configured = self.config.interval().as_secs_f64();
        match self.config.throughput {
            ThroughputWindow::ConfiguredInterval => configured,
            ThroughputWindow::Elapsed => previous
                .captured_at()
                .map(|at| now.saturating_duration_since(at).as_secs_f64())
                .filter(|secs| *secs > 0.0)
                .unwrap_or(configured),
        }
    }

    fn apply_policy_f64(&self, delta: f64) -> f64 {
        match self.config.negative_deltas {
            NegativeDeltaPolicy::PassThrough => delta,
            NegativeDeltaPolicy::ClampToZero => delta.max(0.0),
        }
    }

    fn apply_policy_i64(&self, delta: i64) -> i64 {
        match self.config.negative_deltas {
            NegativeDeltaPolicy::PassThrough => delta,
            NegativeDeltaPolicy::ClampToZero => delta.max(0),
        }
    }
}

fn check_finite(group: &GroupKey, row: &MetricRow) -> Result<(), ReportError> {
    let fields = [
        (Field::Max, row.max_ms),
        (Field::Error, row.error_delta),
        (Field::P90, row.p90_ms),
        (Field::P99, row.p99_ms),
        (Field::P999, row.p999_ms),
        (Field::Qps, row.qps),
    ];
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some(&(field, value)) => Err(ReportError::Format {
            group: group.clone(),
            labels: row.labels.clone(),
            field,
            value: value.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn group() -> MetricGroup {
        MetricGroup::new(GroupKey::new("svc", "main"))
    }

    fn observe_n(group: &MetricGroup, labels: &LabelTuple, n: usize) {
        for _ in 0..n {
            group.observe(labels, Duration::from_millis(5));
        }
    }

    fn baseline(key: &GroupKey, labels: &LabelTuple, count: u64, errors: f64) -> SnapshotStore {
        let mut cumulative = GroupCumulative::default();
        cumulative.sample_counts.insert(labels.clone(), count);
        cumulative.error_counts.insert(labels.clone(), errors);
        SnapshotStore::from_groups(HashMap::from([(key.clone(), cumulative)]), Instant::now())
    }

    #[test]
    fn first_cycle_delta_is_the_full_count() {
        let g = group();
        let labels = LabelTuple::from(["svc", "getUser"]);
        observe_n(&g, &labels, 120);

        let delta = DeltaComputer::default().compute(&g, &SnapshotStore::new());
        assert_eq!(delta.rows.len(), 1);
        let row = &delta.rows[0];
        assert_eq!(row.tag, "getUser");
        assert_eq!(row.sample_delta, 120);
        assert_eq!(row.qps, 2.0);
        assert_eq!(delta.cumulative.sample_counts[&labels], 120);
    }

    #[test]
    fn delta_is_taken_against_the_baseline() {
        let g = group();
        let labels = LabelTuple::from(["svc", "getUser"]);
        observe_n(&g, &labels, 660);
        g.add_errors(&labels, 9.0);

        let previous = baseline(g.key(), &labels, 600, 4.0);
        let delta = DeltaComputer::default().compute(&g, &previous);
        let row = &delta.rows[0];
        assert_eq!(row.sample_delta, 60);
        assert_eq!(row.error_delta, 5.0);
        assert_eq!(row.qps, 1.0);
    }

    #[test]
    fn missing_error_counter_and_gauge_default_to_zero() {
        let g = group();
        let labels = LabelTuple::from(["svc", "getUser"]);
        observe_n(&g, &labels, 3);

        let delta = DeltaComputer::default().compute(&g, &SnapshotStore::new());
        let row = &delta.rows[0];
        assert_eq!(row.error_delta, 0.0);
        assert_eq!(row.concurrent, 0);
        assert!(delta.diagnostics.is_empty());
    }

    #[test]
    fn concurrency_is_the_current_gauge_level() {
        let g = group();
        let labels = LabelTuple::from(["svc", "getUser"]);
        observe_n(&g, &labels, 1);
        let _a = g.begin(&labels);
        let _b = g.begin(&labels);

        let delta = DeltaComputer::default().compute(&g, &SnapshotStore::new());
        assert_eq!(delta.rows[0].concurrent, 2);
    }

    #[test]
    fn only_timed_tuples_produce_rows_but_all_errors_are_kept() {
        let g = group();
        let timed = LabelTuple::from(["svc", "getUser"]);
        let errors_only = LabelTuple::from(["svc", "deleteUser"]);
        observe_n(&g, &timed, 1);
        g.record_error(&errors_only);
        let _gauge = g.begin(&LabelTuple::from(["svc", "listUsers"]));

        let delta = DeltaComputer::default().compute(&g, &SnapshotStore::new());
        assert_eq!(delta.rows.len(), 1);
        assert_eq!(delta.rows[0].labels, timed);
        assert_eq!(delta.cumulative.error_counts[&errors_only], 1.0);
        assert!(!delta.cumulative.sample_counts.contains_key(&errors_only));
    }

    #[test]
    fn short_label_tuple_is_tagged_unknown() {
        let g = group();
        observe_n(&g, &LabelTuple::from(["svc"]), 1);
        let delta = DeltaComputer::default().compute(&g, &SnapshotStore::new());
        assert_eq!(delta.rows[0].tag, "unknown");
    }

    #[test]
    fn negative_delta_passes_through_by_default() {
        let g = group();
        let labels = LabelTuple::from(["svc", "getUser"]);
        observe_n(&g, &labels, 10);
        let previous = baseline(g.key(), &labels, 50, 0.0);

        let delta = DeltaComputer::default().compute(&g, &previous);
        assert_eq!(delta.rows[0].sample_delta, -40);
    }

    #[test]
    fn negative_delta_can_be_clamped() {
        let g = group();
        let labels = LabelTuple::from(["svc", "getUser"]);
        observe_n(&g, &labels, 10);
        g.add_errors(&labels, 1.0);
        let previous = baseline(g.key(), &labels, 50, 7.0);

        let computer = DeltaComputer::new(ReportConfig {
            negative_deltas: NegativeDeltaPolicy::ClampToZero,
            ..ReportConfig::default()
        });
        let row = &computer.compute(&g, &previous).rows[0];
        assert_eq!(row.sample_delta, 0);
        assert_eq!(row.error_delta, 0.0);
        assert_eq!(row.qps, 0.0);
    }

    #[test]
    fn elapsed_window_divides_by_time_since_capture() {
        let g = group();
        let labels = LabelTuple::from(["svc", "getUser"]);
        observe_n(&g, &labels, 100);

        let captured = Instant::now();
        let previous = SnapshotStore::from_groups(HashMap::new(), captured);
        let computer = DeltaComputer::new(ReportConfig {
            throughput: ThroughputWindow::Elapsed,
            ..ReportConfig::default()
        });

        let delta = computer.compute_at(&g, &previous, captured + Duration::from_secs(20));
        assert_eq!(delta.rows[0].qps, 5.0);

        // No previous capture: fall back to the configured interval
        let delta = computer.compute_at(&g, &SnapshotStore::new(), captured);
        assert!((delta.rows[0].qps - 100.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_error_count_skips_the_row() {
        let g = group();
        let good = LabelTuple::from(["svc", "getUser"]);
        let bad = LabelTuple::from(["svc", "putUser"]);
        observe_n(&g, &good, 1);
        observe_n(&g, &bad, 1);
        g.add_errors(&bad, f64::NAN);

        let delta = DeltaComputer::default().compute(&g, &SnapshotStore::new());
        assert_eq!(delta.rows.len(), 1);
        assert_eq!(delta.rows[0].labels, good);
        assert_eq!(delta.diagnostics.len(), 1);
        match &delta.diagnostics[0] {
            ReportError::Format { group, labels, field, .. } => {
                assert_eq!(group, g.key());
                assert_eq!(labels, &bad);
                assert_eq!(*field, Field::Error);
            }
            other => panic!("unexpected diagnostic {other:?}"),
        }
        // The baseline still covers the skipped row
        assert_eq!(delta.cumulative.sample_counts[&bad], 1);
    }

    #[test]
    fn rows_are_sorted_by_labels() {
        let g = group();
        for op in ["c", "a", "b"] {
            observe_n(&g, &LabelTuple::from(["svc", op]), 1);
        }
        let delta = DeltaComputer::default().compute(&g, &SnapshotStore::new());
        let tags: Vec<_> = delta.rows.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, ["a", "b", "c"]);
    }
}
