use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::metrics::MetricsRegistry;

use super::driver::{GroupReport, ReportDriver};
use super::store::SnapshotStore;

/// Read-only view of the last finished cycle, served over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub generated_at: DateTime<Utc>,
    pub reports: Vec<GroupReport>,
    pub lines: Vec<String>,
    pub diagnostics: Vec<String>,
}

/// Owns the snapshot store between cycles and runs them one at a time.
pub struct ScheduledReporter {
    registry: Arc<MetricsRegistry>,
    driver: ReportDriver,
    store: ArcSwap<SnapshotStore>,
    last: ArcSwapOption<CycleSummary>,
    cycle_lock: Mutex<()>,
}

impl ScheduledReporter {
    pub fn new(registry: Arc<MetricsRegistry>, driver: ReportDriver) -> Self {
        Self {
            registry,
            driver,
            store: ArcSwap::from_pointee(SnapshotStore::new()),
            last: ArcSwapOption::empty(),
            cycle_lock: Mutex::new(()),
        }
    }

    /// Run one cycle and publish its store.  Concurrent callers queue up.
    pub fn tick(&self) -> Arc<CycleSummary> {
        let _guard = self.cycle_lock.lock();

        let previous = self.store.load_full();
        let groups = self.registry.groups();
        let outcome = self.driver.run_cycle(&groups, &previous);

        let summary = Arc::new(CycleSummary {
            generated_at: Utc::now(),
            lines: outcome.lines().map(str::to_owned).collect(),
            diagnostics: outcome.diagnostics.iter().map(ToString::to_string).collect(),
            reports: outcome.reports,
        });

        self.store.store(Arc::new(outcome.store));
        self.last.store(Some(summary.clone()));
        summary
    }

    /// Baseline the next cycle will diff against.
    pub fn store(&self) -> Arc<SnapshotStore> {
        self.store.load_full()
    }

    pub fn last_cycle(&self) -> Option<Arc<CycleSummary>> {
        self.last.load_full()
    }

    /// Tick every `period` until `shutdown` resolves.  The first report is
    /// written one full period after start.
    pub async fn run(self: Arc<Self>, period: Duration, shutdown: impl Future<Output = ()>) {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);
        tokio::pin!(shutdown);

        tracing::info!(period_secs = period.as_secs_f64(), "performance reporter started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(_) = ticks.next() => {
                    // The sink may block on I/O
                    let reporter = self.clone();
                    if let Err(err) = tokio::task::spawn_blocking(move || reporter.tick()).await {
                        tracing::error!(error = %err, "report cycle panicked");
                    }
                }
            }
        }
        tracing::info!("performance reporter stopped");
    }
}
