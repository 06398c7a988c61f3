use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub mod args;
pub mod config;
pub mod error;
pub mod handlers;
pub mod load_generator;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod report;
pub mod server;

pub use config::ReportConfig;
pub use error::{ReportError, SinkError};
pub use metrics::{GroupKey, LabelTuple, MetricGroup, MetricsRegistry};
pub use report::{ReportDriver, ScheduledReporter, SnapshotStore};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Every metric group in the process, including the HTTP layer's own.
    pub registry: Arc<MetricsRegistry>,

    /// Owns the report schedule and the last published cycle.
    pub reporter: Arc<ScheduledReporter>,

    /// Flag checked by every load-generator worker on each iteration.
    pub load_running: Arc<AtomicBool>,
}
