use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cycle length, and the throughput divisor unless reconfigured.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// How throughput turns a sample delta into a per-second rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThroughputWindow {
    /// Divide by the configured interval regardless of real elapsed time.
    #[default]
    #[serde(alias = "fixed")]
    ConfiguredInterval,
    /// Divide by the wall time since the previous snapshot was captured.
    Elapsed,
}

/// What to do when a cumulative counter went backwards (external reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NegativeDeltaPolicy {
    /// Report the negative delta as is.
    #[default]
    PassThrough,
    ClampToZero,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Seconds between report cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default)]
    pub throughput: ThroughputWindow,

    #[serde(default)]
    pub negative_deltas: NegativeDeltaPolicy,
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            throughput: ThroughputWindow::default(),
            negative_deltas: NegativeDeltaPolicy::default(),
        }
    }
}

impl ReportConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}
