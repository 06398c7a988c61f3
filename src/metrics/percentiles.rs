use hdrhistogram::Histogram;
use serde::Serialize;

/// Quantiles every latency timer publishes.  The last one stands in for
/// "max" in the report.
pub const REPORTED_PERCENTILES: [f64; 4] = [0.9, 0.99, 0.999, 0.99999];

/// Histogram values are recorded in microseconds.
const MICROS_PER_MILLI: f64 = 1_000.0;

/// Latency value (ms) observed at one quantile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueAtPercentile {
    pub percentile: f64,
    pub value_ms: f64,
}

/// Point-in-time read of a latency timer.
///
/// `count` is cumulative since the timer was created; the percentile values
/// only cover the timer's recent window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub percentile_values: Vec<ValueAtPercentile>,
}

impl HistogramSnapshot {
    /// Extract the reported quantiles from an HdrHistogram holding µs values.
    /// Quantiles of an empty histogram read as zero.
    pub fn from_histogram(count: u64, hist: &Histogram<u64>) -> Self {
        let percentile_values = REPORTED_PERCENTILES
            .iter()
            .map(|&percentile| ValueAtPercentile {
                percentile,
                value_ms: if hist.is_empty() {
                    0.0
                } else {
                    hist.value_at_quantile(percentile) as f64 / MICROS_PER_MILLI
                },
            })
            .collect();

        Self {
            count,
            percentile_values,
        }
    }

    /// Value at exactly `percentile`, if the snapshot carries it.
    pub fn value_at(&self, percentile: f64) -> Option<f64> {
        self.percentile_values
            .iter()
            .find(|vp| vp.percentile == percentile)
            .map(|vp| vp.value_ms)
    }
}
