use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use parking_lot::Mutex;

use super::percentiles::HistogramSnapshot;

// ─── Configuration ───────────────────────────────────────────────

/// HdrHistogram range: 1 μs → 60 s, 3 significant figures
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 60_000_000;
const HIST_SIGFIG: u8 = 3;

/// Percentiles are computed over roughly the last two minutes of samples.
const WINDOW_EXPIRY: Duration = Duration::from_secs(120);
const WINDOW_BUFFERS: usize = 3;

// ─── Public types ────────────────────────────────────────────────

/// Latency accumulator for one timeseries.
///
/// The sample count is cumulative for the lifetime of the timer, the
/// percentiles are drawn from a rotating time window.
pub struct LatencyTimer {
    count: AtomicU64,
    window: Mutex<TimeWindow>,
}

impl LatencyTimer {
    pub fn new() -> Self {
        Self::with_window(WINDOW_EXPIRY, WINDOW_BUFFERS)
    }

    pub fn with_window(expiry: Duration, buffers: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            window: Mutex::new(TimeWindow::new(expiry, buffers, Instant::now())),
        }
    }

    /// Record one operation latency.
    pub fn record(&self, latency: Duration) {
        self.record_at(latency, Instant::now());
    }

    /// Total samples recorded since creation.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Cumulative count plus the reported quantiles of the current window.
    pub fn take_snapshot(&self) -> HistogramSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub(crate) fn record_at(&self, latency: Duration, now: Instant) {
        // Clamp into the histogram's trackable range
        let us = (latency.as_micros() as u64).clamp(HIST_LOW, HIST_HIGH);
        self.window.lock().record(us, now);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot_at(&self, now: Instant) -> HistogramSnapshot {
        let mut window = self.window.lock();
        window.rotate(now);
        HistogramSnapshot::from_histogram(self.count(), window.current())
    }
}

impl Default for LatencyTimer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Internal state ──────────────────────────────────────────────

/// Ring of histograms.  Every sample goes into all of them; the oldest one
/// is cleared and becomes the newest every `expiry / buffers`, so the
/// current buffer always covers between `expiry - step` and `expiry` of
/// history.
struct TimeWindow {
    ring: Vec<Histogram<u64>>,
    cursor: usize,
    step: Duration,
    last_rotation: Instant,
}

impl TimeWindow {
    fn new(expiry: Duration, buffers: usize, now: Instant) -> Self {
        let buffers = buffers.max(1);
        let ring = (0..buffers)
            .map(|_| {
                Histogram::<u64>::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
                    .expect("histogram creation")
            })
            .collect();
        Self {
            ring,
            cursor: 0,
            step: expiry / buffers as u32,
            last_rotation: now,
        }
    }

    fn record(&mut self, us: u64, now: Instant) {
        self.rotate(now);
        for hist in &mut self.ring {
            hist.saturating_record(us);
        }
    }

    fn current(&self) -> &Histogram<u64> {
        &self.ring[self.cursor]
    }

    fn rotate(&mut self, now: Instant) {
        if self.step.is_zero() {
            return;
        }
        let elapsed = now.saturating_duration_since(self.last_rotation).as_nanos();
        let step = self.step.as_nanos();
        let due = elapsed / step;
        if due == 0 {
            return;
        }
        // After a full lap every buffer is empty, further steps change nothing
        for _ in 0..due.min(self.ring.len() as u128) {
            self.ring[self.cursor].reset();
            self.cursor = (self.cursor + 1) % self.ring.len();
        }
        // Stay on the step grid: the remainder is always shorter than one step
        self.last_rotation = now - Duration::from_nanos((elapsed % step) as u64);
    }
}
