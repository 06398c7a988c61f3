use parking_lot::Mutex;

use crate::error::SinkError;
use crate::metrics::GroupKey;

/// Tracing target the report lines are logged under.
pub const PERFORMANCE_TARGET: &str = "performance";

/// Destination for rendered report lines.
pub trait LogSink: Send + Sync {
    fn write_lines(&self, group: &GroupKey, lines: &[String]) -> Result<(), SinkError>;
}

/// Logs every line at `info` on the `performance` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_lines(&self, _group: &GroupKey, lines: &[String]) -> Result<(), SinkError> {
        for line in lines {
            tracing::info!(target: PERFORMANCE_TARGET, "{line}");
        }
        Ok(())
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Drain what has been written so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

impl LogSink for MemorySink {
    fn write_lines(&self, _group: &GroupKey, lines: &[String]) -> Result<(), SinkError> {
        self.lines.lock().extend_from_slice(lines);
        Ok(())
    }
}
