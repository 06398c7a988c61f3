use thiserror::Error;

use crate::metrics::{GroupKey, LabelTuple};

/// Field of a report row, named the way the header shows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Max,
    Concurrent,
    Error,
    Count,
    P90,
    P99,
    P999,
    Qps,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Concurrent => "concurrent",
            Self::Error => "error",
            Self::Count => "count",
            Self::P90 => "p90",
            Self::P99 => "p99",
            Self::P999 => "p999",
            Self::Qps => "qps",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nothing here is fatal: every variant ends up as a diagnostic on the
/// cycle outcome and the cycle keeps going.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A row value cannot be shown in its column (non-finite, or wider than
    /// the column).  The row is dropped from the report.
    #[error("cannot format {field} for {labels} in group {group}: {value}")]
    Format {
        group: GroupKey,
        labels: LabelTuple,
        field: Field,
        value: String,
    },

    /// The group selector failed; nothing is reported this cycle.
    #[error("group selection failed: {0}")]
    Selector(String),

    /// The log sink rejected a group's lines.
    #[error("log sink failed for group {group}: {source}")]
    Sink {
        group: GroupKey,
        #[source]
        source: SinkError,
    },
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);
