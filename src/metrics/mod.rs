pub mod collector;
pub mod percentiles;
pub mod timer;

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

pub use collector::{InFlight, MetricGroup, MetricsRegistry};
pub use percentiles::{HistogramSnapshot, ValueAtPercentile};
pub use timer::LatencyTimer;

/// Ordered label values identifying one timeseries inside a group,
/// e.g. `["http", "GET /api/report"]`.
///
/// Equality and hashing are by value, clones share the backing slice.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelTuple(Arc<[String]>);

impl LabelTuple {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Operation-level display tag: the second label, or `"unknown"`.
    pub fn tag(&self) -> &str {
        self.0.get(1).map(String::as_str).unwrap_or("unknown")
    }
}

impl fmt::Debug for LabelTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for LabelTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl Serialize for LabelTuple {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for LabelTuple {
    fn from(labels: [S; N]) -> Self {
        Self::new(labels)
    }
}

/// Identity of a [`MetricGroup`]: its name plus namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    pub name: String,
    pub namespace: String,
}

impl GroupKey {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.namespace)
    }
}
