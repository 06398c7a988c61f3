pub mod delta;
pub mod driver;
pub mod scheduled;
pub mod selector;
pub mod sink;
pub mod store;
pub mod table;

pub use delta::{DeltaComputer, GroupDelta, MetricRow};
pub use driver::{CycleOutcome, GroupReport, ReportDriver};
pub use scheduled::{CycleSummary, ScheduledReporter};
pub use selector::{
    AllGroupsSelector, DefaultPrefix, GroupSelector, MostCommonNameSelector, NamedSelector,
    PrefixStrategy,
};
pub use sink::{LogSink, MemorySink, TracingSink, PERFORMANCE_TARGET};
pub use store::{GroupCumulative, SnapshotStore};
pub use table::{RenderedTable, TableRenderer};
