use std::str::FromStr;

use clap::Parser;

use crate::config::{NegativeDeltaPolicy, ReportConfig, ThroughputWindow, DEFAULT_INTERVAL_SECS};
use crate::report::{AllGroupsSelector, GroupSelector, MostCommonNameSelector, NamedSelector};

/// Command-line arguments for the `perf-printer` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "perf-printer", about = "Periodic performance tables from in-process metrics")]
pub struct Args {
    /// Seconds between reports
    #[arg(long, env = "PERF_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Address the introspection API binds to
    #[arg(long, env = "PERF_BIND", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Which groups to report: most-common, all, or name:<group name>
    #[arg(long, env = "PERF_SELECTOR", default_value = "most-common")]
    pub selector: SelectorArg,

    /// Throughput divisor: interval (the configured interval) or elapsed (real time between reports)
    #[arg(long, value_enum, default_value = "interval")]
    pub throughput: ThroughputArg,

    /// Negative deltas after a counter reset: pass-through or clamp
    #[arg(long, value_enum, default_value = "pass-through")]
    pub negative_deltas: NegativeDeltaArg,

    /// Synthetic load workers (0 disables the load generator)
    #[arg(long, env = "PERF_WORKERS", default_value_t = 4)]
    pub workers: u32,
}

impl Args {
    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            interval_secs: self.interval_secs,
            throughput: match self.throughput {
                ThroughputArg::Interval => ThroughputWindow::ConfiguredInterval,
                ThroughputArg::Elapsed => ThroughputWindow::Elapsed,
            },
            negative_deltas: match self.negative_deltas {
                NegativeDeltaArg::PassThrough => NegativeDeltaPolicy::PassThrough,
                NegativeDeltaArg::Clamp => NegativeDeltaPolicy::ClampToZero,
            },
        }
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum ThroughputArg {
    #[value(alias = "fixed")]
    Interval,
    Elapsed,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum NegativeDeltaArg {
    PassThrough,
    Clamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorArg {
    MostCommon,
    All,
    Named(String),
}

impl SelectorArg {
    pub fn build(&self) -> Box<dyn GroupSelector> {
        match self {
            Self::MostCommon => Box::new(MostCommonNameSelector),
            Self::All => Box::new(AllGroupsSelector),
            Self::Named(name) => Box::new(NamedSelector::new(name.clone())),
        }
    }
}

impl FromStr for SelectorArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "most-common" => Ok(Self::MostCommon),
            "all" => Ok(Self::All),
            _ => match s.strip_prefix("name:") {
                Some(name) if !name.is_empty() => Ok(Self::Named(name.to_string())),
                _ => Err(format!("unknown selector '{s}' (expected most-common, all or name:<group>)")),
            },
        }
    }
}
