use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log to stdout at the level given by `RUST_LOG`, `info` when unset.
///
/// Report tables go through the `performance` target, so
/// `RUST_LOG=warn,performance=info` keeps only the tables and problems.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(env_filter)
        .init();
}
