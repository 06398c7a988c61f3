use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use perf_printer::args::Args;
use perf_printer::report::{ReportDriver, ScheduledReporter, TracingSink};
use perf_printer::{load_generator, logging, server, AppState, MetricsRegistry};

#[tokio::main]
async fn main() {
    logging::init();
    let args = Args::parse();
    let config = args.report_config();

    // ── 1. Registry + report engine ──────────────────────────────
    let registry = Arc::new(MetricsRegistry::new());
    let driver = ReportDriver::new(config.clone(), Arc::new(TracingSink))
        .with_selector(args.selector.build());
    let reporter = Arc::new(ScheduledReporter::new(registry.clone(), driver));

    // ── 2. Shared state ──────────────────────────────────────────
    let state = Arc::new(AppState {
        registry: registry.clone(),
        reporter: reporter.clone(),
        load_running: Arc::new(AtomicBool::new(args.workers > 0)),
    });

    // ── 3. Background tasks ──────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let report_task = {
        let mut rx = shutdown_rx.clone();
        tokio::spawn(reporter.run(config.interval(), async move {
            let _ = rx.changed().await;
        }))
    };

    let load_task = (args.workers > 0).then(|| {
        tokio::spawn(load_generator::run(
            state.load_running.clone(),
            registry.clone(),
            args.workers,
        ))
    });

    // ── 4. Bind & serve ──────────────────────────────────────────
    let listener = match tokio::net::TcpListener::bind(&args.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(bind = %args.bind, error = %err, "failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(
        bind = %args.bind,
        interval_secs = config.interval_secs,
        "report JSON → /api/report, text → /api/report/text"
    );

    let app = server::create_router(state.clone());
    let serve = axum::serve(listener, app).with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
    });
    if let Err(err) = serve.await {
        tracing::error!(error = %err, "server exited with error");
    }

    // ── 5. Stop background work ──────────────────────────────────
    state.load_running.store(false, Ordering::SeqCst);
    let _ = shutdown_tx.send(true);
    if let Some(task) = load_task {
        let _ = task.await;
    }
    let _ = report_task.await;
}
