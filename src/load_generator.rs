use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::{LabelTuple, MetricsRegistry};

/// Simulated operations: (group name, namespace, operation, mean latency ms, error rate).
const OPERATIONS: &[(&str, &str, &str, u64, f64)] = &[
    ("db", "primary", "selectUser", 4, 0.002),
    ("db", "primary", "updateUser", 9, 0.01),
    ("db", "replica", "selectUser", 3, 0.002),
    ("db", "replica", "listOrders", 15, 0.005),
    ("cache", "local", "get", 1, 0.0),
    ("cache", "local", "set", 1, 0.001),
];

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that record synthetic operations into
/// `registry` until `running` is set to false.
pub async fn run(running: Arc<AtomicBool>, registry: Arc<MetricsRegistry>, concurrency: u32) {
    let mut handles = Vec::with_capacity(concurrency as usize);

    for worker_id in 0..concurrency {
        let running = running.clone();
        let registry = registry.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, running, registry).await;
        }));
    }

    tracing::info!(workers = concurrency, "load generator started");

    // Wait for all workers to finish
    for h in handles {
        let _ = h.await;
    }

    tracing::info!("load generator stopped");
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(id: u32, running: Arc<AtomicBool>, registry: Arc<MetricsRegistry>) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);

    while running.load(Ordering::Relaxed) {
        let &(name, namespace, op, mean_ms, error_rate) =
            &OPERATIONS[rng.gen_range(0..OPERATIONS.len())];
        let group = registry.group(name, namespace);
        let labels = LabelTuple::new([name, op]);

        // Spread latency around the mean with an occasional slow outlier
        let mut latency_us = rng.gen_range(mean_ms * 500..=mean_ms * 1_500);
        if rng.gen_bool(0.01) {
            latency_us *= 10;
        }
        let latency = Duration::from_micros(latency_us);

        let in_flight = group.begin(&labels);
        tokio::time::sleep(latency).await;
        drop(in_flight);

        group.observe(&labels, latency);
        if rng.gen_bool(error_rate) {
            group.record_error(&labels);
        }
    }
}
