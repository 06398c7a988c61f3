use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::LabelTuple;
use crate::AppState;

/// Metric group the HTTP layer reports under.
pub const HTTP_GROUP: &str = "http";
pub const HTTP_NAMESPACE: &str = "server";

/// Records every request into the `http`/`server` metric group:
///
///   labels       — `[METHOD, route]`, route being the matched pattern
///   concurrency  — requests in flight for that route
///   errors       — responses with a 5xx status
///
/// Also sets an `X-Response-Time-Us` header.
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let labels = LabelTuple::new([req.method().as_str().to_owned(), route]);
    let group = state.registry.group(HTTP_GROUP, HTTP_NAMESPACE);

    let in_flight = group.begin(&labels);
    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    drop(in_flight);

    group.observe(&labels, elapsed);
    if response.status().is_server_error() {
        group.record_error(&labels);
    }

    if let Ok(val) = elapsed.as_micros().to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    tracing::debug!(
        status = response.status().as_u16(),
        labels = %labels,
        us = elapsed.as_micros() as u64,
        "request"
    );

    response
}
