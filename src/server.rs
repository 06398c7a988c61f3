use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the introspection `Router`.  Every request is itself recorded
/// into the `http`/`server` metric group.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Report ──────────────────────────────────────────────
        .route("/api/report", get(handlers::report::get_report))
        .route("/api/report/text", get(handlers::report::get_report_text))
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        .layer(CorsLayer::permissive())
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::ReportConfig;
    use crate::metrics::{GroupKey, LabelTuple, MetricsRegistry};
    use crate::middleware::timing::{HTTP_GROUP, HTTP_NAMESPACE};
    use crate::report::{AllGroupsSelector, MemorySink, ReportDriver, ScheduledReporter};

    fn state() -> Arc<AppState> {
        let registry = Arc::new(MetricsRegistry::new());
        let driver = ReportDriver::new(ReportConfig::default(), Arc::new(MemorySink::new()))
            .with_selector(AllGroupsSelector);
        Arc::new(AppState {
            reporter: Arc::new(ScheduledReporter::new(registry.clone(), driver)),
            registry,
            load_running: Arc::new(AtomicBool::new(false)),
        })
    }

    async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, String) {
        let response = create_router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn report_is_not_found_before_the_first_cycle() {
        let state = state();
        let (status, body) = get(&state, "/api/report").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("No report"));
    }

    #[tokio::test]
    async fn requests_are_recorded_and_reported() {
        let state = state();
        get(&state, "/api/report/text").await;
        get(&state, "/api/report/text").await;

        let group = state.registry.group(HTTP_GROUP, HTTP_NAMESPACE);
        let labels = LabelTuple::from(["GET", "/api/report/text"]);
        assert_eq!(group.timer(&labels).count(), 2);
        assert_eq!(group.concurrency(&labels), Some(0));

        state.reporter.tick();
        let (status, text) = get(&state, "/api/report/text").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.starts_with("[pref-http-server] - "));
        assert!(text.contains("/api/report/text"));

        let (status, json) = get(&state, "/api/report").await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["reports"][0]["group"], serde_json::json!(GroupKey::new("http", "server")));
        assert_eq!(value["reports"][0]["rows"][0]["sample_delta"], 2);
    }
}
