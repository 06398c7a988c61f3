use axum::{extract::State, Json};
use std::sync::Arc;

use crate::report::CycleSummary;
use crate::AppState;

use super::AppError;

// ─── GET /api/report ─────────────────────────────────────────────
/// Rows, prefixes and diagnostics of the last report cycle as JSON.

pub async fn get_report(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CycleSummary>, AppError> {
    let summary = state.reporter.last_cycle().ok_or(AppError::NoReport)?;
    Ok(Json(CycleSummary::clone(&summary)))
}

// ─── GET /api/report/text ────────────────────────────────────────
/// The last cycle's lines exactly as they went to the log.

pub async fn get_report_text(
    State(state): State<Arc<AppState>>,
) -> Result<String, AppError> {
    let summary = state.reporter.last_cycle().ok_or(AppError::NoReport)?;
    let mut text = summary.lines.join("\n");
    text.push('\n');
    Ok(text)
}
