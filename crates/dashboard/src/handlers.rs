//! Route handlers: embedded landing page, log snapshot, on-demand stats,
//! and the fire-and-forget patrol trigger.

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use hostwatch_sandbox::stats;
use serde_json::json;

use crate::state::AppState;

const ROOT_MOUNT: &str = "/";

pub async fn index() -> Html<&'static str> {
    Html("<html><body><h1>hostwatch</h1><p>see /api/logs, /api/stats, /api/trigger</p></body></html>")
}

pub async fn logs(State(state): State<AppState>) -> Json<serde_json::Value> {
    tracing::debug!("dashboard: GET /api/logs");
    let entries = state.ring.snapshot();
    tracing::debug!(entry_count = entries.len(), "dashboard: GET /api/logs done");
    Json(json!(entries))
}

pub async fn stats_endpoint() -> Json<serde_json::Value> {
    tracing::debug!("dashboard: GET /api/stats");
    let load = stats::load().await;
    let mem_pct = stats::mem_pct().await;
    let mem_used = stats::mem_used_mb().await;
    let mem_total = stats::mem_total_mb().await;
    let disk_pct = stats::disk_pct(ROOT_MOUNT).await;
    let disk_avail = stats::disk_avail(ROOT_MOUNT).await;

    tracing::debug!("dashboard: GET /api/stats done");
    Json(json!({
        "load": load,
        "mem_pct": mem_pct,
        "mem_used": mem_used,
        "mem_total": mem_total,
        "disk_pct": disk_pct,
        "disk_avail": disk_avail,
    }))
}

/// Spawns the patrol and status-report hooks in the background and returns
/// immediately — the HTTP response MUST NOT await the patrol cycle.
pub async fn trigger(State(state): State<AppState>) -> &'static str {
    tracing::debug!("dashboard: GET /api/trigger");
    let on_patrol = state.on_patrol.clone();
    let on_status_report = state.on_status_report.clone();

    tokio::spawn(async move {
        on_patrol().await;
    });
    tokio::spawn(async move {
        on_status_report().await;
    });

    tracing::debug!("dashboard: GET /api/trigger returning immediately");
    "triggered"
}
