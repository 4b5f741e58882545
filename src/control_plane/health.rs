// Jaskier Shared Pattern — control_plane::health
//! Liveness, readiness, and restart — the only endpoints that must work
//! even while adapters are still initializing.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::envelope::ApiResponse;
use crate::state::AppState;

/// `{status, server_ready:true, infrastructure: GetStatus(), initialization_progress}`
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    let infra = state.infra.get_status().await;
    let progress = state.infra.get_initialization_progress().await;

    Json(ApiResponse::success(json!({
        "status": "ok",
        "server_ready": true,
        "infrastructure": infra,
        "initialization_progress": progress,
    })))
}

pub async fn health_infrastructure(
    State(state): State<AppState>,
) -> Json<ApiResponse<serde_json::Value>> {
    let infra = state.infra.get_status().await;
    Json(ApiResponse::success(serde_json::to_value(infra).unwrap_or(serde_json::Value::Null)))
}

/// Schedules a hard-exit 500ms out so the response flushes before the
/// process actually dies.
pub async fn restart(State(state): State<AppState>) -> Json<ApiResponse<&'static str>> {
    state.audit.record("restart", json!({}), None).await;
    tracing::warn!("restart requested via control plane, exiting in 500ms");
    tokio::spawn(async {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        std::process::exit(1);
    });
    Json(ApiResponse::success("restarting"))
}
