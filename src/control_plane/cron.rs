// Jaskier Shared Pattern — control_plane::cron
//! `/api/cron`: scheduled jobs with next/last run, plus an on-demand
//! trigger.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::envelope::{ApiError, ApiResponse};
use crate::state::AppState;

pub async fn list_jobs(State(state): State<AppState>) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let adapter = state
        .adapters
        .cron
        .as_deref()
        .ok_or_else(|| ApiError::adapter("cron is not enabled"))?;
    Ok(Json(ApiResponse::success(json!({ "jobs": adapter.list_jobs().await }))))
}

pub async fn run_now(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    let adapter = state
        .adapters
        .cron
        .as_deref()
        .ok_or_else(|| ApiError::adapter("cron is not enabled"))?;
    adapter.run_job_now(&name).await.map_err(|e| ApiError::adapter(e.to_string()))?;
    state.audit.record("cron_run_now", json!({ "job": name }), None).await;
    Ok(Json(ApiResponse::success("triggered")))
}
