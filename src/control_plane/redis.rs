// Jaskier Shared Pattern — control_plane::redis
//! `/api/redis/*`: bounded key scan and single-key fetch. Absent adapter
//! (disabled or not yet connected) surfaces as an `AdapterError`, not a
//! panic.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::envelope::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    #[serde(default = "default_pattern")]
    pattern: String,
}

fn default_pattern() -> String {
    "*".to_string()
}

fn redis_adapter(state: &AppState) -> Result<&crate::adapters::redis::RedisAdapter, ApiError> {
    state
        .adapters
        .redis
        .as_deref()
        .ok_or_else(|| ApiError::adapter("redis is not enabled"))
}

/// `SCAN`-based key listing, capped at 100 keys regardless of match count.
pub async fn list_keys(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let adapter = redis_adapter(&state)?;
    let keys = adapter
        .scan_keys(&query.pattern)
        .await
        .map_err(|e| ApiError::adapter(e.to_string()))?;
    let count = keys.len();
    Ok(Json(ApiResponse::success(json!({ "keys": keys, "count": count }))))
}

pub async fn get_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let adapter = redis_adapter(&state)?;
    let value = adapter
        .get_key(&key)
        .await
        .map_err(|e| ApiError::adapter(e.to_string()))?;
    match value {
        Some(v) => Ok(Json(ApiResponse::success(json!({ "key": key, "value": v })))),
        None => Err(ApiError::not_found(format!("key not found: {key}"))),
    }
}
