// Jaskier Shared Pattern — control_plane::kafka
//! `/api/kafka/topics`: topic metadata and producer state.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::envelope::{ApiError, ApiResponse};
use crate::state::AppState;

pub async fn topics(State(state): State<AppState>) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let adapter = state
        .adapters
        .kafka
        .as_deref()
        .ok_or_else(|| ApiError::adapter("kafka is not enabled"))?;

    let topics = adapter.topics().await.map_err(|e| ApiError::adapter(e.to_string()))?;
    let producer = adapter.status_detail().await;

    Ok(Json(ApiResponse::success(json!({ "topics": topics, "producer": producer }))))
}
