// Jaskier Shared Pattern — control_plane::mongo
//! `/api/mongo/*`: per-connection `dbStats` and ad-hoc `Find` execution,
//! mirroring the Postgres handlers' shape.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::adapters::mongo::MongoConn;
use crate::adapters::ConnectionSet;
use crate::envelope::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectionQuery {
    connection: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MongoQueryBody {
    collection: String,
    #[serde(default)]
    query: Value,
}

fn resolve<'a>(state: &'a AppState, connection: &Option<String>) -> Result<&'a MongoConn, ApiError> {
    let set = state
        .adapters
        .mongo
        .as_deref()
        .ok_or_else(|| ApiError::adapter("mongo is not enabled"))?;
    let conn = match connection {
        Some(name) => set.get(name),
        None => set.default_conn(),
    };
    conn.ok_or_else(|| ApiError::not_found("no such mongo connection"))
}

pub async fn info(
    State(state): State<AppState>,
    Query(query): Query<ConnectionQuery>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let conn = resolve(&state, &query.connection)?;
    let info = conn.info().await.map_err(|e| ApiError::adapter(e.to_string()))?;
    Ok(Json(ApiResponse::success(info)))
}

/// Body: `{collection, query:object}`. Executes `Find`, returns decoded
/// documents; empty result serializes as `[]`.
pub async fn run_query(
    State(state): State<AppState>,
    Query(query): Query<ConnectionQuery>,
    Json(body): Json<MongoQueryBody>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let conn = resolve(&state, &query.connection)?;
    let filter = mongodb::bson::to_document(&body.query)
        .map_err(|e| ApiError::validation(format!("invalid query filter: {e}")))?;

    state
        .audit
        .record(
            "mongo_query",
            json!({ "collection": body.collection, "query": body.query }),
            None,
        )
        .await;

    let docs = conn
        .query(&body.collection, filter)
        .await
        .map_err(|e| ApiError::adapter(e.to_string()))?;
    Ok(Json(ApiResponse::success(json!(docs))))
}
