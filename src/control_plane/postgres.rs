// Jaskier Shared Pattern — control_plane::postgres
//! `/api/postgres/*`: per-connection metadata, live `pg_stat_activity`,
//! and ad-hoc query execution. `connection` defaults to the connection
//! set's default (first enabled entry by declaration order) when the
//! query param is omitted.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::adapters::postgres::PostgresConn;
use crate::adapters::ConnectionSet;
use crate::envelope::{ApiError, ApiResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectionQuery {
    connection: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    sql: String,
}

fn resolve<'a>(
    state: &'a AppState,
    connection: &Option<String>,
) -> Result<&'a PostgresConn, ApiError> {
    let set = state
        .adapters
        .postgres
        .as_deref()
        .ok_or_else(|| ApiError::adapter("postgres is not enabled"))?;
    let conn = match connection {
        Some(name) => set.get(name),
        None => set.default_conn(),
    };
    conn.ok_or_else(|| ApiError::not_found("no such postgres connection"))
}

pub async fn info(
    State(state): State<AppState>,
    Query(query): Query<ConnectionQuery>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let conn = resolve(&state, &query.connection)?;
    let info = conn.info().await.map_err(|e| ApiError::adapter(e.to_string()))?;
    Ok(Json(ApiResponse::success(info)))
}

pub async fn active_queries(
    State(state): State<AppState>,
    Query(query): Query<ConnectionQuery>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let conn = resolve(&state, &query.connection)?;
    let rows = conn.active_queries().await.map_err(|e| ApiError::adapter(e.to_string()))?;
    Ok(Json(ApiResponse::success(json!(rows))))
}

/// Runs the operator-supplied statement and reflects its result columns
/// generically; an empty result set serializes as `[]`, never `null`.
pub async fn run_query(
    State(state): State<AppState>,
    Query(query): Query<ConnectionQuery>,
    Json(body): Json<QueryBody>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let conn = resolve(&state, &query.connection)?;
    state
        .audit
        .record("postgres_query", json!({ "sql": body.sql }), None)
        .await;
    let rows = conn
        .run_query(&body.sql)
        .await
        .map_err(|e| ApiError::adapter(e.to_string()))?;
    Ok(Json(ApiResponse::success(json!(rows))))
}
