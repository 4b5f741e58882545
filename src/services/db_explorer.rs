// Jaskier Shared Pattern — services::db_explorer
//! A dependent demo service: declares `Dependencies: ["postgres"]`, so
//! the registrar only constructs it once Postgres's `InitState` is
//! terminal — success or failure. If Postgres never became available,
//! `enabled()` returns false and its routes are never booted.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::adapters::postgres::PostgresConnectionSet;
use crate::adapters::{Adapter, ConnectionSet};
use crate::envelope::{ApiError, ApiResponse};
use crate::registry::Service;
use crate::state::AppState;

pub struct DbExplorerService {
    postgres: Option<Arc<PostgresConnectionSet>>,
}

impl DbExplorerService {
    pub fn new(postgres: Option<Arc<PostgresConnectionSet>>) -> Self {
        Self { postgres }
    }
}

impl Service for DbExplorerService {
    fn name(&self) -> &'static str {
        "db_explorer"
    }

    /// True only if the default Postgres connection is actually live —
    /// NOT merely whether config enabled it. `self.postgres` is `Some` as
    /// soon as Postgres is enrolled, before `Init` runs and even if `Init`
    /// later fails, so presence alone isn't enough; the connection's own
    /// `connected` flag is the real signal.
    fn enabled(&self) -> bool {
        self.postgres
            .as_ref()
            .and_then(|set| set.default_conn())
            .map(|conn| conn.is_connected())
            .unwrap_or(false)
    }

    fn endpoints(&self) -> Vec<String> {
        vec!["/tables".to_string()]
    }

    fn register_routes(&self, router: Router<AppState>) -> Router<AppState> {
        router.route("/tables", get(list_tables))
    }
}

async fn list_tables(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, ApiError> {
    let set = state
        .adapters
        .postgres
        .as_ref()
        .ok_or_else(|| ApiError::adapter("postgres connection set unavailable"))?;
    let conn = set
        .default_conn()
        .ok_or_else(|| ApiError::adapter("no default postgres connection"))?;
    let rows = conn
        .run_query(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'public' ORDER BY table_name",
        )
        .await
        .map_err(|e| ApiError::adapter(e.to_string()))?;
    Ok(Json(ApiResponse::success(rows)))
}
