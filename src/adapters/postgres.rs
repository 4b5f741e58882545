// Jaskier Shared Pattern — adapters::postgres
//! Postgres adapter: a single-connection variant and a named `ConnectionSet`
//! variant, both backed by `sqlx::PgPool`. Query execution reflects columns
//! generically rather than binding to a fixed row type, since
//! `/api/postgres/query` runs arbitrary operator-supplied SQL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Column, PgPool, Row, TypeInfo};
use tokio::sync::RwLock;

use crate::async_primitives::WorkerPool;
use crate::config::{PostgresConfig, PostgresConnSpec};

use super::{connected_map, Adapter, AdapterError, ConnectionSet};

const BACKEND: &str = "postgres";

pub struct PostgresConn {
    name: String,
    url: String,
    pool: RwLock<Option<PgPool>>,
    connected: std::sync::atomic::AtomicBool,
    worker_pool: Arc<WorkerPool>,
}

impl PostgresConn {
    fn new(name: String, url: String) -> Self {
        Self {
            name,
            url,
            pool: RwLock::new(None),
            connected: std::sync::atomic::AtomicBool::new(false),
            worker_pool: WorkerPool::new(super::pool_size::POSTGRES),
        }
    }

    pub fn connection_name(&self) -> &str {
        &self.name
    }

    /// Live connectivity flag, distinct from "was this connection enrolled
    /// in config" — set only once `init()` actually succeeds, cleared on
    /// `close()`. Dependent services consult this, not mere presence, to
    /// decide whether they're really usable.
    pub fn is_connected(&self) -> bool {
        self.connected.load(std::sync::atomic::Ordering::Acquire)
    }

    async fn pool(&self) -> Result<PgPool, AdapterError> {
        self.pool.read().await.clone().ok_or(AdapterError::Connect {
            backend: BACKEND,
            source: "not initialized".to_string(),
        })
    }

    /// `pg_stat_activity`, trimmed to fields the dashboard cares about.
    pub async fn active_queries(&self) -> Result<Vec<Value>, AdapterError> {
        let pool = self.pool().await?;
        let rows = sqlx::query(
            "SELECT pid, usename, state, query, query_start FROM pg_stat_activity \
             WHERE state IS NOT NULL ORDER BY query_start DESC LIMIT 100",
        )
        .fetch_all(&pool)
        .await
        .map_err(|e| AdapterError::Operation {
            backend: BACKEND,
            source: e.to_string(),
        })?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    pub async fn info(&self) -> Result<Value, AdapterError> {
        let pool = self.pool().await?;
        let version: (String,) = sqlx::query_as("SELECT version()")
            .fetch_one(&pool)
            .await
            .map_err(|e| AdapterError::Operation {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        Ok(json!({
            "connection": self.name,
            "version": version.0,
            "pool_size": pool.size(),
            "idle_connections": pool.num_idle(),
        }))
    }

    /// Runs an arbitrary statement and returns `[{col: value, ...}]`, always
    /// `[]` rather than `null` for an empty result set.
    pub async fn run_query(&self, sql: &str) -> Result<Vec<Value>, AdapterError> {
        let pool = self.pool().await?;
        let rows = sqlx::query(sql)
            .fetch_all(&pool)
            .await
            .map_err(|e| AdapterError::Operation {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Value {
    let mut obj = Map::new();
    for col in row.columns() {
        let name = col.name().to_string();
        let value = match col.type_info().name() {
            "INT4" | "INT2" => row
                .try_get::<i32, _>(col.ordinal())
                .map(|v| json!(v))
                .unwrap_or(Value::Null),
            "INT8" => row
                .try_get::<i64, _>(col.ordinal())
                .map(|v| json!(v))
                .unwrap_or(Value::Null),
            "FLOAT4" | "FLOAT8" | "NUMERIC" => row
                .try_get::<f64, _>(col.ordinal())
                .map(|v| json!(v))
                .unwrap_or(Value::Null),
            "BOOL" => row
                .try_get::<bool, _>(col.ordinal())
                .map(|v| json!(v))
                .unwrap_or(Value::Null),
            "TIMESTAMPTZ" | "TIMESTAMP" => row
                .try_get::<chrono::DateTime<chrono::Utc>, _>(col.ordinal())
                .map(|v| json!(v.to_rfc3339()))
                .unwrap_or(Value::Null),
            _ => row
                .try_get::<String, _>(col.ordinal())
                .map(Value::String)
                .unwrap_or(Value::Null),
        };
        obj.insert(name, value);
    }
    Value::Object(obj)
}

#[async_trait]
impl Adapter for PostgresConn {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn init(&self) -> Result<(), AdapterError> {
        self.worker_pool.start().await;
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&self.url)
            .await
            .map_err(|e| AdapterError::Connect {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        *self.pool.write().await = Some(pool);
        self.connected.store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.worker_pool.close().await;
        if let Some(pool) = self.pool.write().await.take() {
            pool.close().await;
        }
        self.connected.store(false, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    async fn status(&self) -> HashMap<String, Value> {
        connected_map(self.connected.load(std::sync::atomic::Ordering::Acquire))
    }
}

/// `enabled=false` → `None`. A `Single` config produces exactly one
/// connection named `"default"`; a `Multi` config produces one per entry,
/// the default being the first enabled entry in declaration order.
pub struct PostgresConnectionSet {
    conns: Vec<PostgresConn>,
    default_idx: Option<usize>,
}

impl PostgresConnectionSet {
    pub fn new(cfg: &PostgresConfig) -> Option<Self> {
        let specs: Vec<PostgresConnSpec> = cfg.connections();
        if specs.is_empty() {
            return None;
        }
        let conns: Vec<PostgresConn> = specs
            .iter()
            .map(|s| PostgresConn::new(s.name.clone(), s.url.clone()))
            .collect();
        let default_idx = specs.iter().position(|s| s.enabled);
        Some(Self { conns, default_idx })
    }

    pub async fn init_all(&self) -> Result<(), AdapterError> {
        for conn in &self.conns {
            conn.init().await?;
        }
        Ok(())
    }

    pub async fn status_by_name(&self) -> HashMap<String, HashMap<String, Value>> {
        let mut out = HashMap::with_capacity(self.conns.len());
        for conn in &self.conns {
            out.insert(conn.connection_name().to_string(), conn.status().await);
        }
        out
    }
}

#[async_trait]
impl ConnectionSet for PostgresConnectionSet {
    type Conn = PostgresConn;

    fn get(&self, name: &str) -> Option<&PostgresConn> {
        self.conns.iter().find(|c| c.connection_name() == name)
    }

    fn default_conn(&self) -> Option<&PostgresConn> {
        self.default_idx.and_then(|i| self.conns.get(i))
    }

    fn all(&self) -> Vec<&PostgresConn> {
        self.conns.iter().collect()
    }

    async fn close_all(&self) -> Result<(), AdapterError> {
        let mut first_err = None;
        for conn in &self.conns {
            if let Err(e) = conn.close().await {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
