// Jaskier Shared Pattern — adapters
//! The adapter contract every backend wrapper implements, plus the shared
//! error type and the worker-pool sizing table from the async-primitives
//! rationale.

pub mod cron;
pub mod grafana;
pub mod kafka;
pub mod minio;
pub mod mongo;
pub mod postgres;
pub mod redis;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

/// Errors surfaced by an adapter's `Init`/`Close`/operations. Distinct from
/// [`crate::envelope::ApiError`] — this is the adapter-local vocabulary;
/// handlers translate it into the envelope's `AdapterError` kind.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("{backend}: connection failed: {source}")]
    Connect { backend: &'static str, source: String },
    #[error("{backend}: operation failed: {source}")]
    Operation { backend: &'static str, source: String },
    #[error("{backend}: operation timed out")]
    Timeout { backend: &'static str },
    #[error("{backend}: operation cancelled")]
    Cancelled { backend: &'static str },
}

/// Typical fan-out per backend, from spec's WorkerPool rationale table.
/// Each adapter sizes its embedded `WorkerPool` from this constant rather
/// than a magic number scattered through its own file.
pub mod pool_size {
    pub const REDIS: usize = 10;
    pub const KAFKA: usize = 5;
    pub const MINIO: usize = 8;
    pub const POSTGRES: usize = 15;
    pub const MONGO: usize = 12;
    pub const CRON: usize = 5;
    pub const GRAFANA: usize = 5;
}

/// Every concrete backend wrapper implements this. `enabled=false` in config
/// means the adapter is never constructed at all — callers check for `None`
/// rather than calling `Init` on a disabled instance.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable name used in status maps, logs, and shutdown ordering.
    fn name(&self) -> &'static str;

    /// Establish the backend connection. Called once by `InfraInitManager`
    /// from a dedicated task; must not be called concurrently with itself.
    async fn init(&self) -> Result<(), AdapterError>;

    /// Release all resources. Idempotent: a second call after a successful
    /// close is a no-op, not an error.
    async fn close(&self) -> Result<(), AdapterError>;

    /// A bounded, non-blocking health probe. Must always return promptly —
    /// implementations cache the last ping result rather than reaching out
    /// on every call. Always carries at least `connected`.
    async fn status(&self) -> HashMap<String, Value>;
}

/// Capability set for adapters that fan out over several named connections
/// of the same backend (Postgres, Mongo). The default connection is the
/// first enabled entry in declaration order.
#[async_trait]
pub trait ConnectionSet: Send + Sync {
    type Conn: Adapter;

    fn get(&self, name: &str) -> Option<&Self::Conn>;
    fn default_conn(&self) -> Option<&Self::Conn>;
    fn all(&self) -> Vec<&Self::Conn>;
    async fn close_all(&self) -> Result<(), AdapterError>;
}

pub(crate) fn connected_map(connected: bool) -> HashMap<String, Value> {
    let mut m = HashMap::with_capacity(1);
    m.insert("connected".to_string(), Value::Bool(connected));
    m
}
