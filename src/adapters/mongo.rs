// Jaskier Shared Pattern — adapters::mongo
//! Mongo adapter: single-connection and named-`ConnectionSet` variants,
//! mirroring the Postgres adapter's shape over `mongodb::Client`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Document};
use mongodb::Client;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::async_primitives::WorkerPool;
use crate::config::{MongoConfig, MongoConnSpec};

use super::{connected_map, Adapter, AdapterError, ConnectionSet};

const BACKEND: &str = "mongo";

pub struct MongoConn {
    name: String,
    uri: String,
    database: String,
    client: RwLock<Option<Client>>,
    connected: std::sync::atomic::AtomicBool,
    pool: Arc<WorkerPool>,
}

impl MongoConn {
    fn new(name: String, uri: String, database: String) -> Self {
        Self {
            name,
            uri,
            database,
            client: RwLock::new(None),
            connected: std::sync::atomic::AtomicBool::new(false),
            pool: WorkerPool::new(super::pool_size::MONGO),
        }
    }

    pub fn connection_name(&self) -> &str {
        &self.name
    }

    async fn client(&self) -> Result<Client, AdapterError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(AdapterError::Connect {
                backend: BACKEND,
                source: "not initialized".to_string(),
            })
    }

    pub async fn info(&self) -> Result<Value, AdapterError> {
        let client = self.client().await?;
        let stats = client
            .database(&self.database)
            .run_command(bson::doc! { "dbStats": 1 })
            .await
            .map_err(|e| AdapterError::Operation {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        Ok(bson_to_json(bson::Bson::Document(stats)))
    }

    /// Runs `Find` against `collection` with `query` as the filter,
    /// returning decoded documents.
    pub async fn query(
        &self,
        collection: &str,
        query: Document,
    ) -> Result<Vec<Value>, AdapterError> {
        let client = self.client().await?;
        let coll = client
            .database(&self.database)
            .collection::<Document>(collection);
        let mut cursor = coll
            .find(query)
            .await
            .map_err(|e| AdapterError::Operation {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        let mut out = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(|e| AdapterError::Operation {
            backend: BACKEND,
            source: e.to_string(),
        })? {
            out.push(bson_to_json(bson::Bson::Document(doc)));
        }
        Ok(out)
    }
}

fn bson_to_json(value: bson::Bson) -> Value {
    serde_json::to_value(value.into_relaxed_extjson()).unwrap_or(Value::Null)
}

#[async_trait]
impl Adapter for MongoConn {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn init(&self) -> Result<(), AdapterError> {
        self.pool.start().await;
        let client = Client::with_uri_str(&self.uri)
            .await
            .map_err(|e| AdapterError::Connect {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        client
            .database(&self.database)
            .run_command(bson::doc! { "ping": 1 })
            .await
            .map_err(|e| AdapterError::Connect {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        *self.client.write().await = Some(client);
        self.connected.store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.pool.close().await;
        self.client.write().await.take();
        self.connected.store(false, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    async fn status(&self) -> HashMap<String, Value> {
        connected_map(self.connected.load(std::sync::atomic::Ordering::Acquire))
    }
}

pub struct MongoConnectionSet {
    conns: Vec<MongoConn>,
    default_idx: Option<usize>,
}

impl MongoConnectionSet {
    pub fn new(cfg: &MongoConfig) -> Option<Self> {
        let specs: Vec<MongoConnSpec> = cfg.connections();
        if specs.is_empty() {
            return None;
        }
        let conns: Vec<MongoConn> = specs
            .iter()
            .map(|s| MongoConn::new(s.name.clone(), s.uri.clone(), s.database.clone()))
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
impl ConnectionSet for MongoConnectionSet {
    type Conn = MongoConn;

    fn get(&self, name: &str) -> Option<&MongoConn> {
        self.conns.iter().find(|c| c.connection_name() == name)
    }

    fn default_conn(&self) -> Option<&MongoConn> {
        self.default_idx.and_then(|i| self.conns.get(i))
    }

    fn all(&self) -> Vec<&MongoConn> {
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
