// Jaskier Shared Pattern — adapters::redis
//! Redis adapter: a single `ConnectionManager` behind the common contract,
//! plus the scan/get operations the control plane's `/api/redis/*` routes
//! need.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::async_primitives::WorkerPool;
use crate::config::RedisConfig;

use super::{connected_map, Adapter, AdapterError};

const BACKEND: &str = "redis";
const SCAN_LIMIT: usize = 100;

pub struct RedisAdapter {
    url: String,
    manager: RwLock<Option<redis::aio::ConnectionManager>>,
    connected: std::sync::atomic::AtomicBool,
    pool: Arc<WorkerPool>,
}

impl RedisAdapter {
    /// Returns `None` when disabled — construction itself never fails.
    pub fn new(cfg: &RedisConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        Some(Self {
            url: cfg.url.clone(),
            manager: RwLock::new(None),
            connected: std::sync::atomic::AtomicBool::new(false),
            pool: WorkerPool::new(super::pool_size::REDIS),
        })
    }

    async fn conn(&self) -> Result<redis::aio::ConnectionManager, AdapterError> {
        self.manager
            .read()
            .await
            .clone()
            .ok_or(AdapterError::Connect {
                backend: BACKEND,
                source: "not initialized".to_string(),
            })
    }

    /// `SCAN`-based key listing, capped at [`SCAN_LIMIT`] regardless of how
    /// many keys match `pattern`.
    pub async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, AdapterError> {
        let mut conn = self.conn().await?;
        let mut iter: redis::AsyncIter<String> = conn
            .scan_match(pattern)
            .await
            .map_err(|e| AdapterError::Operation {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        let mut keys = Vec::with_capacity(SCAN_LIMIT);
        while keys.len() < SCAN_LIMIT {
            match futures_util::StreamExt::next(&mut iter).await {
                Some(k) => keys.push(k),
                None => break,
            }
        }
        Ok(keys)
    }

    pub async fn get_key(&self, key: &str) -> Result<Option<String>, AdapterError> {
        let mut conn = self.conn().await?;
        conn.get(key).await.map_err(|e| AdapterError::Operation {
            backend: BACKEND,
            source: e.to_string(),
        })
    }
}

#[async_trait]
impl Adapter for RedisAdapter {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn init(&self) -> Result<(), AdapterError> {
        self.pool.start().await;
        let client = redis::Client::open(self.url.clone()).map_err(|e| AdapterError::Connect {
            backend: BACKEND,
            source: e.to_string(),
        })?;
        let manager =
            redis::aio::ConnectionManager::new(client)
                .await
                .map_err(|e| AdapterError::Connect {
                    backend: BACKEND,
                    source: e.to_string(),
                })?;
        *self.manager.write().await = Some(manager);
        self.connected.store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.pool.close().await;
        self.manager.write().await.take();
        self.connected.store(false, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    async fn status(&self) -> HashMap<String, Value> {
        connected_map(self.connected.load(std::sync::atomic::Ordering::Acquire))
    }
}
