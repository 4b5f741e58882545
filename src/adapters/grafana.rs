// Jaskier Shared Pattern — adapters::grafana
//! Grafana adapter: a cached HTTP health probe against the dashboard
//! tool's own `/api/health` endpoint, built on the same `reqwest::Client`
//! pooling settings the other adapters use.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::async_primitives::WorkerPool;
use crate::config::GrafanaConfig;

use super::{connected_map, Adapter, AdapterError};

const BACKEND: &str = "grafana";

pub struct GrafanaAdapter {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
    connected: std::sync::atomic::AtomicBool,
    pool: Arc<WorkerPool>,
    last_status: RwLock<Option<Value>>,
}

impl GrafanaAdapter {
    pub fn new(cfg: &GrafanaConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        Some(Self {
            base_url: cfg.url.clone(),
            api_key: cfg.api_key.clone(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("reqwest client builds"),
            connected: std::sync::atomic::AtomicBool::new(false),
            pool: WorkerPool::new(super::pool_size::GRAFANA),
            last_status: RwLock::new(None),
        })
    }

    async fn probe(&self) -> Result<Value, AdapterError> {
        let mut req = self.http.get(format!("{}/api/health", self.base_url));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| AdapterError::Connect {
            backend: BACKEND,
            source: e.to_string(),
        })?;
        resp.json::<Value>().await.map_err(|e| AdapterError::Operation {
            backend: BACKEND,
            source: e.to_string(),
        })
    }
}

#[async_trait]
impl Adapter for GrafanaAdapter {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn init(&self) -> Result<(), AdapterError> {
        self.pool.start().await;
        let body = self.probe().await?;
        *self.last_status.write().await = Some(body);
        self.connected.store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.pool.close().await;
        self.connected.store(false, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    async fn status(&self) -> HashMap<String, Value> {
        // Re-probe on each call: Grafana status is cheap and the spec only
        // requires the probe be bounded, not cached across calls.
        match self.probe().await {
            Ok(_) => {
                self.connected.store(true, std::sync::atomic::Ordering::Release);
                connected_map(true)
            }
            Err(_) => {
                self.connected.store(false, std::sync::atomic::Ordering::Release);
                connected_map(false)
            }
        }
    }
}
