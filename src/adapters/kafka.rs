// Jaskier Shared Pattern — adapters::kafka
//! Kafka adapter: a single `FutureProducer` plus topic metadata for the
//! `/api/kafka/topics` route.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::FutureProducer;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::async_primitives::WorkerPool;
use crate::config::KafkaConfig;

use super::{connected_map, Adapter, AdapterError};

const BACKEND: &str = "kafka";

pub struct KafkaAdapter {
    brokers: String,
    producer: RwLock<Option<FutureProducer>>,
    connected: std::sync::atomic::AtomicBool,
    pool: Arc<WorkerPool>,
}

impl KafkaAdapter {
    pub fn new(cfg: &KafkaConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        Some(Self {
            brokers: cfg.brokers.clone(),
            producer: RwLock::new(None),
            connected: std::sync::atomic::AtomicBool::new(false),
            pool: WorkerPool::new(super::pool_size::KAFKA),
        })
    }

    /// Topic metadata as seen by the producer's client, bounded by the
    /// broker's own metadata-fetch timeout.
    pub async fn topics(&self) -> Result<Vec<String>, AdapterError> {
        let guard = self.producer.read().await;
        let producer = guard.as_ref().ok_or(AdapterError::Connect {
            backend: BACKEND,
            source: "not initialized".to_string(),
        })?;
        let client = producer.client();
        let metadata = client
            .fetch_metadata(None, Duration::from_secs(5))
            .map_err(|e| AdapterError::Operation {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        Ok(metadata
            .topics()
            .iter()
            .map(|t| t.name().to_string())
            .collect())
    }

    pub async fn produce(&self, topic: &str, payload: &str) -> Result<(), AdapterError> {
        let guard = self.producer.read().await;
        let producer = guard.as_ref().ok_or(AdapterError::Connect {
            backend: BACKEND,
            source: "not initialized".to_string(),
        })?;
        let record = rdkafka::producer::FutureRecord::to(topic)
            .payload(payload)
            .key("");
        producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| AdapterError::Operation {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        Ok(())
    }

    pub async fn status_detail(&self) -> Value {
        let base = self.status().await;
        let connected = base
            .get("connected")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        json!({ "connected": connected, "brokers": self.brokers })
    }
}

#[async_trait]
impl Adapter for KafkaAdapter {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn init(&self) -> Result<(), AdapterError> {
        self.pool.start().await;
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| AdapterError::Connect {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        *self.producer.write().await = Some(producer);
        self.connected.store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    async fn close(&self) -> Result<(), AdapterError> {
        self.pool.close().await;
        self.producer.write().await.take();
        self.connected.store(false, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    async fn status(&self) -> HashMap<String, Value> {
        connected_map(self.connected.load(std::sync::atomic::Ordering::Acquire))
    }
}
