// Jaskier Shared Pattern — adapters::minio
//! MinIO/S3-compatible object-store adapter. Backs `monitoring.upload_dir`
//! overflow storage and the `storage` entry in `/api/status`.
//!
//! Unlike the other adapters this one has no grounded precedent elsewhere
//! in the corpus (see DESIGN.md); `aws-sdk-s3` is the conventional
//! idiomatic client for an S3-compatible endpoint like MinIO.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::async_primitives::WorkerPool;
use crate::config::MinioConfig;

use super::{connected_map, Adapter, AdapterError};

const BACKEND: &str = "storage";

pub struct MinioAdapter {
    endpoint: String,
    access_key: String,
    secret_key: String,
    bucket: String,
    client: RwLock<Option<Client>>,
    connected: std::sync::atomic::AtomicBool,
    pool: Arc<WorkerPool>,
}

impl MinioAdapter {
    pub fn new(cfg: &MinioConfig) -> Option<Self> {
        if !cfg.enabled {
            return None;
        }
        Some(Self {
            endpoint: cfg.endpoint.clone(),
            access_key: cfg.access_key.clone(),
            secret_key: cfg.secret_key.clone(),
            bucket: cfg.bucket.clone(),
            client: RwLock::new(None),
            connected: std::sync::atomic::AtomicBool::new(false),
            pool: WorkerPool::new(super::pool_size::MINIO),
        })
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

    pub async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<(), AdapterError> {
        let client = self.client().await?;
        client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(bytes.into())
            .send()
            .await
            .map_err(|e| AdapterError::Operation {
                backend: BACKEND,
                source: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl Adapter for MinioAdapter {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn init(&self) -> Result<(), AdapterError> {
        self.pool.start().await;
        let creds = Credentials::new(
            self.access_key.clone(),
            self.secret_key.clone(),
            None,
            None,
            "infraplane-config",
        );
        let config = aws_sdk_s3::Config::builder()
            .region(Region::new("us-east-1"))
            .endpoint_url(&self.endpoint)
            .credentials_provider(creds)
            .force_path_style(true)
            .build();
        let client = Client::from_conf(config);
        client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
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
