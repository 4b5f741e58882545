// Jaskier Shared Pattern — audit
//! Fire-and-forget audit trail for privileged mutations (config writes,
//! key rotation, password changes). An in-memory ring buffer rather
//! than a DB-backed insert — this repo has no
//! standing database requirement beyond what the adapters themselves
//! already provide, and the audit trail only needs to survive the
//! process lifetime (surfaced at `GET /api/logs/audit`).

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

const RING_CAPACITY: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub action: String,
    pub details: Value,
    pub ip: Option<String>,
    pub at: DateTime<Utc>,
}

pub struct AuditLog {
    entries: RwLock<VecDeque<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { entries: RwLock::new(VecDeque::with_capacity(RING_CAPACITY)) })
    }

    /// Records an entry. Never surfaces an error to the caller — an audit
    /// failure must not break the request that triggered it.
    pub async fn record(&self, action: &str, details: Value, ip: Option<&str>) {
        let mut entries = self.entries.write().await;
        if entries.len() == RING_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(AuditEntry {
            action: action.to_string(),
            details,
            ip: ip.map(str::to_string),
            at: Utc::now(),
        });
    }

    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }
}
