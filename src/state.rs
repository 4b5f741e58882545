// Jaskier Shared Pattern — state
//! Application state shared across every control-plane handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::credentials::CredentialRecord;
use crate::infra_manager::{AdapterHandles, InfraInitManager};
use crate::registry::Registry;
use crate::session::SessionManager;
use crate::telemetry::Broadcaster;

#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub cpu_usage_percent: f64,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub platform: String,
}

impl Default for SystemSnapshot {
    fn default() -> Self {
        Self {
            cpu_usage_percent: 0.0,
            memory_used_mb: 0,
            memory_total_mb: 0,
            platform: std::env::consts::OS.to_string(),
        }
    }
}

/// The single operator's editable profile — `/api/user/settings` and the
/// photo endpoints. Distinct from [`CredentialRecord`], which only holds
/// the login secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub photo_filename: Option<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self { display_name: String::new(), email: String::new(), photo_filename: None }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub adapters: Arc<AdapterHandles>,
    pub infra: Arc<InfraInitManager>,
    pub registry: Arc<Registry>,
    pub broadcaster: Arc<Broadcaster>,
    pub sessions: Arc<SessionManager>,
    pub credentials: Arc<RwLock<CredentialRecord>>,
    pub audit: Arc<AuditLog>,
    pub http_client: reqwest::Client,
    pub system_monitor: Arc<RwLock<SystemSnapshot>>,
    pub start_time: Instant,
    pub ready: Arc<AtomicBool>,
    pub dummy_log_enabled: Arc<AtomicBool>,
    pub user_profile: Arc<RwLock<UserProfile>>,
}

impl AppState {
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
