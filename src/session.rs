// Jaskier Shared Pattern — session
//! Opaque session tokens and the manager holding them: `Create`/`Get`/
//! `Delete` plus an hourly reaper.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use tokio::sync::RwLock;

pub const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const REAP_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const SESSION_COOKIE_NAME: &str = "infraplane_session";

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { sessions: RwLock::new(HashMap::new()) })
    }

    /// Allocates 32 cryptographically-random bytes, base64url-encoded,
    /// and inserts the session under a write lock.
    pub async fn create(&self, username: &str) -> Session {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let id = URL_SAFE_NO_PAD.encode(bytes);
        let now = Utc::now();
        let session = Session {
            id: id.clone(),
            username: username.to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::from_std(SESSION_TTL).expect("TTL fits"),
        };
        self.sessions.write().await.insert(id, session.clone());
        session
    }

    /// Returns `None` if absent OR past `expires_at` — expiry is checked
    /// on every lookup, not only by the hourly reaper.
    pub async fn get(&self, id: &str) -> Option<Session> {
        let sessions = self.sessions.read().await;
        match sessions.get(id) {
            Some(s) if !s.is_expired() => Some(s.clone()),
            _ => None,
        }
    }

    pub async fn delete(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// Runs until the process shuts down; wakes hourly and removes every
    /// entry past its `expires_at` under the write lock.
    pub fn spawn_reaper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REAP_INTERVAL);
            loop {
                ticker.tick().await;
                let mut sessions = manager.sessions.write().await;
                let before = sessions.len();
                sessions.retain(|_, s| !s.is_expired());
                let removed = before - sessions.len();
                if removed > 0 {
                    tracing::info!(removed, "session reaper: expired sessions removed");
                }
            }
        })
    }
}
