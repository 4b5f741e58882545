// Jaskier Shared Pattern — infra_manager
//! Begins initialization of every enabled adapter without waiting for any
//! of them, tracks per-adapter progress, and exposes a global completion
//! signal the HTTP server can ignore entirely if it wants to.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{watch, RwLock};

use crate::adapters::{
    cron::CronAdapter, grafana::GrafanaAdapter, kafka::KafkaAdapter, minio::MinioAdapter,
    mongo::MongoConnectionSet, postgres::PostgresConnectionSet, redis::RedisAdapter, Adapter,
};
use crate::config::Config;

/// Per-adapter progress record. `Progress` is always 0 or 1 here — the
/// source's notion of fractional progress degenerates to a binary flag
/// since `Init` is a single opaque call, not a multi-step operation we can
/// observe partway through.
#[derive(Debug, Clone, Serialize)]
pub struct InitState {
    pub name: String,
    pub initialized: bool,
    pub error: Option<String>,
    #[serde(skip)]
    pub started_at: Instant,
    pub duration_ms: Option<u64>,
    pub progress: f64,
}

impl InitState {
    fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            initialized: false,
            error: None,
            started_at: Instant::now(),
            duration_ms: None,
            progress: 0.0,
        }
    }
}

/// Handles to every adapter the manager enrolled, regardless of whether
/// their `Init` has completed yet. `None` means disabled in config — the
/// server never blocks waiting to find that out.
pub struct AdapterHandles {
    pub redis: Option<Arc<RedisAdapter>>,
    pub kafka: Option<Arc<KafkaAdapter>>,
    pub postgres: Option<Arc<PostgresConnectionSet>>,
    pub mongo: Option<Arc<MongoConnectionSet>>,
    pub minio: Option<Arc<MinioAdapter>>,
    pub grafana: Option<Arc<GrafanaAdapter>>,
    pub cron: Option<Arc<CronAdapter>>,
}

pub struct InfraInitManager {
    states: RwLock<HashMap<String, InitState>>,
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
    enrolled: std::sync::atomic::AtomicUsize,
    completed: std::sync::atomic::AtomicUsize,
}

impl InfraInitManager {
    pub fn new() -> Arc<Self> {
        let (done_tx, done_rx) = watch::channel(false);
        Arc::new(Self {
            states: RwLock::new(HashMap::new()),
            done_tx,
            done_rx,
            enrolled: std::sync::atomic::AtomicUsize::new(0),
            completed: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    /// Constructs every adapter variant from `cfg` and spawns one task per
    /// enabled adapter to run its `Init`. The construction and enrollment
    /// bookkeeping here is itself fast and non-blocking on any backend;
    /// only the spawned tasks touch the network.
    pub async fn start_async_initialization(self: &Arc<Self>, cfg: &Config) -> AdapterHandles {
        let redis = RedisAdapter::new(&cfg.redis).map(Arc::new);
        let kafka = KafkaAdapter::new(&cfg.kafka).map(Arc::new);
        let postgres = PostgresConnectionSet::new(&cfg.postgres).map(Arc::new);
        let mongo = MongoConnectionSet::new(&cfg.mongo).map(Arc::new);
        let minio = MinioAdapter::new(&cfg.monitoring.minio).map(Arc::new);
        let grafana = GrafanaAdapter::new(&cfg.grafana).map(Arc::new);
        let cron = CronAdapter::new(&cfg.cron).map(Arc::new);

        match redis.clone() {
            Some(a) => self.enroll_single(a).await,
            None => self.enroll_disabled("redis").await,
        }
        match kafka.clone() {
            Some(a) => self.enroll_single(a).await,
            None => self.enroll_disabled("kafka").await,
        }
        match minio.clone() {
            Some(a) => self.enroll_single(a).await,
            None => self.enroll_disabled("minio").await,
        }
        match grafana.clone() {
            Some(a) => self.enroll_single(a).await,
            None => self.enroll_disabled("grafana").await,
        }
        match cron.clone() {
            Some(a) => self.enroll_single(a).await,
            None => self.enroll_disabled("cron").await,
        }
        match postgres.clone() {
            Some(set) => self.enroll_postgres(set).await,
            None => self.enroll_disabled("postgres").await,
        }
        match mongo.clone() {
            Some(set) => self.enroll_mongo(set).await,
            None => self.enroll_disabled("mongo").await,
        }

        AdapterHandles { redis, kafka, postgres, mongo, minio, grafana, cron }
    }

    /// Enrolls a synthetic, immediately-terminal state for an adapter that
    /// is disabled in config. Without this, a dependent service's waiter
    /// task would poll `is_terminal(name)` against a key that never
    /// appears, looping forever and hanging `RegisterAllServices` — the
    /// spec's §4.E step 2 partitioning ("deps already disabled in config")
    /// only works if disabled adapters resolve to a terminal state, not an
    /// absent one.
    async fn enroll_disabled(self: &Arc<Self>, name: &str) {
        let mut state = InitState::pending(name);
        state.error = Some("disabled".to_string());
        state.duration_ms = Some(0);
        self.states.write().await.insert(name.to_string(), state);
        self.enrolled.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let completed = self.completed.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        if completed >= self.enrolled.load(std::sync::atomic::Ordering::SeqCst) {
            let _ = self.done_tx.send(true);
        }
    }

    async fn enroll_single<A: Adapter + 'static>(self: &Arc<Self>, adapter: Arc<A>) {
        let name = adapter.name().to_string();
        self.states.write().await.insert(name.clone(), InitState::pending(&name));
        self.enrolled.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let result = adapter.init().await;
            manager.record_completion(&name, result.err().map(|e| e.to_string())).await;
        });
    }

    async fn enroll_postgres(self: &Arc<Self>, set: Arc<PostgresConnectionSet>) {
        let name = "postgres".to_string();
        self.states.write().await.insert(name.clone(), InitState::pending(&name));
        self.enrolled.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let result = set.init_all().await;
            manager.record_completion(&name, result.err().map(|e| e.to_string())).await;
        });
    }

    async fn enroll_mongo(self: &Arc<Self>, set: Arc<MongoConnectionSet>) {
        let name = "mongo".to_string();
        self.states.write().await.insert(name.clone(), InitState::pending(&name));
        self.enrolled.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let result = set.init_all().await;
            manager.record_completion(&name, result.err().map(|e| e.to_string())).await;
        });
    }

    async fn record_completion(&self, name: &str, error: Option<String>) {
        let mut states = self.states.write().await;
        if let Some(state) = states.get_mut(name) {
            state.initialized = error.is_none();
            state.error = error;
            state.duration_ms = Some(state.started_at.elapsed().as_millis() as u64);
            state.progress = if state.initialized { 1.0 } else { 0.0 };
        }
        drop(states);

        let completed = self.completed.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        if completed >= self.enrolled.load(std::sync::atomic::Ordering::SeqCst) {
            let _ = self.done_tx.send(true);
        }
    }

    pub async fn get_status(&self) -> HashMap<String, InitState> {
        self.states.read().await.clone()
    }

    pub async fn get_initialization_progress(&self) -> f64 {
        let states = self.states.read().await;
        if states.is_empty() {
            return 1.0;
        }
        states.values().map(|s| s.progress).sum::<f64>() / states.len() as f64
    }

    pub async fn is_initialized(&self, name: &str) -> bool {
        self.states
            .read()
            .await
            .get(name)
            .map(|s| s.initialized)
            .unwrap_or(false)
    }

    /// True once the named adapter has reached a terminal state (success
    /// or failure), regardless of outcome — distinct from
    /// `is_initialized`, which is false on terminal failure.
    pub async fn is_terminal(&self, name: &str) -> bool {
        self.states
            .read()
            .await
            .get(name)
            .map(|s| s.duration_ms.is_some())
            .unwrap_or(false)
    }

    /// Resolves once every enrolled adapter has reached a terminal state.
    pub async fn wait_done(&self) {
        let mut rx = self.done_rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }

    /// Bounded variant used by callers (e.g. the demo `/health` readiness
    /// check) that never want to hang if initialization somehow stalls.
    pub async fn wait_done_with_timeout(&self, d: Duration) -> bool {
        tokio::time::timeout(d, self.wait_done()).await.is_ok()
    }
}
