// Jaskier Shared Pattern — telemetry
//! A write sink that fans every record out to N bounded subscriber
//! channels, plugged into `tracing` as an additional `Layer` so both
//! stdout logging and `/api/logs` SSE subscribers see the same stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

const SUBSCRIBER_CAPACITY: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: String,
    pub time: DateTime<Utc>,
    pub message: String,
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
}

pub type SubscriberId = u64;

/// Fan-out write sink. `Write`'s lock only ever covers the subscriber map
/// and the attempt to send to each one — it is never held across a
/// subscriber's own processing of a record.
pub struct Broadcaster {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<LogRecord>>>,
    next_id: AtomicU64,
    ingest: mpsc::UnboundedSender<LogRecord>,
}

impl Broadcaster {
    /// Spawns a single background task draining an ordered ingest queue
    /// into `write`. Every producer (the tracing layer, any future
    /// side-channel writer) pushes onto this one queue instead of spawning
    /// its own task per record — a per-record `tokio::spawn` would let two
    /// records emitted back to back race across independently-scheduled
    /// tasks, with no guarantee the first emitted reaches subscribers
    /// first. A single FIFO drain preserves emission order.
    pub fn new() -> Arc<Self> {
        let (ingest_tx, mut ingest_rx) = mpsc::unbounded_channel::<LogRecord>();
        let broadcaster = Arc::new(Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            ingest: ingest_tx,
        });

        let worker = Arc::clone(&broadcaster);
        tokio::spawn(async move {
            while let Some(record) = ingest_rx.recv().await {
                worker.write(record).await;
            }
        });

        broadcaster
    }

    /// Registers a new subscriber with a bounded, drop-on-full channel.
    pub async fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<LogRecord>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers.write().await.insert(id, tx);
        (id, rx)
    }

    /// Idempotent: removing an already-removed id is a no-op.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().await.remove(&id);
    }

    /// Fans `record` out to every subscriber. A full channel drops the
    /// record for that subscriber only — this never blocks on a slow
    /// reader.
    pub async fn write(&self, record: LogRecord) {
        let subscribers = self.subscribers.read().await;
        for tx in subscribers.values() {
            let _ = tx.try_send(record.clone());
        }
    }

    /// Non-async enqueue for callers (the tracing layer's synchronous
    /// `on_event`) that can't await the fan-out directly. Ordering is
    /// preserved by the single background drain task spawned in `new`.
    pub fn write_blocking(&self, record: LogRecord) {
        let _ = self.ingest.send(record);
    }
}

/// A `tracing_subscriber::Layer` that turns every event into a
/// [`LogRecord`] and pushes it through the broadcaster. Installed
/// alongside — never instead of — the stdout/JSON fmt layer.
pub struct BroadcastLayer {
    broadcaster: Arc<Broadcaster>,
}

impl BroadcastLayer {
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self { broadcaster }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: HashMap<String, serde_json::Value>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(rendered));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::from(value));
    }
}

impl<S: Subscriber> Layer<S> for BroadcastLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let record = LogRecord {
            level: event.metadata().level().to_string().to_lowercase(),
            time: Utc::now(),
            message: collector.message,
            fields: collector.fields,
        };

        self.broadcaster.write_blocking(record);
    }
}
