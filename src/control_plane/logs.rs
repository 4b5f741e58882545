// Jaskier Shared Pattern — control_plane::logs
//! SSE log/CPU streams plus the audit log and dummy-emitter toggle.

use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::State;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::stream;
use serde_json::json;

use crate::envelope::ApiResponse;
use crate::state::AppState;
use crate::telemetry::LogRecord;

/// Headers every SSE endpoint carries on top of axum's default
/// `Content-Type: text/event-stream`, per spec §6 wire format.
fn sse_headers() -> [(header::HeaderName, &'static str); 3] {
    [
        (header::CACHE_CONTROL, "no-cache"),
        (header::CONNECTION, "keep-alive"),
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    ]
}

/// Subscribes to the broadcaster and forwards `data: <record>` frames
/// until the client disconnects, at which point the subscriber is
/// unregistered.
pub async fn stream_logs(State(state): State<AppState>) -> impl IntoResponse {
    let (id, rx) = state.broadcaster.subscribe().await;
    let broadcaster = state.broadcaster.clone();

    let stream = stream::unfold((rx, broadcaster, id), |(mut rx, broadcaster, id)| async move {
        match rx.recv().await {
            Some(record) => {
                let event = Event::default().data(render(&record));
                Some((Ok::<_, Infallible>(event), (rx, broadcaster, id)))
            }
            None => {
                broadcaster.unsubscribe(id).await;
                None
            }
        }
    });

    (sse_headers(), Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn render(record: &LogRecord) -> String {
    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
}

/// Emits a CPU% sample roughly every second.
pub async fn stream_cpu(State(state): State<AppState>) -> impl IntoResponse {
    let stream = stream::unfold(state, |state| async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let snapshot = state.system_monitor.read().await;
        let event = Event::default().data(
            json!({ "cpu_usage_percent": snapshot.cpu_usage_percent }).to_string(),
        );
        drop(snapshot);
        Some((Ok::<_, Infallible>(event), state))
    });

    (sse_headers(), Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub async fn toggle_dummy(State(state): State<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    let enabled = !state.dummy_log_enabled.load(Ordering::Acquire);
    state.dummy_log_enabled.store(enabled, Ordering::Release);

    if enabled {
        spawn_dummy_emitter(state.clone());
    }

    Json(ApiResponse::success(json!({ "enabled": enabled })))
}

pub async fn dummy_status(State(state): State<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(json!({
        "enabled": state.dummy_log_enabled.load(Ordering::Acquire)
    })))
}

fn spawn_dummy_emitter(state: AppState) {
    tokio::spawn(async move {
        let mut tick = 0u64;
        while state.dummy_log_enabled.load(Ordering::Acquire) {
            tick += 1;
            tracing::info!(tick, "synthetic demo log entry");
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    });
}

pub async fn audit_log(State(state): State<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    let entries = state.audit.recent(100).await;
    Json(ApiResponse::success(serde_json::to_value(entries).unwrap_or(serde_json::Value::Null)))
}
