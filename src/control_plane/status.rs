// Jaskier Shared Pattern — control_plane::status
//! `/api/status` aggregation: service catalog, per-backend connectivity,
//! external probes, and system stats.

use std::time::{Duration, Instant};

use axum::extract::State;
use axum::Json;
use futures_util::future::join_all;
use serde_json::{json, Value};

use crate::adapters::Adapter;
use crate::envelope::ApiResponse;
use crate::registry::prefixed_endpoints;
use crate::state::AppState;

const EXTERNAL_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let services = join_all(state.registry.get_services().await.iter().map(|svc| async {
        json!({
            "name": svc.name(),
            "struct_name": svc.name(),
            "active": svc.enabled(),
            "endpoints": prefixed_endpoints(crate::SERVICE_ROOT_PREFIX, svc.as_ref()),
        })
    }))
    .await;

    let redis_status = match &state.adapters.redis {
        Some(a) => connected_bool(a.status().await),
        None => false,
    };
    let kafka_status = match &state.adapters.kafka {
        Some(a) => connected_bool(a.status().await),
        None => false,
    };
    let postgres_status = match &state.adapters.postgres {
        Some(set) => !set.status_by_name().await.is_empty(),
        None => false,
    };
    let mongo_status = match &state.adapters.mongo {
        Some(set) => !set.status_by_name().await.is_empty(),
        None => false,
    };
    let grafana_status = match &state.adapters.grafana {
        Some(a) => connected_bool(a.status().await),
        None => false,
    };
    let cron_status = match &state.adapters.cron {
        Some(a) => connected_bool(a.status().await),
        None => false,
    };
    let storage_status = match &state.adapters.minio {
        Some(a) => connected_bool(a.status().await),
        None => false,
    };

    let postgres_connections = match &state.adapters.postgres {
        Some(set) => json!(set.status_by_name().await),
        None => json!({}),
    };
    let mongo_connections = match &state.adapters.mongo {
        Some(set) => json!(set.status_by_name().await),
        None => json!({}),
    };

    let external = probe_external(&state).await;

    let snapshot = state.system_monitor.read().await.clone();

    Json(ApiResponse::success(json!({
        "version": state.config.app.version,
        "services": services,
        "infrastructure": {
            "redis": redis_status,
            "kafka": kafka_status,
            "postgres": postgres_status,
            "mongo": mongo_status,
            "grafana": grafana_status,
            "cron": cron_status,
        },
        "postgres": { "connections": postgres_connections },
        "mongo": { "connections": mongo_connections },
        "redis": connected_map(redis_status),
        "kafka": connected_map(kafka_status),
        "storage": connected_map(storage_status),
        "external": external,
        "system": {
            "cpu": { "usage_percent": snapshot.cpu_usage_percent, "cores": num_cpus() },
            "memory": {
                "used_mb": snapshot.memory_used_mb,
                "total_mb": snapshot.memory_total_mb,
            },
            "disk": disk_usage(),
        },
        "system_info": {
            "hostname": hostname(),
            "ip": local_ip(),
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        },
    })))
}

fn connected_bool(status: std::collections::HashMap<String, Value>) -> bool {
    status.get("connected").and_then(Value::as_bool).unwrap_or(false)
}

fn connected_map(connected: bool) -> Value {
    json!({ "connected": connected })
}

/// Each external target gets exactly 5s; classification is `up` for 2xx,
/// `degraded` for any other response, `down` on error. Latency is
/// recorded regardless of outcome.
async fn probe_external(state: &AppState) -> Vec<Value> {
    join_all(state.config.monitoring.external.iter().map(|svc| async move {
        let start = Instant::now();
        let result = tokio::time::timeout(EXTERNAL_PROBE_TIMEOUT, state.http_client.get(&svc.url).send()).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (probe_status, status_code) = match result {
            Ok(Ok(resp)) => {
                let code = resp.status().as_u16();
                if resp.status().is_success() {
                    ("up", Some(code))
                } else {
                    ("degraded", Some(code))
                }
            }
            _ => ("down", None),
        };

        json!({
            "name": svc.name,
            "url": svc.url,
            "status": probe_status,
            "status_code": status_code,
            "latency_ms": latency_ms,
        })
    }))
    .await
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn disk_usage() -> Value {
    let disks = sysinfo::Disks::new_with_refreshed_list();
    let (mut total, mut available) = (0u64, 0u64);
    for disk in disks.iter() {
        total += disk.total_space();
        available += disk.available_space();
    }
    json!({ "total_bytes": total, "available_bytes": available, "used_bytes": total.saturating_sub(available) })
}

fn hostname() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string())
}

fn local_ip() -> String {
    "0.0.0.0".to_string()
}
