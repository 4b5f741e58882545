// Jaskier Shared Pattern — control_plane::metrics
//! Prometheus-style scrape endpoint: adapter `connected` gauges plus the
//! same CPU/memory snapshot `/api/status` reports.

use axum::extract::State;

use crate::adapters::Adapter;
use crate::adapters::ConnectionSet;
use crate::state::AppState;

pub async fn metrics(State(state): State<AppState>) -> String {
    let snapshot = state.system_monitor.read().await.clone();
    let mut out = String::new();

    out.push_str("# HELP infraplane_cpu_usage_percent CPU usage percentage\n");
    out.push_str("# TYPE infraplane_cpu_usage_percent gauge\n");
    out.push_str(&format!("infraplane_cpu_usage_percent {:.1}\n", snapshot.cpu_usage_percent));

    out.push_str("# HELP infraplane_memory_used_bytes Memory used in bytes\n");
    out.push_str("# TYPE infraplane_memory_used_bytes gauge\n");
    out.push_str(&format!("infraplane_memory_used_bytes {}\n", snapshot.memory_used_mb * 1024 * 1024));

    out.push_str("# HELP infraplane_uptime_seconds Control-plane uptime\n");
    out.push_str("# TYPE infraplane_uptime_seconds counter\n");
    out.push_str(&format!("infraplane_uptime_seconds {}\n", state.uptime_seconds()));

    out.push_str("# HELP infraplane_adapter_connected Adapter connectivity (1=connected)\n");
    out.push_str("# TYPE infraplane_adapter_connected gauge\n");

    if let Some(a) = &state.adapters.redis {
        push_gauge(&mut out, "redis", None, connected(a.status().await));
    }
    if let Some(a) = &state.adapters.kafka {
        push_gauge(&mut out, "kafka", None, connected(a.status().await));
    }
    if let Some(a) = &state.adapters.minio {
        push_gauge(&mut out, "storage", None, connected(a.status().await));
    }
    if let Some(a) = &state.adapters.grafana {
        push_gauge(&mut out, "grafana", None, connected(a.status().await));
    }
    if let Some(a) = &state.adapters.cron {
        push_gauge(&mut out, "cron", None, connected(a.status().await));
    }
    if let Some(set) = &state.adapters.postgres {
        for (name, status) in set.status_by_name().await {
            push_gauge(&mut out, "postgres", Some(&name), connected(status));
        }
    }
    if let Some(set) = &state.adapters.mongo {
        for (name, status) in set.status_by_name().await {
            push_gauge(&mut out, "mongo", Some(&name), connected(status));
        }
    }

    out
}

fn connected(status: std::collections::HashMap<String, serde_json::Value>) -> bool {
    status.get("connected").and_then(serde_json::Value::as_bool).unwrap_or(false)
}

fn push_gauge(out: &mut String, backend: &str, connection: Option<&str>, connected: bool) {
    match connection {
        Some(name) => out.push_str(&format!(
            "infraplane_adapter_connected{{backend=\"{backend}\",connection=\"{name}\"}} {}\n",
            connected as u8
        )),
        None => out.push_str(&format!(
            "infraplane_adapter_connected{{backend=\"{backend}\"}} {}\n",
            connected as u8
        )),
    }
}
