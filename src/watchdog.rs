// Jaskier Shared Pattern — watchdog
//! Background watchdog: periodically re-probes every live adapter's
//! `status()` and refreshes the cached system snapshot, applied across
//! whatever adapters are enrolled rather than one specific upstream.

use std::time::Duration;

use crate::state::AppState;

const CHECK_INTERVAL: Duration = Duration::from_secs(60);

pub fn spawn(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("watchdog: started (interval={}s)", CHECK_INTERVAL.as_secs());

        loop {
            tokio::time::sleep(CHECK_INTERVAL).await;

            let statuses = check_adapters(&state).await;
            refresh_system_snapshot(&state).await;

            if statuses.iter().all(|(_, ok)| *ok) {
                tracing::debug!("watchdog: all adapters healthy");
            } else {
                for (name, ok) in &statuses {
                    if !ok {
                        tracing::warn!(adapter = %name, "watchdog: adapter unhealthy");
                    }
                }
            }
        }
    })
}

async fn check_adapters(state: &AppState) -> Vec<(&'static str, bool)> {
    let mut results = Vec::new();

    if let Some(redis) = &state.adapters.redis {
        results.push(("redis", connected(crate::adapters::Adapter::status(redis.as_ref()).await)));
    }
    if let Some(kafka) = &state.adapters.kafka {
        results.push(("kafka", connected(crate::adapters::Adapter::status(kafka.as_ref()).await)));
    }
    if let Some(minio) = &state.adapters.minio {
        results.push(("storage", connected(crate::adapters::Adapter::status(minio.as_ref()).await)));
    }
    if let Some(grafana) = &state.adapters.grafana {
        results.push(("grafana", connected(crate::adapters::Adapter::status(grafana.as_ref()).await)));
    }
    if let Some(cron) = &state.adapters.cron {
        results.push(("cron", connected(crate::adapters::Adapter::status(cron.as_ref()).await)));
    }
    if let Some(postgres) = &state.adapters.postgres {
        for (name, status) in postgres.status_by_name().await {
            let _ = name;
            results.push(("postgres", connected(status)));
        }
    }
    if let Some(mongo) = &state.adapters.mongo {
        for (name, status) in mongo.status_by_name().await {
            let _ = name;
            results.push(("mongo", connected(status)));
        }
    }

    results
}

fn connected(status: std::collections::HashMap<String, serde_json::Value>) -> bool {
    status.get("connected").and_then(serde_json::Value::as_bool).unwrap_or(false)
}

async fn refresh_system_snapshot(state: &AppState) {
    let mut system = sysinfo::System::new_all();
    system.refresh_all();

    let cpu_usage = system.global_cpu_usage();
    let memory_used = system.used_memory();
    let memory_total = system.total_memory();

    let mut snapshot = state.system_monitor.write().await;
    snapshot.cpu_usage_percent = cpu_usage as f64;
    snapshot.memory_used_mb = memory_used / 1024 / 1024;
    snapshot.memory_total_mb = memory_total / 1024 / 1024;
}
