// Jaskier Shared Pattern — shutdown
//! Graceful-shutdown orchestrator: closes every adapter in strict reverse
//! order (Cron → Mongo → Postgres → Kafka → Redis), accumulating failures
//! rather than short-circuiting, racing a 20 s watchdog that force-exits.

use std::time::Duration;

use tokio::signal;
use tokio::sync::watch;

use crate::adapters::ConnectionSet;
use crate::infra_manager::AdapterHandles;

const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(20);

/// Awaits Ctrl-C or SIGTERM, whichever comes first.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// One signal, observed by as many listeners as need it — both HTTP
/// surfaces' `with_graceful_shutdown` futures and `main`'s own post-serve
/// adapter teardown all watch the same flag rather than each racing its
/// own independent signal handler.
pub fn watch_shutdown() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = tx.send(true);
    });
    rx
}

/// Resolves once [`watch_shutdown`]'s signal has fired. Pass a clone of
/// the receiver to each server's `with_graceful_shutdown`.
pub async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    if *rx.borrow() {
        return;
    }
    let _ = rx.changed().await;
}

/// Runs the ordered close sequence with a 20 s hard cap; anything still
/// in flight past the cap is abandoned and the process is force-exited.
pub async fn graceful_shutdown(adapters: &AdapterHandles) {
    tracing::info!("shutdown signal received, closing adapters in reverse order");

    let watchdog = tokio::spawn(async {
        tokio::time::sleep(WATCHDOG_TIMEOUT).await;
        tracing::error!("shutdown watchdog expired after 20s, forcing exit");
        std::process::exit(1);
    });

    close_sequence(adapters).await;
    watchdog.abort();
}

async fn close_sequence(adapters: &AdapterHandles) {
    let mut errors: Vec<String> = Vec::new();

    if let Some(cron) = &adapters.cron {
        if let Err(e) = crate::adapters::Adapter::close(cron.as_ref()).await {
            errors.push(format!("cron: {e}"));
        }
    }
    if let Some(mongo) = &adapters.mongo {
        if let Err(e) = mongo.close_all().await {
            errors.push(format!("mongo: {e}"));
        }
    }
    if let Some(postgres) = &adapters.postgres {
        if let Err(e) = postgres.close_all().await {
            errors.push(format!("postgres: {e}"));
        }
    }
    if let Some(kafka) = &adapters.kafka {
        if let Err(e) = crate::adapters::Adapter::close(kafka.as_ref()).await {
            errors.push(format!("kafka: {e}"));
        }
    }
    if let Some(redis) = &adapters.redis {
        if let Err(e) = crate::adapters::Adapter::close(redis.as_ref()).await {
            errors.push(format!("redis: {e}"));
        }
    }

    if errors.is_empty() {
        tracing::info!("all adapters closed cleanly");
    } else {
        tracing::error!(errors = ?errors, "one or more adapters failed to close cleanly");
    }
}
