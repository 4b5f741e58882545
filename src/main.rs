// Jaskier Shared Pattern — main
//! Process entry point: parse CLI args, load config, bootstrap the
//! framework, then serve the primary API and the monitoring control
//! plane concurrently on their own ports until a shutdown signal fires.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use http::{header, Method};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use infraplane::config::Config;
use infraplane::telemetry::{Broadcaster, BroadcastLayer};
use infraplane::{control_plane, shutdown, watchdog};

#[derive(Parser, Debug)]
#[command(name = "infraplaned", about = "Embedded operational control plane")]
struct Cli {
    /// Remote config URL. When absent, loads `--config-file` from disk.
    #[arg(short = 'c', long = "config")]
    config_url: Option<String>,

    /// Local config file path, used when `--config` is not given.
    #[arg(long = "config-file", default_value = "config.yaml")]
    config_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let broadcaster = Broadcaster::new();
    init_tracing(&broadcaster);

    // Fatal-exit path: a bad config must be caught before either listener
    // binds, not discovered partway through serving traffic.
    let config = match &cli.config_url {
        Some(url) => Config::load_from_url(url).await,
        None => Config::load_from_file(&cli.config_file),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration, exiting");
            std::process::exit(1);
        }
    };

    let monitoring_enabled = config.monitoring.enabled;
    let primary_port = config.server.port;
    let monitoring_port = config.monitoring.port;

    let (state, primary_router) = infraplane::bootstrap(config, broadcaster).await;
    // Boot is non-blocking by contract — adapters keep initializing in the
    // background while traffic is already being accepted.
    state.mark_ready();

    let _watchdog = watchdog::spawn(state.clone());

    let primary_app = apply_ambient_layers(primary_router);
    let shutdown_rx = shutdown::watch_shutdown();

    let primary_addr = SocketAddr::from(([0, 0, 0, 0], primary_port));
    let primary_listener = tokio::net::TcpListener::bind(primary_addr).await?;
    print_banner(primary_port, monitoring_port, monitoring_enabled);
    tracing::info!(addr = %primary_addr, "primary API listening");

    let primary_rx = shutdown_rx.clone();
    let primary_server = tokio::spawn(async move {
        axum::serve(
            primary_listener,
            primary_app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown::wait_for_shutdown(primary_rx))
        .await
    });

    let control_server = if monitoring_enabled {
        let control_router = control_plane::create_control_router(state.clone());
        let control_addr = SocketAddr::from(([0, 0, 0, 0], monitoring_port));
        let control_listener = tokio::net::TcpListener::bind(control_addr).await?;
        tracing::info!(addr = %control_addr, "control plane listening");

        let control_rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            axum::serve(control_listener, control_router.into_make_service())
                .with_graceful_shutdown(shutdown::wait_for_shutdown(control_rx))
                .await
        }))
    } else {
        tracing::info!("control plane disabled via config, serving primary API only");
        None
    };

    primary_server.await??;
    if let Some(handle) = control_server {
        handle.await??;
    }

    shutdown::graceful_shutdown(&state.adapters).await;
    Ok(())
}

/// Request-id propagation, rate limiting, CORS, security headers,
/// tracing, and compression — applied to the primary API surface. The
/// control plane router builds its own, narrower stack internally.
fn apply_ambient_layers(router: axum::Router) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(2)
        .burst_size(30)
        .finish()
        .expect("static governor config is valid");

    router
        .layer(axum::middleware::from_fn(infraplane::request_id_middleware))
        .layer(GovernorLayer::new(governor_conf))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            header::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            header::HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            header::HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
}

/// Installs the stdout/JSON fmt layer alongside [`BroadcastLayer`] so
/// every log line is both printed and pushed to `/api/logs` subscribers.
fn init_tracing(broadcaster: &std::sync::Arc<Broadcaster>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let broadcast_layer = BroadcastLayer::new(std::sync::Arc::clone(broadcaster));

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .with(broadcast_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .with(broadcast_layer)
            .init();
    }
}

fn print_banner(primary_port: u16, monitoring_port: u16, monitoring_enabled: bool) {
    println!();
    println!("  \x1b[1;33m>>>  INFRAPLANE  <<<\x1b[0m");
    println!("  \x1b[33mEmbedded Operational Control Plane\x1b[0m");
    println!("  \x1b[1;32mapi      http://localhost:{primary_port}\x1b[0m");
    if monitoring_enabled {
        println!("  \x1b[1;32mcontrol  http://localhost:{monitoring_port}\x1b[0m");
    }
    println!();
}
