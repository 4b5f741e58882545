pub mod adapters;
pub mod async_primitives;
pub mod audit;
pub mod auth;
pub mod config;
pub mod control_plane;
pub mod credentials;
pub mod envelope;
pub mod infra_manager;
pub mod middleware;
pub mod registry;
pub mod services;
pub mod session;
pub mod shutdown;
pub mod state;
pub mod telemetry;
pub mod watchdog;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use tokio::sync::RwLock;

use config::Config;
use credentials::CredentialRecord;
use infra_manager::InfraInitManager;
use registry::{Registrar, Registry};
use session::SessionManager;
use state::{AppState, SystemSnapshot, UserProfile};
use telemetry::Broadcaster;

/// Prefix every independent/dependent service is nested under on the
/// primary API surface.
pub const SERVICE_ROOT_PREFIX: &str = "/api/v1";

/// Wires the whole framework together: starts every enabled adapter
/// without waiting on any of them, then registers every known service
/// per its dependency contract. Returns the shared [`AppState`] plus the
/// primary-API router, fully built and ready to serve — by the time this
/// resolves, `state.registry.get_services()` already reflects the
/// complete set, so whatever calls `control_plane::create_control_router`
/// next sees a consistent catalog.
pub async fn bootstrap(config: Config, broadcaster: Arc<Broadcaster>) -> (AppState, Router) {
    let infra = InfraInitManager::new();
    let adapters = Arc::new(infra.start_async_initialization(&config).await);

    let registry = Registry::new();
    let definitions = services::definitions(Arc::clone(&adapters));
    let registrar = Registrar::new(definitions, Arc::clone(&infra));

    let credentials = Arc::new(RwLock::new(CredentialRecord::new(
        config.auth.username.clone(),
        config.auth.password_hash.clone(),
    )));

    let state = AppState {
        config: Arc::new(config),
        adapters,
        infra,
        registry: Arc::clone(&registry),
        broadcaster,
        sessions: SessionManager::new(),
        credentials,
        audit: audit::AuditLog::new(),
        http_client: reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client builds"),
        system_monitor: Arc::new(RwLock::new(SystemSnapshot::default())),
        start_time: Instant::now(),
        ready: Arc::new(AtomicBool::new(false)),
        dummy_log_enabled: Arc::new(AtomicBool::new(false)),
        user_profile: Arc::new(RwLock::new(UserProfile::default())),
    };

    let _session_reaper = state.sessions.spawn_reaper();

    let primary_router = registrar
        .register_all_services(Arc::clone(&registry), SERVICE_ROOT_PREFIX)
        .await
        .fallback(primary_fallback_404)
        .with_state(state.clone());

    (state, primary_router)
}

async fn primary_fallback_404(uri: axum::http::Uri, method: axum::http::Method) -> axum::response::Response {
    envelope::not_found_response(uri.path(), method.as_str())
}

/// Request correlation ID middleware — generates or propagates an
/// `X-Request-Id` on every request, recorded into the current tracing
/// span so broadcaster-fed log records carry it too.
pub async fn request_id_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("request_id", &request_id.as_str());

    let mut response = next.run(req).await;
    if let Ok(header_value) = axum::http::HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", header_value);
    }
    response
}
