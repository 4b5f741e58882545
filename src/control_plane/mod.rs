// Jaskier Shared Pattern — control_plane
//! Router assembly for the monitoring-port HTTP surface. Installation
//! order is fixed: GZip, sessions (except exempt paths), custom error
//! handler (404 fallback), obfuscation, then routes.

pub mod config_files;
pub mod cron;
pub mod endpoints;
pub mod health;
pub mod kafka;
pub mod logs;
pub mod metrics;
pub mod mongo;
pub mod postgres;
pub mod redis;
pub mod status;
pub mod user;

use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::envelope::not_found_response;
use crate::middleware::{obfuscation, session_auth};
use crate::state::AppState;

/// Builds the complete control-plane router, ready to be served on the
/// monitoring port.
pub fn create_control_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/infrastructure", get(health::health_infrastructure))
        .route("/metrics", get(metrics::metrics))
        .route("/login", post(crate::auth::login))
        .route("/logout", post(crate::auth::logout));

    let protected = Router::new()
        .route("/restart", post(health::restart))
        .route("/api/status", get(status::status))
        .route("/api/logs", get(logs::stream_logs))
        .route("/api/cpu", get(logs::stream_cpu))
        .route("/api/logs/dummy", post(logs::toggle_dummy))
        .route("/api/logs/dummy/status", get(logs::dummy_status))
        .route("/api/logs/audit", get(logs::audit_log))
        .route("/api/endpoints", get(endpoints::list_endpoints))
        .route(
            "/api/config",
            get(config_files::read_config).post(config_files::write_config),
        )
        .route("/api/config/backup", post(config_files::backup_config))
        .route(
            "/api/banner",
            get(config_files::read_banner).post(config_files::write_banner),
        )
        .route("/api/redis/keys", get(redis::list_keys))
        .route("/api/redis/key/{key}", get(redis::get_key))
        .route("/api/postgres/info", get(postgres::info))
        .route("/api/postgres/queries", get(postgres::active_queries))
        .route("/api/postgres/query", post(postgres::run_query))
        .route("/api/mongo/info", get(mongo::info))
        .route("/api/mongo/query", post(mongo::run_query))
        .route("/api/kafka/topics", get(kafka::topics))
        .route("/api/cron", get(cron::list_jobs))
        .route("/api/cron/{name}/run", post(cron::run_now))
        .route(
            "/api/user/settings",
            get(user::get_settings).post(user::update_settings),
        )
        .route("/api/user/password", post(user::change_password))
        .route(
            "/api/user/photo",
            post(user::upload_photo).delete(user::delete_photo),
        )
        .route("/api/user/photos/{name}", get(user::serve_photo))
        .route("/api/monitoring/config", get(user::monitoring_config))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_auth::require_session,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(fallback_404)
        .layer(axum::middleware::from_fn_with_state(state.clone(), obfuscation::obfuscate))
        .layer(axum::middleware::from_fn(crate::request_id_middleware))
        .layer(CorsLayer::new().allow_origin(tower_http::cors::Any))
        .layer(CompressionLayer::new())
        .with_state(state)
}

async fn fallback_404(uri: axum::http::Uri, method: axum::http::Method) -> axum::response::Response {
    not_found_response(uri.path(), method.as_str())
}
