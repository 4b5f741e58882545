// Jaskier Shared Pattern — control_plane::endpoints
//! Catalog of registered services and their paths, built straight from
//! `registry.GetServices()`.

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::envelope::ApiResponse;
use crate::registry::prefixed_endpoints;
use crate::state::AppState;

pub async fn list_endpoints(State(state): State<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    let services = state.registry.get_services().await;
    let catalog: Vec<_> = services
        .iter()
        .map(|svc| {
            json!({
                "name": svc.name(),
                "active": svc.enabled(),
                "endpoints": prefixed_endpoints(crate::SERVICE_ROOT_PREFIX, svc.as_ref()),
            })
        })
        .collect();

    Json(ApiResponse::success(json!({ "services": catalog })))
}
