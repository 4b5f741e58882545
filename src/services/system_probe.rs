// Jaskier Shared Pattern — services::system_probe
//! An independent demo service: no adapter dependency, so the registrar
//! constructs and boots it in phase 1 alongside every other
//! zero-dependency service.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::envelope::ApiResponse;
use crate::registry::Service;
use crate::state::AppState;

pub struct SystemProbeService;

impl SystemProbeService {
    pub fn new() -> Self {
        Self
    }
}

impl Service for SystemProbeService {
    fn name(&self) -> &'static str {
        "system_probe"
    }

    fn enabled(&self) -> bool {
        true
    }

    fn endpoints(&self) -> Vec<String> {
        vec!["/ping".to_string()]
    }

    fn register_routes(&self, router: Router<AppState>) -> Router<AppState> {
        router.route("/ping", get(ping))
    }
}

async fn ping(State(_state): State<AppState>) -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("pong"))
}
