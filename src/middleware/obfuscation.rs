// Jaskier Shared Pattern — middleware::obfuscation
//! When enabled, base64-substitutes the body of any `/api/*` JSON
//! response other than the streaming/binary exceptions. Applies
//! uniformly to any JSON body regardless of status code (see
//! DESIGN.md) — only content type gates it.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;

use crate::state::AppState;

const EXEMPT_PREFIXES: &[&str] = &["/api/logs", "/api/cpu", "/api/user/photos"];

pub async fn obfuscate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let enabled = state.config.monitoring.obfuscate_api;
    let should_obfuscate =
        enabled && path.starts_with("/api/") && !EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p));

    let response = next.run(request).await;
    if !should_obfuscate {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);
    if !is_json {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return Response::from_parts(parts, Body::empty()),
    };

    let encoded = STANDARD.encode(&bytes);
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_LENGTH, encoded.len().into());
    parts.headers.insert(
        "X-Obfuscated",
        "true".parse().expect("static header value"),
    );

    Response::from_parts(parts, Body::from(encoded))
}
