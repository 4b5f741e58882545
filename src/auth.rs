// Jaskier Shared Pattern — auth
//! Login/logout handlers for the session & auth subsystem. Session
//! resolution for already-authenticated routes lives in
//! [`crate::middleware::session_auth`]; this module only covers the two
//! routes exempt from that middleware.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;

use crate::envelope::{ApiError, ApiResponse};
use crate::session::{SESSION_COOKIE_NAME, SESSION_TTL};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Verify → `Create` → set cookie → `{success:true}`.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    state
        .credentials
        .read()
        .await
        .verify(&body.username, &body.password)?;

    let session = state.sessions.create(&body.username).await;
    state
        .audit
        .record("login", json!({ "username": body.username }), None)
        .await;

    let mut response =
        ApiResponse::success(json!({ "username": session.username })).into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        format!(
            "{SESSION_COOKIE_NAME}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            session.id,
            SESSION_TTL.as_secs()
        )
        .parse()
        .expect("static header value"),
    );
    Ok(response)
}

/// Parse cookie → `Delete` → clear cookie → `{success:true}`.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        state.sessions.delete(cookie.value()).await;
    }

    let mut response = ApiResponse::<()>::message("logged out").into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        format!("{SESSION_COOKIE_NAME}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
            .parse()
            .expect("static header value"),
    );
    response
}
