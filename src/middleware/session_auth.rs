// Jaskier Shared Pattern — middleware::session_auth
//! Attached to every monitoring route except login/logout/health. Reads
//! the session cookie, resolves it, and on failure redirects to `/`
//! rather than returning a JSON error.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let session_id = jar.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string());

    let Some(session_id) = session_id else {
        return reject();
    };

    if state.sessions.get(&session_id).await.is_none() {
        return reject();
    }

    next.run(request).await
}

/// Redirect to `/`, clearing the cookie and disabling caching of the
/// redirect itself, so a stale browser tab can't replay a dead session.
fn reject() -> Response {
    let mut response = Redirect::to("/").into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::SET_COOKIE,
        format!("{SESSION_COOKIE_NAME}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
            .parse()
            .expect("static header value"),
    );
    headers.insert(header::CACHE_CONTROL, "no-store".parse().expect("static header value"));
    *response.status_mut() = StatusCode::FOUND;
    response
}
