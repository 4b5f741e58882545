// Jaskier Shared Pattern — control_plane::user
//! `/api/user/*`: profile settings, password change, and photo upload —
//! plus `/api/monitoring/config` dashboard branding.

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::credentials::CredentialRecord;
use crate::envelope::{ApiError, ApiResponse};
use crate::state::{AppState, UserProfile};

pub async fn get_settings(State(state): State<AppState>) -> Json<ApiResponse<UserProfile>> {
    Json(ApiResponse::success(state.user_profile.read().await.clone()))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(body): Json<UserProfile>,
) -> Json<ApiResponse<UserProfile>> {
    let mut profile = state.user_profile.write().await;
    profile.display_name = body.display_name;
    profile.email = body.email;
    Json(ApiResponse::success(profile.clone()))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    let mut creds = state.credentials.write().await;
    creds.verify(&creds.username.clone(), &body.current_password)?;

    let new_hash = CredentialRecord::hash_password(&body.new_password)?;
    creds.password_hash = new_hash;
    drop(creds);

    state.audit.record("password_change", json!({}), None).await;
    Ok(Json(ApiResponse::success("password updated")))
}

/// Original filename is sanitized to its base name only — no path
/// separators survive — and the upload is rejected past
/// `monitoring.max_photo_size_mb`.
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let max_bytes = state.config.monitoring.max_photo_size_mb * 1024 * 1024;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("photo") {
            continue;
        }
        let filename = sanitize_filename(field.file_name().unwrap_or("photo.bin"));
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation(format!("failed to read upload: {e}")))?;
        if data.len() as u64 > max_bytes {
            return Err(ApiError::validation(format!(
                "photo exceeds {}MB limit",
                state.config.monitoring.max_photo_size_mb
            )));
        }

        tokio::fs::create_dir_all(&state.config.monitoring.upload_dir)
            .await
            .map_err(|e| ApiError::internal(format!("failed to create upload dir: {e}")))?;
        let path = format!("{}/{}", state.config.monitoring.upload_dir, filename);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ApiError::internal(format!("failed to save photo: {e}")))?;

        state.user_profile.write().await.photo_filename = Some(filename.clone());
        state
            .audit
            .record("photo_upload", json!({ "filename": filename }), None)
            .await;

        return Ok(Json(ApiResponse::success(json!({ "filename": filename }))));
    }

    Err(ApiError::validation("missing 'photo' field in multipart body"))
}

pub async fn delete_photo(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    let mut profile = state.user_profile.write().await;
    if let Some(filename) = profile.photo_filename.take() {
        let path = format!("{}/{}", state.config.monitoring.upload_dir, filename);
        let _ = tokio::fs::remove_file(&path).await;
    }
    Ok(Json(ApiResponse::success("photo removed")))
}

pub async fn serve_photo(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let filename = sanitize_filename(&name);
    let path = format!("{}/{}", state.config.monitoring.upload_dir, filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found(format!("photo not found: {filename}")))?;

    let body: Bytes = bytes.into();
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], body).into_response())
}

pub async fn monitoring_config(State(state): State<AppState>) -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(json!({
        "title": state.config.monitoring.title,
        "subtitle": state.config.monitoring.subtitle,
    })))
}

/// Strips any path separator so an upload can never escape `upload_dir`,
/// and rejects the bare `.`/`..` segments too — those have no separator
/// to strip, so they'd otherwise pass through unchanged and, joined onto
/// `upload_dir`, resolve one directory above it.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base {
        "" | "." | ".." => "upload.bin".to_string(),
        other => other.to_string(),
    }
}
