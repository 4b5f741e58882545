// Jaskier Shared Pattern — control_plane::config_files
//! Read/write the YAML config and banner text files. Writes are atomic
//! (temp file + rename); `/api/config/backup` snapshots the current file
//! under a UTC-timestamped name before any overwrite.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::envelope::{ApiError, ApiResponse};
use crate::state::AppState;

const CONFIG_PATH: &str = "config.yaml";

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Most recent `config.yaml.<timestamp>.bak` in the config file's own
/// directory, picked by lexicographic (== chronological, given the
/// timestamp format) filename order.
async fn latest_backup() -> std::io::Result<Option<std::path::PathBuf>> {
    let path = std::path::Path::new(CONFIG_PATH);
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
    let file_name = path.file_name().expect("CONFIG_PATH has a file name").to_string_lossy().to_string();
    let prefix = format!("{file_name}.");

    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with(&prefix) && name.ends_with(".bak") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names.last().map(|n| dir.join(n)))
}

pub async fn read_config() -> Result<Json<ApiResponse<Value>>, ApiError> {
    let raw = tokio::fs::read_to_string(CONFIG_PATH)
        .await
        .map_err(|e| ApiError::internal(format!("failed to read config: {e}")))?;
    let parsed: Value = serde_yaml_ng::from_str(&raw)
        .map_err(|e| ApiError::internal(format!("failed to parse config: {e}")))?;
    Ok(Json(ApiResponse::success(parsed)))
}

pub async fn write_config(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    let yaml = serde_yaml_ng::to_string(&body)
        .map_err(|e| ApiError::validation(format!("invalid config body: {e}")))?;

    atomic_write(CONFIG_PATH, &yaml)
        .await
        .map_err(|e| ApiError::internal(format!("failed to write config: {e}")))?;

    state.audit.record("config_write", json!({}), None).await;
    Ok(Json(ApiResponse::success("config updated")))
}

/// Snapshots `config.yaml` under a timestamped name, unless the most
/// recent existing backup already has identical content — a content-hash
/// dedup check rather than an unconditional copy on every call.
pub async fn backup_config(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let contents = tokio::fs::read(CONFIG_PATH)
        .await
        .map_err(|e| ApiError::internal(format!("failed to read config: {e}")))?;
    let digest = sha256_hex(&contents);

    if let Some(latest) = latest_backup()
        .await
        .map_err(|e| ApiError::internal(format!("failed to scan existing backups: {e}")))?
    {
        if let Ok(existing) = tokio::fs::read(&latest).await {
            if sha256_hex(&existing) == digest {
                let name = latest.display().to_string();
                state
                    .audit
                    .record("config_backup_skipped", json!({ "file": name, "sha256": digest }), None)
                    .await;
                return Ok(Json(ApiResponse::success(name)));
            }
        }
    }

    let backup_name = format!("{CONFIG_PATH}.{}.bak", chrono::Utc::now().format("%Y%m%dT%H%M%SZ"));
    tokio::fs::write(&backup_name, &contents)
        .await
        .map_err(|e| ApiError::internal(format!("failed to back up config: {e}")))?;

    state
        .audit
        .record("config_backup", json!({ "file": backup_name, "sha256": digest }), None)
        .await;
    Ok(Json(ApiResponse::success(backup_name)))
}

pub async fn read_banner(State(state): State<AppState>) -> Result<Json<ApiResponse<String>>, ApiError> {
    let text = tokio::fs::read_to_string(&state.config.app.banner_path)
        .await
        .unwrap_or_default();
    Ok(Json(ApiResponse::success(text)))
}

pub async fn write_banner(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    atomic_write(&state.config.app.banner_path, &body)
        .await
        .map_err(|e| ApiError::internal(format!("failed to write banner: {e}")))?;
    Ok(Json(ApiResponse::success("banner updated")))
}

async fn atomic_write(path: &str, contents: &str) -> std::io::Result<()> {
    let tmp_path = format!("{path}.tmp");
    tokio::fs::write(&tmp_path, contents).await?;
    tokio::fs::rename(&tmp_path, path).await
}
