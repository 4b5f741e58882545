// Jaskier Shared Pattern — envelope
//! The canonical success/error JSON shape every control-plane response
//! uses, plus the typed error taxonomy and its mapping onto HTTP status
//! codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl PaginationMeta {
    /// `per_page` clamps to `[1,100]`; `page<1` is treated as `1`.
    pub fn new(page: i64, per_page: i64, total: u64) -> Self {
        let page = page.max(1) as u32;
        let per_page = per_page.clamp(1, 100) as u32;
        let total_pages = total.div_ceil(per_page as u64).max(1);
        Self { page, per_page, total, total_pages, extra: None }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            meta: None,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn success_with_meta(data: T, meta: PaginationMeta) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            meta: Some(meta),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn message(msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: true,
            message: Some(msg.into()),
            data: None,
            meta: None,
            timestamp: Utc::now().timestamp(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `201 Created` wrapper around a success envelope.
pub struct Created<T: Serialize>(pub ApiResponse<T>);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// `204 No Content` — no body at all, not even an empty envelope.
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

/// The error taxonomy. Kinds, not names — each maps onto exactly one
/// canonical HTTP status.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Adapter(String),
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    Panic(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
    pub fn adapter(msg: impl Into<String>) -> Self {
        Self::Adapter(msg.into())
    }
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Auth(_) => "AUTH_ERROR",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Adapter(_) => "ADAPTER_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Panic(_) => "PANIC",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Adapter(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Panic(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    status: u16,
    error: ErrorBody,
    timestamp: i64,
    datetime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(code = self.code(), "request failed: {self}");

        let now = Utc::now();
        let body = ErrorEnvelope {
            success: false,
            status: status.as_u16(),
            error: ErrorBody { code: self.code(), message: self.to_string(), details: None },
            timestamp: now.timestamp(),
            datetime: now.to_rfc3339(),
            correlation_id: None,
        };
        (status, Json(body)).into_response()
    }
}

/// The fixed shape for an unrouted path.
pub fn not_found_response(path: &str, method: &str) -> Response {
    let now = Utc::now();
    let body = ErrorEnvelope {
        success: false,
        status: 404,
        error: ErrorBody {
            code: "ENDPOINT_NOT_FOUND",
            message: "Endpoint not found. This incident will be reported.".to_string(),
            details: Some(serde_json::json!({ "path": path, "method": method })),
        },
        timestamp: now.timestamp(),
        datetime: now.to_rfc3339(),
        correlation_id: None,
    };
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
