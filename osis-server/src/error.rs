//! HTTP error responses.

use crate::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use osis_uploads::UploadError;
use osis_validation::ValidationReport;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Message for every unexpected failure, including panics.
pub const INTERNAL_ERROR_MESSAGE: &str = "Terjadi kesalahan pada server";

/// Message accompanying a validation report.
pub const VALIDATION_MESSAGE: &str = "Data tidak valid. Periksa kembali isian Anda.";

/// Errors returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        report: ValidationReport,
    },

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(report: ValidationReport) -> Self {
        Self::Validation {
            message: VALIDATION_MESSAGE.to_string(),
            report,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upload(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_REQUEST)
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => {
                Self::Conflict("Nomor telepon sudah terdaftar. Gunakan nomor lain.".to_string())
            }
            StoreError::NotFound(_) => Self::NotFound("Tiket tidak ditemukan".to_string()),
            StoreError::Backend(e) => Self::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Validation { message, report } => json!({
                "success": false,
                "message": message,
                "errors": report.errors,
                "error_count": report.error_count,
            }),
            Self::Internal(detail) => {
                error!(error = %detail, "Internal error");
                json!({ "success": false, "message": INTERNAL_ERROR_MESSAGE })
            }
            other => json!({ "success": false, "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
