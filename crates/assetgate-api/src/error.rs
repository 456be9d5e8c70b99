//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps gateway, validation and storage failures to HTTP status codes and a
//! JSON body `{"error": {"code", "message"}}`. Server-side failures are
//! logged here and their details are never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use assetgate_core::{NameError, UploadPolicyError};

use crate::catalog::CatalogError;
use crate::gateway::GatewayError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "CONTENT_HASH_MISMATCH").
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Filename failed the traversal guard (400).
    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    /// Declared or streamed size above the ceiling (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Declared media type missing or not allowed (415).
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Content digest does not match the filename (400). Both digests are
    /// returned in `details`.
    #[error("content hash mismatch: filename claims {expected}, content hashes to {actual}")]
    HashMismatch { expected: String, actual: String },

    /// Request body could not be read or parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Required client marker header absent (400).
    #[error("missing client marker header: {0}")]
    MissingClientMarker(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Catalog lists the asset but the backend has no object (404).
    #[error("storage inconsistent: {0}")]
    StorageInconsistent(String),

    /// Storage backend failed (503). Message is logged, not returned.
    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Internal server error (500). Message is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidFilename(_) => (StatusCode::BAD_REQUEST, "INVALID_FILENAME"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            Self::HashMismatch { .. } => (StatusCode::BAD_REQUEST, "CONTENT_HASH_MISMATCH"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::MissingClientMarker(_) => (StatusCode::BAD_REQUEST, "MISSING_CLIENT_MARKER"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::StorageInconsistent(_) => (StatusCode::NOT_FOUND, "STORAGE_INCONSISTENT"),
            Self::BackendUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "BACKEND_UNAVAILABLE")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::BackendUnavailable(_) => "The storage backend is unavailable".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::BackendUnavailable(_) => tracing::error!(error = %self, "storage backend error"),
            _ => {}
        }

        let details = match &self {
            Self::HashMismatch { expected, actual } => Some(serde_json::json!({
                "expected": expected,
                "actual": actual,
            })),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<NameError> for AppError {
    fn from(err: NameError) -> Self {
        Self::InvalidFilename(err.to_string())
    }
}

impl From<UploadPolicyError> for AppError {
    fn from(err: UploadPolicyError) -> Self {
        match err {
            UploadPolicyError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            UploadPolicyError::UnsupportedMediaType(_) | UploadPolicyError::MissingMediaType => {
                Self::UnsupportedMediaType(err.to_string())
            }
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidName(e) => e.into(),
            GatewayError::Policy(e) => e.into(),
            GatewayError::HashMismatch { expected, actual } => Self::HashMismatch { expected, actual },
            GatewayError::Body(msg) => Self::BadRequest(msg),
            GatewayError::NotFound(name) => Self::NotFound(format!("asset {name} not found")),
            GatewayError::Inconsistent(name) => {
                Self::StorageInconsistent(format!("asset {name} is missing from storage"))
            }
            GatewayError::Storage(e) => Self::BackendUnavailable(e.to_string()),
            GatewayError::Catalog(e) => e.into(),
        }
    }
}
