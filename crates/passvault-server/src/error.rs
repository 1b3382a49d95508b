//! HTTP error types for the `PassVault` server.
//!
//! Maps domain errors from `passvault-core` into HTTP responses. Every error
//! variant produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`.
//!
//! A secret owned by someone else is reported exactly like a missing one so
//! that callers cannot probe for ids that exist in other vaults. A backup
//! import that stops at a record names only the record, never the reason.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use passvault_core::{BackupError, ImportReport, VaultError};
use serde::Serialize;
use uuid::Uuid;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// No caller identity on the request.
    Unauthorized(String),
    /// Requested resource not found (or not visible to the caller).
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// The resource changed since the caller read it.
    Conflict(String),
    /// A backup import stopped after committing some records.
    PartialImport {
        applied: ImportReport,
        failed_id: Uuid,
    },
    /// Internal server error. The message is logged, never returned.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<PartialDetails>,
}

#[derive(Serialize)]
struct PartialDetails {
    applied: ImportReport,
    failed_id: Uuid,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut details = None;
        let (status, error_type, message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::PartialImport { applied, failed_id } => {
                let message = format!(
                    "import stopped at secret '{failed_id}' after applying {} record(s)",
                    applied.total()
                );
                details = Some(PartialDetails { applied, failed_id });
                (StatusCode::UNPROCESSABLE_ENTITY, "partial_import", message)
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
            details,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl AppError {
    pub(crate) fn secret_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("secret '{id}' not found"))
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::NotFound { id } | VaultError::Unauthorized { id } => {
                Self::secret_not_found(id)
            }
            VaultError::VersionConflict { .. } => Self::Conflict(err.to_string()),
            VaultError::InvalidInput { .. } => Self::BadRequest(err.to_string()),
            VaultError::Crypto(_) | VaultError::Storage(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<BackupError> for AppError {
    fn from(err: BackupError) -> Self {
        match err {
            BackupError::Corrupt { .. } => Self::BadRequest(err.to_string()),
            BackupError::Export(inner) => inner.into(),
            BackupError::Encode(_) => Self::Internal(err.to_string()),
            BackupError::Partial {
                applied,
                failed_id,
                source,
            } => {
                tracing::warn!(secret_id = %failed_id, error = %source, "partial backup import");
                Self::PartialImport { applied, failed_id }
            }
        }
    }
}
