//! Backup export and import routes.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use passvault_core::ImportReport;
use passvault_core::backup::BACKUP_FILE_NAME;

use crate::error::AppError;
use crate::middleware::Identity;
use crate::state::AppState;

/// Build the backup router. Import bodies are capped at `max_backup_bytes`.
pub fn router(max_backup_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/backup/export", get(export_backup))
        .route(
            "/api/backup/import",
            post(import_backup).layer(DefaultBodyLimit::max(max_backup_bytes)),
        )
}

/// `GET /api/backup/export`
///
/// Download every secret of the caller as one encrypted blob.
async fn export_backup(
    State(state): State<Arc<AppState>>,
    Extension(Identity(owner_id)): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let blob = state.backup.export(&owner_id).await?;
    let disposition = format!("attachment; filename=\"{BACKUP_FILE_NAME}\"");

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        blob,
    ))
}

/// `POST /api/backup/import`
///
/// The request body is the raw blob returned by export.
async fn import_backup(
    State(state): State<Arc<AppState>>,
    Extension(Identity(owner_id)): Extension<Identity>,
    body: Bytes,
) -> Result<Json<ImportReport>, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("missing backup file".to_owned()));
    }
    let report = state.backup.import(&owner_id, &body).await?;
    Ok(Json(report))
}
