//! Secret management routes.
//!
//! Every handler acts on behalf of the [`Identity`] injected by the identity
//! middleware. Only `GET /api/secrets/{id}` returns a plaintext password.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use passvault_core::{NewSecretInput, RevealedSecret, SecretUpdate};
use passvault_storage::{Metadata, Secret};
use serde::Deserialize;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::AppError;
use crate::middleware::Identity;
use crate::state::AppState;

/// Request body for creating a secret.
#[derive(Deserialize)]
pub struct CreateSecretRequest {
    pub title: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Request body for updating a secret.
///
/// An absent or empty `password` keeps the stored one.
#[derive(Deserialize)]
pub struct UpdateSecretRequest {
    pub title: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Build the secrets router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/secrets", get(list_secrets).post(create_secret))
        .route(
            "/api/secrets/{id}",
            get(get_secret).put(update_secret).delete(delete_secret),
        )
}

/// `POST /api/secrets`
async fn create_secret(
    State(state): State<Arc<AppState>>,
    Extension(Identity(owner_id)): Extension<Identity>,
    Json(body): Json<CreateSecretRequest>,
) -> Result<(StatusCode, Json<Secret>), AppError> {
    let secret = state
        .vault
        .create_secret(
            &owner_id,
            NewSecretInput {
                title: body.title,
                username: body.username,
                password: Zeroizing::new(body.password),
                metadata: body.metadata,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(secret)))
}

/// `GET /api/secrets`
///
/// List the caller's secrets, newest first, without passwords.
async fn list_secrets(
    State(state): State<Arc<AppState>>,
    Extension(Identity(owner_id)): Extension<Identity>,
) -> Result<Json<Vec<Secret>>, AppError> {
    let secrets = state.vault.list_secrets(&owner_id).await?;
    Ok(Json(secrets))
}

/// `GET /api/secrets/{id}`
///
/// Get a single secret with its decrypted password.
async fn get_secret(
    State(state): State<Arc<AppState>>,
    Extension(Identity(requester_id)): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<Json<RevealedSecret>, AppError> {
    state
        .vault
        .get_secret(id, &requester_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::secret_not_found(id))
}

/// `PUT /api/secrets/{id}`
async fn update_secret(
    State(state): State<Arc<AppState>>,
    Extension(Identity(requester_id)): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSecretRequest>,
) -> Result<Json<Secret>, AppError> {
    let secret = state
        .vault
        .update_secret(
            &requester_id,
            SecretUpdate {
                id,
                title: body.title,
                username: body.username,
                password: body.password.map(Zeroizing::new),
                metadata: body.metadata,
                expected_version: body.expected_version,
            },
        )
        .await?;

    Ok(Json(secret))
}

/// `DELETE /api/secrets/{id}`
async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Extension(Identity(requester_id)): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.vault.delete_secret(id, &requester_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
