//! Password generator route.

use std::sync::Arc;

use axum::routing::post;
use axum::{Json, Router};
use passvault_core::password::{PasswordOptions, generate_password};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Response for a generated password.
#[derive(Serialize)]
pub struct GeneratedPassword {
    pub password: String,
}

/// Build the password generator router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/passwords/generate", post(generate))
}

/// `POST /api/passwords/generate`
async fn generate(
    Json(options): Json<PasswordOptions>,
) -> Result<Json<GeneratedPassword>, AppError> {
    let password = generate_password(options)?;
    Ok(Json(GeneratedPassword {
        password: password.as_str().to_owned(),
    }))
}
