//! HTTP route handlers for the `PassVault` server.

pub mod backup;
pub mod passwords;
pub mod secrets;

use std::sync::Arc;

use axum::http::{HeaderValue, header};
use axum::middleware as axum_mw;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::identity_middleware;
use crate::state::AppState;

/// Build the full application router.
///
/// Everything under `/api` requires the identity header; `/health` does not.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(secrets::router())
        .merge(backup::router(state.max_backup_bytes))
        .merge(passwords::router())
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            identity_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

/// `GET /health`
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
