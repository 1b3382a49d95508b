//! Identity middleware for `PassVault`.
//!
//! Session handling lives in front of this service. The session layer
//! authenticates the user and forwards their id in a trusted header; this
//! middleware lifts that header into an [`Identity`] request extension for
//! the handlers below it.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller id, injected into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(pub String);

/// Middleware that requires the configured identity header.
pub async fn identity_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = req
        .headers()
        .get(&state.identity_header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned);

    let Some(identity) = identity else {
        return AppError::Unauthorized(format!("missing {} header", state.identity_header))
            .into_response();
    };

    req.extensions_mut().insert(Identity(identity));
    next.run(req).await
}
