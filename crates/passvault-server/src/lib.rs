//! `PassVault` HTTP server.
//!
//! Wires the vault service, backup codec and secret store into an Axum
//! router serving the JSON API at `/api/*`. Callers are identified by a
//! trusted header set by the session layer in front of this service.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
