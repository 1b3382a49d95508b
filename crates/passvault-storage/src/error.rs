//! Storage error types.
//!
//! Every error variant carries enough context to diagnose the problem
//! without a debugger. Record contents never appear in messages, only ids.

use uuid::Uuid;

/// Errors that can occur during secret store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to open or migrate the storage backend.
    #[error("failed to open storage at '{target}': {reason}")]
    Open { target: String, reason: String },

    /// Failed to read a secret from storage.
    #[error("failed to read secret '{id}': {reason}")]
    Read { id: Uuid, reason: String },

    /// Failed to insert or update a secret.
    #[error("failed to write secret '{id}': {reason}")]
    Write { id: Uuid, reason: String },

    /// Failed to delete a secret.
    #[error("failed to delete secret '{id}': {reason}")]
    Delete { id: Uuid, reason: String },

    /// Failed to list the secrets of an owner.
    #[error("failed to list secrets for owner '{owner_id}': {reason}")]
    List { owner_id: String, reason: String },

    /// The secret to update does not exist.
    #[error("secret '{id}' not found")]
    NotFound { id: Uuid },

    /// A secret with this id already exists.
    #[error("secret '{id}' already exists")]
    Conflict { id: Uuid },

    /// The stored version no longer matches the version the caller observed.
    #[error("secret '{id}' is at version {actual}, expected {expected}")]
    VersionConflict {
        id: Uuid,
        expected: i64,
        actual: i64,
    },
}
