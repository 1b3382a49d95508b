//! Secret store adapter for `PassVault`.
//!
//! This crate defines the [`SecretStore`] trait, a typed CRUD surface over
//! durable storage that knows nothing about ownership, encryption, or
//! plaintext. The vault service in `passvault-core` wraps a store and is
//! responsible for every security decision; this layer only assigns ids,
//! timestamps and versions.
//!
//! Two implementations are provided:
//!
//! - [`PostgresStore`]: production backend (feature `postgres-backend`)
//! - [`MemoryStore`]: in-memory, for tests and local development

mod error;
mod memory;
mod model;
#[cfg(feature = "postgres-backend")]
mod postgres_backend;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use model::{Metadata, NewSecret, Secret, SecretChanges};
#[cfg(feature = "postgres-backend")]
pub use postgres_backend::PostgresStore;

use uuid::Uuid;

/// A pluggable secret store.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`)
/// and must apply the version increment atomically with the row update.
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync + 'static {
    /// Insert a new secret.
    ///
    /// Uses `secret.id` when present, otherwise generates a UUID v4. The
    /// stored record starts at version 1 with `created_at == updated_at`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::Conflict`] if a secret with the same id exists.
    /// - [`StorageError::Write`] if the backend fails.
    async fn create(&self, secret: NewSecret) -> Result<Secret, StorageError>;

    /// Fetch a secret by id. Returns `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the backend fails.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Secret>, StorageError>;

    /// List every secret belonging to `owner_id`, most recently created first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::List`] if the backend fails.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Secret>, StorageError>;

    /// Replace the mutable fields of a secret.
    ///
    /// Always increments `version` by exactly one and refreshes `updated_at`,
    /// regardless of which fields actually changed.
    ///
    /// # Errors
    ///
    /// - [`StorageError::NotFound`] if the secret does not exist.
    /// - [`StorageError::VersionConflict`] if `expected_version` is set and
    ///   does not match the stored version.
    /// - [`StorageError::Write`] if the backend fails.
    async fn update(&self, changes: SecretChanges) -> Result<Secret, StorageError>;

    /// Delete a secret. This is idempotent: deleting a non-existent id is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Delete`] if the backend fails.
    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;
}
