//! Shared application state for the `PassVault` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use std::sync::Arc;

use axum::http::HeaderName;
use passvault_core::{BackupCodec, Cipher, CryptoError, MasterKey, VaultService};
use passvault_storage::SecretStore;

use crate::config::{DEFAULT_IDENTITY_HEADER, DEFAULT_MAX_BACKUP_BYTES};

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Ownership-checked secret lifecycle.
    pub vault: Arc<VaultService>,
    /// Encrypted export and import.
    pub backup: BackupCodec,
    /// Header carrying the authenticated caller id.
    pub identity_header: HeaderName,
    /// Largest accepted backup upload in bytes.
    pub max_backup_bytes: usize,
}

impl AppState {
    /// Build the state over a store and master key with default limits.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if the cipher cannot be built.
    pub fn new(store: Arc<dyn SecretStore>, key: &MasterKey) -> Result<Self, CryptoError> {
        let cipher = Arc::new(Cipher::new(key)?);
        let vault = Arc::new(VaultService::new(store, cipher));
        Ok(Self {
            backup: BackupCodec::new(Arc::clone(&vault)),
            vault,
            identity_header: HeaderName::from_static(DEFAULT_IDENTITY_HEADER),
            max_backup_bytes: DEFAULT_MAX_BACKUP_BYTES,
        })
    }

    /// Use a different identity header.
    #[must_use]
    pub fn with_identity_header(mut self, header: HeaderName) -> Self {
        self.identity_header = header;
        self
    }

    /// Use a different import body limit.
    #[must_use]
    pub fn with_max_backup_bytes(mut self, limit: usize) -> Self {
        self.max_backup_bytes = limit;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("identity_header", &self.identity_header)
            .field("max_backup_bytes", &self.max_backup_bytes)
            .finish_non_exhaustive()
    }
}
