//! Error types for `passvault-core`.
//!
//! Each error variant carries enough context to diagnose the problem without
//! a debugger. Crypto errors never include key material or plaintext, and
//! decryption failures deliberately carry no detail at all so that a wrong
//! key, a truncated blob and a forged tag look the same to the caller.

use passvault_storage::StorageError;
use uuid::Uuid;

use crate::backup::ImportReport;

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The configured key is not 16, 24 or 32 bytes long.
    #[error("invalid key length {length}: must be 16, 24 or 32 bytes")]
    InvalidKey { length: usize },

    /// AES-GCM encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Decryption failed (wrong key, truncated, corrupted or tampered blob).
    #[error("decryption failed")]
    DecryptionFailed,
}

/// Errors from vault service operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The secret does not exist.
    #[error("secret '{id}' not found")]
    NotFound { id: Uuid },

    /// The caller does not own the secret.
    #[error("caller does not own secret '{id}'")]
    Unauthorized { id: Uuid },

    /// The secret changed since the caller last read it.
    #[error("secret '{id}' is at version {actual}, expected {expected}")]
    VersionConflict {
        id: Uuid,
        expected: i64,
        actual: i64,
    },

    /// The request failed validation.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// A cryptographic operation failed.
    #[error("vault crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The secret store returned an error.
    #[error("vault storage error: {0}")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for VaultError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { id } => Self::NotFound { id },
            StorageError::VersionConflict {
                id,
                expected,
                actual,
            } => Self::VersionConflict {
                id,
                expected,
                actual,
            },
            other => Self::Storage(other),
        }
    }
}

/// Errors from backup export and import.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// The backup blob could not be decrypted or parsed. Nothing was applied.
    #[error("corrupt backup: {reason}")]
    Corrupt { reason: String },

    /// Reading or encrypting the owner's secrets for export failed.
    #[error("backup export failed: {0}")]
    Export(#[source] VaultError),

    /// The envelope could not be serialized.
    #[error("failed to encode backup envelope: {0}")]
    Encode(#[source] serde_json::Error),

    /// Import stopped at a record. Every record listed in `applied` is
    /// committed; records after `failed_id` were not attempted.
    #[error(
        "import stopped at secret '{failed_id}' after applying {} record(s): {source}",
        .applied.total()
    )]
    Partial {
        applied: ImportReport,
        failed_id: Uuid,
        source: VaultError,
    },
}

impl BackupError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }
}
