//! Core library for `PassVault`.
//!
//! `PassVault` stores website credentials for many users. Each secret belongs
//! to exactly one owner; its password is sealed with AES-GCM under a single
//! process-wide master key before it reaches storage.
//!
//! # Modules
//!
//! - [`crypto`]: the master key and the AES-GCM [`Cipher`](crypto::Cipher).
//! - [`vault`]: ownership-checked secret lifecycle over a
//!   [`SecretStore`](passvault_storage::SecretStore).
//! - [`backup`]: encrypted per-owner export and upsert import.
//! - [`password`]: random password generation.
//! - [`error`]: error types for each layer.

pub mod backup;
pub mod crypto;
pub mod error;
pub mod password;
pub mod vault;

pub use backup::{BackupCodec, ImportReport};
pub use crypto::{Cipher, MasterKey};
pub use error::{BackupError, CryptoError, VaultError};
pub use vault::{NewSecretInput, RevealedSecret, SecretUpdate, VaultService};
