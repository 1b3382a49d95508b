//! Vault service: the secret lifecycle with ownership and encryption.
//!
//! Every security decision lives here. The store below is a dumb typed
//! surface; the service checks ownership, encrypts passwords on the way in
//! and decrypts them only on an authorized single-record read.
//!
//! Plaintext passwords never reach a [`Secret`]. They travel in
//! [`NewSecretInput`] and [`SecretUpdate`] on the way in and in
//! [`RevealedSecret`] on the way out, always inside `Zeroizing<String>` so the
//! buffer is wiped when the value is dropped.

use std::fmt;
use std::sync::Arc;

use passvault_storage::{Metadata, NewSecret, Secret, SecretChanges, SecretStore};
use serde::{Serialize, Serializer};
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::Cipher;
use crate::error::{CryptoError, VaultError};

/// Maximum title length in bytes.
pub const MAX_TITLE_LEN: usize = 256;

/// Maximum username length in bytes.
pub const MAX_USERNAME_LEN: usize = 256;

/// Maximum plaintext password length in bytes.
pub const MAX_PASSWORD_LEN: usize = 4096;

/// Caller input for [`VaultService::create_secret`].
pub struct NewSecretInput {
    pub title: String,
    pub username: String,
    pub password: Zeroizing<String>,
    pub metadata: Metadata,
}

impl fmt::Debug for NewSecretInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewSecretInput")
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Caller input for [`VaultService::update_secret`].
pub struct SecretUpdate {
    pub id: Uuid,
    pub title: String,
    pub username: String,
    /// New password. `None` or an empty string keeps the stored ciphertext.
    pub password: Option<Zeroizing<String>>,
    pub metadata: Metadata,
    /// Version the caller last observed. When set, the update fails with
    /// [`VaultError::VersionConflict`] if the stored version moved on.
    pub expected_version: Option<i64>,
}

impl fmt::Debug for SecretUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretUpdate")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("password_changed", &self.password.is_some())
            .field("expected_version", &self.expected_version)
            .finish_non_exhaustive()
    }
}

/// A secret together with its decrypted password.
///
/// Only produced by [`VaultService::get_secret`] for the owner.
#[derive(Serialize)]
pub struct RevealedSecret {
    #[serde(flatten)]
    pub secret: Secret,
    #[serde(serialize_with = "serialize_password")]
    pub password: Zeroizing<String>,
}

fn serialize_password<S: Serializer>(
    password: &Zeroizing<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(password.as_str())
}

impl fmt::Debug for RevealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevealedSecret")
            .field("secret", &self.secret)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Whether `requester_id` owns `secret`.
///
/// Compared in constant time so response timing does not reveal how much of
/// an owner id a caller guessed.
#[must_use]
pub fn is_owner(secret: &Secret, requester_id: &str) -> bool {
    secret
        .owner_id
        .as_bytes()
        .ct_eq(requester_id.as_bytes())
        .into()
}

/// Orchestrates ownership checks, password encryption and persistence.
pub struct VaultService {
    store: Arc<dyn SecretStore>,
    cipher: Arc<Cipher>,
}

impl fmt::Debug for VaultService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultService")
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}

impl VaultService {
    /// Create a vault service over a store and a cipher.
    #[must_use]
    pub fn new(store: Arc<dyn SecretStore>, cipher: Arc<Cipher>) -> Self {
        Self { store, cipher }
    }

    pub(crate) fn store(&self) -> &dyn SecretStore {
        self.store.as_ref()
    }

    pub(crate) fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    /// Encrypt the password and persist a new secret owned by `owner_id`.
    ///
    /// The returned record carries only the ciphertext.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidInput`] if a field is empty or too long.
    /// - [`VaultError::Crypto`] if encryption fails.
    /// - [`VaultError::Storage`] if the store fails.
    pub async fn create_secret(
        &self,
        owner_id: &str,
        input: NewSecretInput,
    ) -> Result<Secret, VaultError> {
        validate_fields(&input.title, &input.username)?;
        validate_password(&input.password)?;

        let protected_password = self.cipher.encrypt(input.password.as_bytes())?;
        let secret = self
            .store
            .create(NewSecret {
                id: None,
                owner_id: owner_id.to_owned(),
                title: input.title,
                username: input.username,
                protected_password,
                metadata: input.metadata,
            })
            .await?;

        tracing::info!(secret_id = %secret.id, owner_id, "secret created");
        Ok(secret)
    }

    /// Fetch a secret and decrypt its password for its owner.
    ///
    /// Returns `Ok(None)` if the secret does not exist.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthorized`] if `requester_id` is not the owner.
    /// - [`VaultError::Crypto`] if the stored ciphertext does not decrypt.
    /// - [`VaultError::Storage`] if the store fails.
    pub async fn get_secret(
        &self,
        id: Uuid,
        requester_id: &str,
    ) -> Result<Option<RevealedSecret>, VaultError> {
        let Some(secret) = self.store.get_by_id(id).await? else {
            return Ok(None);
        };
        self.authorize(&secret, requester_id)?;

        let plaintext = Zeroizing::new(self.cipher.decrypt(&secret.protected_password)?);
        let password = std::str::from_utf8(&plaintext)
            .map_err(|_| CryptoError::DecryptionFailed)?
            .to_owned();

        tracing::debug!(secret_id = %id, "secret revealed");
        Ok(Some(RevealedSecret {
            secret,
            password: Zeroizing::new(password),
        }))
    }

    /// List every secret of `owner_id`, newest first, without decrypting.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Storage`] if the store fails.
    pub async fn list_secrets(&self, owner_id: &str) -> Result<Vec<Secret>, VaultError> {
        let secrets = self.store.list_by_owner(owner_id).await?;
        tracing::debug!(owner_id, count = secrets.len(), "secrets listed");
        Ok(secrets)
    }

    /// Update a secret owned by `requester_id`.
    ///
    /// A missing or empty password keeps the stored ciphertext untouched.
    /// The store bumps the version by one on every successful update.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NotFound`] if the secret does not exist.
    /// - [`VaultError::Unauthorized`] if `requester_id` is not the owner.
    /// - [`VaultError::VersionConflict`] if `expected_version` is stale.
    /// - [`VaultError::InvalidInput`] if a field is empty or too long.
    /// - [`VaultError::Crypto`] / [`VaultError::Storage`] on lower failures.
    pub async fn update_secret(
        &self,
        requester_id: &str,
        update: SecretUpdate,
    ) -> Result<Secret, VaultError> {
        let existing = self
            .store
            .get_by_id(update.id)
            .await?
            .ok_or(VaultError::NotFound { id: update.id })?;
        self.authorize(&existing, requester_id)?;
        validate_fields(&update.title, &update.username)?;

        let protected_password = match update.password.as_ref().filter(|p| !p.is_empty()) {
            Some(password) => {
                validate_password(password)?;
                self.cipher.encrypt(password.as_bytes())?
            }
            None => existing.protected_password,
        };

        let secret = self
            .store
            .update(SecretChanges {
                id: update.id,
                title: update.title,
                username: update.username,
                protected_password,
                metadata: update.metadata,
                expected_version: update.expected_version,
            })
            .await?;

        tracing::info!(secret_id = %secret.id, version = secret.version, "secret updated");
        Ok(secret)
    }

    /// Delete a secret owned by `requester_id`.
    ///
    /// Deleting a secret that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Unauthorized`] if `requester_id` is not the owner.
    /// - [`VaultError::Storage`] if the store fails.
    pub async fn delete_secret(&self, id: Uuid, requester_id: &str) -> Result<(), VaultError> {
        let Some(existing) = self.store.get_by_id(id).await? else {
            tracing::debug!(secret_id = %id, "delete of absent secret");
            return Ok(());
        };
        self.authorize(&existing, requester_id)?;

        self.store.delete(id).await?;
        tracing::info!(secret_id = %id, "secret deleted");
        Ok(())
    }

    fn authorize(&self, secret: &Secret, requester_id: &str) -> Result<(), VaultError> {
        if is_owner(secret, requester_id) {
            Ok(())
        } else {
            tracing::warn!(secret_id = %secret.id, requester_id, "ownership check failed");
            Err(VaultError::Unauthorized { id: secret.id })
        }
    }
}

fn validate_fields(title: &str, username: &str) -> Result<(), VaultError> {
    if title.trim().is_empty() {
        return Err(invalid("title must not be empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(invalid(format!(
            "title must be at most {MAX_TITLE_LEN} bytes"
        )));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(invalid(format!(
            "username must be at most {MAX_USERNAME_LEN} bytes"
        )));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), VaultError> {
    if password.len() > MAX_PASSWORD_LEN {
        return Err(invalid(format!(
            "password must be at most {MAX_PASSWORD_LEN} bytes"
        )));
    }
    Ok(())
}

fn invalid(reason: impl Into<String>) -> VaultError {
    VaultError::InvalidInput {
        reason: reason.into(),
    }
}
