//! Cryptographic primitives for `PassVault`.
//!
//! Provides AES-GCM authenticated encryption under a single master key and a
//! zeroize-on-drop key newtype. The key size picks the AES variant: 16 bytes
//! selects AES-128, 24 bytes AES-192, 32 bytes AES-256.
//!
//! # Security model
//!
//! - Every encryption generates a fresh 96-bit nonce via `OsRng`.
//! - Blob format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
//! - Every decryption failure maps to the same [`CryptoError::DecryptionFailed`].
//! - The key derives `Zeroize` + `ZeroizeOnDrop` and is redacted in `Debug`.

use std::fmt;

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Nonce length for AES-GCM (96 bits).
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Key lengths accepted by [`MasterKey::from_bytes`].
pub const VALID_KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// The process-wide master key. Zeroized on drop.
///
/// Validated once at construction; an instance always holds a usable key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey(Vec<u8>);

impl MasterKey {
    /// Create a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] unless `bytes` is 16, 24 or 32
    /// bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if !VALID_KEY_LENGTHS.contains(&bytes.len()) {
            return Err(CryptoError::InvalidKey {
                length: bytes.len(),
            });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Generate a new random 256-bit key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        Self(key.to_vec())
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey")
            .field("len", &self.0.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

enum Engine {
    Aes128(Box<Aes128Gcm>),
    Aes192(Box<Aes192Gcm>),
    Aes256(Box<Aes256Gcm>),
}

/// AES-GCM cipher bound to one master key.
///
/// Immutable after construction, so a single instance can be shared behind
/// an `Arc` by every concurrent request.
pub struct Cipher {
    engine: Engine,
}

impl Cipher {
    /// Build a cipher from a validated key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if the key length is not an AES
    /// key size. Unreachable for keys built with [`MasterKey::from_bytes`].
    pub fn new(key: &MasterKey) -> Result<Self, CryptoError> {
        let length = key.0.len();
        let engine = match length {
            16 => Aes128Gcm::new_from_slice(&key.0).map(|c| Engine::Aes128(Box::new(c))),
            24 => Aes192Gcm::new_from_slice(&key.0).map(|c| Engine::Aes192(Box::new(c))),
            32 => Aes256Gcm::new_from_slice(&key.0).map(|c| Engine::Aes256(Box::new(c))),
            _ => return Err(CryptoError::InvalidKey { length }),
        }
        .map_err(|_| CryptoError::InvalidKey { length })?;
        Ok(Self { engine })
    }

    /// Encrypt `plaintext` with a fresh random nonce.
    ///
    /// Returns `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EncryptionFailed`] if the AEAD operation fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = match &self.engine {
            Engine::Aes128(c) => c.encrypt(&nonce, plaintext),
            Engine::Aes192(c) => c.encrypt(&nonce, plaintext),
            Engine::Aes256(c) => c.encrypt(&nonce, plaintext),
        }
        .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut combined = Vec::with_capacity(NONCE_LEN.saturating_add(sealed.len()));
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&sealed);
        Ok(combined)
    }

    /// Decrypt a blob produced by [`encrypt`](Cipher::encrypt).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptionFailed`] if the blob is shorter than
    /// a nonce plus tag, or if authentication fails (wrong key, corrupted
    /// data, or tampered tag).
    pub fn decrypt(&self, combined: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if combined.len() < NONCE_LEN.saturating_add(TAG_LEN) {
            return Err(CryptoError::DecryptionFailed);
        }

        let (nonce_bytes, sealed) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        match &self.engine {
            Engine::Aes128(c) => c.decrypt(nonce, sealed),
            Engine::Aes192(c) => c.decrypt(nonce, sealed),
            Engine::Aes256(c) => c.decrypt(nonce, sealed),
        }
        .map_err(|_| CryptoError::DecryptionFailed)
    }

    /// Size in bytes of the key this cipher was built from.
    #[must_use]
    pub fn key_len(&self) -> usize {
        match self.engine {
            Engine::Aes128(_) => 16,
            Engine::Aes192(_) => 24,
            Engine::Aes256(_) => 32,
        }
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher")
            .field("algorithm", &format!("AES-{}-GCM", self.key_len() * 8))
            .finish_non_exhaustive()
    }
}
