//! Typed secret records exchanged with the store.
//!
//! A [`Secret`] is the persisted shape of a credential. It has no plaintext
//! password field: the password only ever exists here as the ciphertext in
//! `protected_password`, and that field is skipped by serialization so a
//! record can be handed to a response body as-is.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Open key/value bag of descriptive attributes. Stored verbatim, never
/// interpreted or encrypted.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A stored credential record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Secret {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub username: String,
    /// `nonce || ciphertext || tag` produced by the core cipher.
    #[serde(skip)]
    pub protected_password: Vec<u8>,
    pub metadata: Metadata,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input to [`SecretStore::create`](crate::SecretStore::create).
#[derive(Debug, Clone)]
pub struct NewSecret {
    /// Explicit id to insert under. `None` lets the store generate one.
    pub id: Option<Uuid>,
    pub owner_id: String,
    pub title: String,
    pub username: String,
    pub protected_password: Vec<u8>,
    pub metadata: Metadata,
}

/// Input to [`SecretStore::update`](crate::SecretStore::update).
///
/// Replaces every mutable column. `owner_id`, `id` and `created_at` are
/// immutable and cannot be changed through this type.
#[derive(Debug, Clone)]
pub struct SecretChanges {
    pub id: Uuid,
    pub title: String,
    pub username: String,
    pub protected_password: Vec<u8>,
    pub metadata: Metadata,
    /// When set, the update only applies if the stored version still equals
    /// this value.
    pub expected_version: Option<i64>,
}
