//! Encrypted backup export and import.
//!
//! A backup blob has this layout:
//!
//! ```text
//! [PVBK: 4 bytes][blob version: 1 byte][cipher blob of the envelope JSON]
//! ```
//!
//! The envelope JSON carries every secret of one owner with its stored
//! ciphertext, base64-encoded. Passwords are never decrypted on export, so a
//! backup is doubly sealed: once per password and once for the whole file.
//!
//! Import is an upsert keyed by secret id. It is validated up front (header,
//! decryption, parsing, base64) and only then applied record by record. The
//! apply phase is not atomic: a failure stops the import and reports which
//! records were already committed through [`BackupError::Partial`].

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use passvault_storage::{Metadata, NewSecret, Secret, SecretChanges};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{BackupError, VaultError};
use crate::vault::{VaultService, is_owner};

/// Magic bytes at the start of every backup blob.
const MAGIC: &[u8; 4] = b"PVBK";

/// Current blob layout version.
pub const BLOB_VERSION: u8 = 1;

/// Current envelope schema version.
pub const FORMAT_VERSION: u32 = 1;

/// 4 (magic) + 1 (blob version).
const HEADER_LEN: usize = 5;

/// Suggested file name for a downloaded backup.
pub const BACKUP_FILE_NAME: &str = "secrets_backup.enc";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    created_at: DateTime<Utc>,
    secrets: Vec<BackupSecret>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BackupSecret {
    id: Uuid,
    owner_id: String,
    title: String,
    username: String,
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    protected_password: Vec<u8>,
    #[serde(default)]
    metadata: Metadata,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Secret> for BackupSecret {
    fn from(secret: Secret) -> Self {
        Self {
            id: secret.id,
            owner_id: secret.owner_id,
            title: secret.title,
            username: secret.username,
            protected_password: secret.protected_password,
            metadata: secret.metadata,
            version: secret.version,
            created_at: secret.created_at,
            updated_at: secret.updated_at,
        }
    }
}

fn base64_encode<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

fn base64_decode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

/// Ids of the records an import committed, in the order they were applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Records that did not exist and were inserted under their backup id.
    pub created: Vec<Uuid>,
    /// Records that already existed for the importer and were overwritten.
    pub updated: Vec<Uuid>,
}

impl ImportReport {
    /// Number of committed records.
    #[must_use]
    pub fn total(&self) -> usize {
        self.created.len().saturating_add(self.updated.len())
    }
}

enum Applied {
    Created,
    Updated,
}

/// Exports and imports encrypted per-owner backups.
#[derive(Debug, Clone)]
pub struct BackupCodec {
    vault: Arc<VaultService>,
}

impl BackupCodec {
    /// Create a codec sharing the vault's store and cipher.
    #[must_use]
    pub fn new(vault: Arc<VaultService>) -> Self {
        Self { vault }
    }

    /// Export every secret of `owner_id` as one encrypted blob.
    ///
    /// Stored ciphertexts are carried as-is; no password is decrypted.
    ///
    /// # Errors
    ///
    /// - [`BackupError::Export`] if listing or encryption fails.
    /// - [`BackupError::Encode`] if the envelope cannot be serialized.
    pub async fn export(&self, owner_id: &str) -> Result<Vec<u8>, BackupError> {
        let secrets = self
            .vault
            .list_secrets(owner_id)
            .await
            .map_err(BackupError::Export)?;
        let count = secrets.len();

        let envelope = Envelope {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            secrets: secrets.into_iter().map(BackupSecret::from).collect(),
        };
        let json = serde_json::to_vec(&envelope).map_err(BackupError::Encode)?;
        let sealed = self
            .vault
            .cipher()
            .encrypt(&json)
            .map_err(|e| BackupError::Export(e.into()))?;

        let mut blob = Vec::with_capacity(HEADER_LEN.saturating_add(sealed.len()));
        blob.extend_from_slice(MAGIC);
        blob.push(BLOB_VERSION);
        blob.extend_from_slice(&sealed);

        tracing::info!(owner_id, count, bytes = blob.len(), "backup exported");
        Ok(blob)
    }

    /// Import a blob produced by [`export`](Self::export) into `owner_id`'s
    /// vault.
    ///
    /// Every record is re-owned by the importer. A record whose id already
    /// belongs to the importer is overwritten (its version bumps); an unknown
    /// id is inserted under that id; an id owned by someone else fails that
    /// record with [`VaultError::Unauthorized`].
    ///
    /// Stopping at a record still tells the importer that its id is taken
    /// somewhere. The HTTP layer reports every failed record with the same
    /// body, so nothing beyond that is disclosed.
    ///
    /// # Errors
    ///
    /// - [`BackupError::Corrupt`] if the blob fails any validation. Nothing
    ///   is written in that case.
    /// - [`BackupError::Partial`] if applying a record fails. Records listed
    ///   in the report stay committed.
    pub async fn import(&self, owner_id: &str, blob: &[u8]) -> Result<ImportReport, BackupError> {
        let envelope = self.open(blob)?;
        let total = envelope.secrets.len();

        let mut report = ImportReport::default();
        for record in envelope.secrets {
            let id = record.id;
            match self.apply(owner_id, record).await {
                Ok(Applied::Created) => report.created.push(id),
                Ok(Applied::Updated) => report.updated.push(id),
                Err(source) => {
                    tracing::warn!(
                        owner_id,
                        secret_id = %id,
                        applied = report.total(),
                        total,
                        error = %source,
                        "backup import stopped"
                    );
                    return Err(BackupError::Partial {
                        applied: report,
                        failed_id: id,
                        source,
                    });
                }
            }
        }

        tracing::info!(
            owner_id,
            created = report.created.len(),
            updated = report.updated.len(),
            "backup imported"
        );
        Ok(report)
    }

    fn open(&self, blob: &[u8]) -> Result<Envelope, BackupError> {
        if blob.len() < HEADER_LEN || &blob[..MAGIC.len()] != MAGIC {
            return Err(BackupError::corrupt("not a backup file"));
        }
        let version = blob[MAGIC.len()];
        if version != BLOB_VERSION {
            return Err(BackupError::corrupt(format!(
                "unsupported backup version {version}"
            )));
        }

        let json = self
            .vault
            .cipher()
            .decrypt(&blob[HEADER_LEN..])
            .map_err(|_| BackupError::corrupt("backup does not decrypt under this key"))?;

        let envelope: Envelope = serde_json::from_slice(&json)
            .map_err(|_| BackupError::corrupt("backup payload is not a valid envelope"))?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(BackupError::corrupt(format!(
                "unsupported envelope format version {}",
                envelope.format_version
            )));
        }
        Ok(envelope)
    }

    async fn apply(&self, owner_id: &str, record: BackupSecret) -> Result<Applied, VaultError> {
        let store = self.vault.store();
        match store.get_by_id(record.id).await? {
            Some(existing) if is_owner(&existing, owner_id) => {
                store
                    .update(SecretChanges {
                        id: record.id,
                        title: record.title,
                        username: record.username,
                        protected_password: record.protected_password,
                        metadata: record.metadata,
                        expected_version: None,
                    })
                    .await?;
                Ok(Applied::Updated)
            }
            Some(existing) => Err(VaultError::Unauthorized { id: existing.id }),
            None => {
                store
                    .create(NewSecret {
                        id: Some(record.id),
                        owner_id: owner_id.to_owned(),
                        title: record.title,
                        username: record.username,
                        protected_password: record.protected_password,
                        metadata: record.metadata,
                    })
                    .await?;
                Ok(Applied::Created)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::crypto::{Cipher, MasterKey};
    use crate::vault::NewSecretInput;
    use passvault_storage::{MemoryStore, SecretStore};
    use zeroize::Zeroizing;

    const KEY: &[u8; 32] = b"12345678901234567890123456789012";

    fn cipher() -> Arc<Cipher> {
        Arc::new(Cipher::new(&MasterKey::from_bytes(KEY).unwrap()).unwrap())
    }

    fn make_codec(store: &MemoryStore, cipher: Arc<Cipher>) -> (Arc<VaultService>, BackupCodec) {
        let vault = Arc::new(VaultService::new(Arc::new(store.clone()), cipher));
        (Arc::clone(&vault), BackupCodec::new(vault))
    }

    fn input(title: &str, password: &str) -> NewSecretInput {
        NewSecretInput {
            title: title.to_owned(),
            username: "test@gmail.com".to_owned(),
            password: Zeroizing::new(password.to_owned()),
            metadata: Metadata::new(),
        }
    }

    async fn seed(vault: &VaultService, owner: &str) -> (Secret, Secret) {
        let a = vault
            .create_secret(owner, input("Gmail", "pw-a"))
            .await
            .unwrap();
        let b = vault
            .create_secret(owner, input("Bank", "pw-b"))
            .await
            .unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn export_import_roundtrip_updates_in_place() {
        let store = MemoryStore::new();
        let (vault, codec) = make_codec(&store, cipher());
        let (a, b) = seed(&vault, "user-1").await;

        let blob = codec.export("user-1").await.unwrap();
        assert_eq!(&blob[..4], MAGIC);
        assert_eq!(blob[4], BLOB_VERSION);

        let report = codec.import("user-1", &blob).await.unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.updated.len(), 2);

        let listed = vault.list_secrets("user-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        for secret in &listed {
            assert_eq!(secret.version, 2);
        }

        let revealed = vault.get_secret(a.id, "user-1").await.unwrap().unwrap();
        assert_eq!(revealed.password.as_str(), "pw-a");
        let revealed = vault.get_secret(b.id, "user-1").await.unwrap().unwrap();
        assert_eq!(revealed.password.as_str(), "pw-b");
    }

    #[tokio::test]
    async fn import_into_empty_store_keeps_ids() {
        let source = MemoryStore::new();
        let (vault, codec) = make_codec(&source, cipher());
        let (a, b) = seed(&vault, "user-1").await;
        let blob = codec.export("user-1").await.unwrap();

        let target = MemoryStore::new();
        let (vault, restored) = make_codec(&target, cipher());
        let report = restored.import("user-1", &blob).await.unwrap();
        assert_eq!(report.created, vec![b.id, a.id]);
        assert!(report.updated.is_empty());

        let revealed = vault.get_secret(a.id, "user-1").await.unwrap().unwrap();
        assert_eq!(revealed.secret.title, "Gmail");
        assert_eq!(revealed.secret.version, 1);
        assert_eq!(revealed.password.as_str(), "pw-a");
    }

    #[tokio::test]
    async fn import_restamps_owner() {
        let source = MemoryStore::new();
        let (vault, codec) = make_codec(&source, cipher());
        let (a, _) = seed(&vault, "user-1").await;
        let blob = codec.export("user-1").await.unwrap();

        let target = MemoryStore::new();
        let (vault, restored) = make_codec(&target, cipher());
        restored.import("user-2", &blob).await.unwrap();

        assert!(vault.list_secrets("user-1").await.unwrap().is_empty());
        assert_eq!(vault.list_secrets("user-2").await.unwrap().len(), 2);
        let stored = target.get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(stored.owner_id, "user-2");
    }

    #[tokio::test]
    async fn export_is_scoped_to_owner_and_hides_plaintext() {
        let store = MemoryStore::new();
        let (vault, codec) = make_codec(&store, cipher());
        seed(&vault, "user-1").await;
        vault
            .create_secret("user-2", input("Other", "pw-other"))
            .await
            .unwrap();

        let blob = codec.export("user-1").await.unwrap();
        let envelope = codec.open(&blob).unwrap();
        assert_eq!(envelope.format_version, FORMAT_VERSION);
        assert_eq!(envelope.secrets.len(), 2);
        assert!(envelope.secrets.iter().all(|s| s.owner_id == "user-1"));

        let json = cipher().decrypt(&blob[HEADER_LEN..]).unwrap();
        let text = String::from_utf8(json).unwrap();
        assert!(!text.contains("pw-a"));
        assert!(!text.contains("pw-b"));
    }

    #[tokio::test]
    async fn export_of_empty_vault_imports_nothing() {
        let store = MemoryStore::new();
        let (_, codec) = make_codec(&store, cipher());

        let blob = codec.export("nobody").await.unwrap();
        let report = codec.import("nobody", &blob).await.unwrap();
        assert_eq!(report, ImportReport::default());
    }

    #[tokio::test]
    async fn foreign_key_blob_is_corrupt_and_changes_nothing() {
        let source = MemoryStore::new();
        let other = Arc::new(Cipher::new(&MasterKey::generate()).unwrap());
        let (vault, codec) = make_codec(&source, other);
        seed(&vault, "user-1").await;
        let blob = codec.export("user-1").await.unwrap();

        let target = MemoryStore::new();
        let (_, restored) = make_codec(&target, cipher());
        let result = restored.import("user-1", &blob).await;
        assert!(matches!(result, Err(BackupError::Corrupt { .. })));
        assert!(target.list_by_owner("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn flipped_byte_is_corrupt_and_changes_nothing() {
        let store = MemoryStore::new();
        let (vault, codec) = make_codec(&store, cipher());
        let (a, _) = seed(&vault, "user-1").await;
        let mut blob = codec.export("user-1").await.unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x80;

        let result = codec.import("user-1", &blob).await;
        assert!(matches!(result, Err(BackupError::Corrupt { .. })));
        let stored = store.get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn bad_header_is_corrupt() {
        let store = MemoryStore::new();
        let (_, codec) = make_codec(&store, cipher());

        let blobs: [&[u8]; 4] = [b"", b"PVB", b"XXXX\x01payload", b"PVBK\x07payload"];
        for blob in blobs {
            let result = codec.import("user-1", blob).await;
            assert!(
                matches!(result, Err(BackupError::Corrupt { .. })),
                "blob {blob:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn unknown_envelope_version_is_corrupt() {
        let store = MemoryStore::new();
        let (_, codec) = make_codec(&store, cipher());

        let envelope = Envelope {
            format_version: FORMAT_VERSION + 1,
            created_at: Utc::now(),
            secrets: Vec::new(),
        };
        let payload = serde_json::to_vec(&envelope).unwrap();
        let mut blob = MAGIC.to_vec();
        blob.push(BLOB_VERSION);
        blob.extend(cipher().encrypt(&payload).unwrap());

        match codec.import("user-1", &blob).await {
            Err(BackupError::Corrupt { reason }) => assert!(reason.contains("format version")),
            other => panic!("expected corrupt backup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_embedded_ciphertext_encoding_is_corrupt() {
        let store = MemoryStore::new();
        let (_, codec) = make_codec(&store, cipher());

        let json = serde_json::json!({
            "format_version": FORMAT_VERSION,
            "created_at": Utc::now(),
            "secrets": [{
                "id": Uuid::new_v4(),
                "owner_id": "user-1",
                "title": "Gmail",
                "username": "me",
                "protected_password": "%%% not base64 %%%",
                "metadata": {},
                "version": 1,
                "created_at": Utc::now(),
                "updated_at": Utc::now(),
            }],
        });
        let payload = serde_json::to_vec(&json).unwrap();
        let mut blob = MAGIC.to_vec();
        blob.push(BLOB_VERSION);
        blob.extend(cipher().encrypt(&payload).unwrap());

        let result = codec.import("user-1", &blob).await;
        assert!(matches!(result, Err(BackupError::Corrupt { .. })));
        assert!(store.list_by_owner("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cross_tenant_collision_stops_with_partial_report() {
        let source = MemoryStore::new();
        let (vault, codec) = make_codec(&source, cipher());
        let (a, b) = seed(&vault, "user-1").await;
        let blob = codec.export("user-1").await.unwrap();

        // Same id as `a`, but owned by someone else in the target store.
        let target = MemoryStore::new();
        target
            .create(NewSecret {
                id: Some(a.id),
                owner_id: "user-2".to_owned(),
                title: "Not yours".to_owned(),
                username: String::new(),
                protected_password: vec![0; 28],
                metadata: Metadata::new(),
            })
            .await
            .unwrap();
        let (_, restored) = make_codec(&target, cipher());

        let result = restored.import("user-1", &blob).await;
        match result {
            Err(BackupError::Partial {
                applied,
                failed_id,
                source,
            }) => {
                assert_eq!(applied.created, vec![b.id]);
                assert!(applied.updated.is_empty());
                assert_eq!(failed_id, a.id);
                assert!(matches!(source, VaultError::Unauthorized { .. }));
            }
            other => panic!("expected partial import, got {other:?}"),
        }

        let foreign = target.get_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(foreign.owner_id, "user-2");
        assert_eq!(foreign.title, "Not yours");
        assert!(target.get_by_id(b.id).await.unwrap().is_some());
    }

    #[test]
    fn report_total_counts_both_lists() {
        let report = ImportReport {
            created: vec![Uuid::new_v4()],
            updated: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        assert_eq!(report.total(), 3);
    }
}
