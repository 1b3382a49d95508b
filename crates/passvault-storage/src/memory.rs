//! In-memory secret store for testing.
//!
//! This store keeps all records in a `BTreeMap` behind a `RwLock`. It is not
//! persistent; all data is lost when the process exits. Use this for unit
//! tests, integration tests, and local development.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{NewSecret, Secret, SecretChanges, SecretStore, StorageError};

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<Uuid, Row>,
    next_seq: u64,
}

#[derive(Debug)]
struct Row {
    /// Insertion order, used to break `created_at` ties when listing.
    seq: u64,
    secret: Secret,
}

/// An in-memory secret store.
///
/// Thread-safe and async-compatible. Cloning shares the underlying map, so a
/// test can keep a handle to inspect what the service persisted.
///
/// # Examples
///
/// ```
/// # use passvault_storage::{MemoryStore, NewSecret, SecretStore};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// let created = store
///     .create(NewSecret {
///         id: None,
///         owner_id: "user-1".to_owned(),
///         title: "Gmail".to_owned(),
///         username: "me@example.com".to_owned(),
///         protected_password: vec![1, 2, 3],
///         metadata: serde_json::Map::new(),
///     })
///     .await
///     .unwrap();
/// assert_eq!(created.version, 1);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SecretStore for MemoryStore {
    async fn create(&self, secret: NewSecret) -> Result<Secret, StorageError> {
        let mut inner = self.inner.write().await;

        let id = secret.id.unwrap_or_else(Uuid::new_v4);
        if inner.rows.contains_key(&id) {
            return Err(StorageError::Conflict { id });
        }

        let now = Utc::now();
        let stored = Secret {
            id,
            owner_id: secret.owner_id,
            title: secret.title,
            username: secret.username,
            protected_password: secret.protected_password,
            metadata: secret.metadata,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        let seq = inner.next_seq;
        inner.next_seq = seq.saturating_add(1);
        inner.rows.insert(
            id,
            Row {
                seq,
                secret: stored.clone(),
            },
        );
        Ok(stored)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Secret>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner.rows.get(&id).map(|row| row.secret.clone()))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Secret>, StorageError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<&Row> = inner
            .rows
            .values()
            .filter(|row| row.secret.owner_id == owner_id)
            .collect();
        rows.sort_by(|a, b| {
            b.secret
                .created_at
                .cmp(&a.secret.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(rows.into_iter().map(|row| row.secret.clone()).collect())
    }

    async fn update(&self, changes: SecretChanges) -> Result<Secret, StorageError> {
        let mut inner = self.inner.write().await;
        let row = inner
            .rows
            .get_mut(&changes.id)
            .ok_or(StorageError::NotFound { id: changes.id })?;

        if let Some(expected) = changes.expected_version {
            if row.secret.version != expected {
                return Err(StorageError::VersionConflict {
                    id: changes.id,
                    expected,
                    actual: row.secret.version,
                });
            }
        }

        let secret = &mut row.secret;
        secret.title = changes.title;
        secret.username = changes.username;
        secret.protected_password = changes.protected_password;
        secret.metadata = changes.metadata;
        secret.version = secret.version.saturating_add(1);
        secret.updated_at = Utc::now();
        Ok(secret.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        inner.rows.remove(&id);
        Ok(())
    }
}
