//! Integration tests for the PostgreSQL secret store.
//!
//! Only compiled with `--features postgres-backend`, and skipped unless
//! `PASSVAULT_TEST_DATABASE_URL` points at a disposable database.

#![cfg(feature = "postgres-backend")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use passvault_storage::{
    Metadata, NewSecret, PostgresStore, SecretChanges, SecretStore, StorageError,
};
use uuid::Uuid;

async fn connect() -> Option<PostgresStore> {
    let url = std::env::var("PASSVAULT_TEST_DATABASE_URL").ok()?;
    let store = PostgresStore::connect(&url).await;
    Some(store.expect("connect to test database"))
}

fn new_secret(owner: &str, title: &str) -> NewSecret {
    let mut metadata = Metadata::new();
    metadata.insert("url".to_owned(), serde_json::json!("gmail.com"));
    NewSecret {
        id: None,
        owner_id: owner.to_owned(),
        title: title.to_owned(),
        username: "agent".to_owned(),
        protected_password: b"enc_password_123".to_vec(),
        metadata,
    }
}

#[tokio::test]
async fn create_get_update_delete_lifecycle() {
    let Some(store) = connect().await else {
        return;
    };
    let owner = format!("owner-{}", Uuid::new_v4());

    let created = store.create(new_secret(&owner, "Gmail")).await.unwrap();
    assert_eq!(created.version, 1);

    let found = store.get_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(found.title, "Gmail");
    assert_eq!(found.metadata["url"], "gmail.com");
    assert_eq!(found.protected_password, b"enc_password_123");

    let updated = store
        .update(SecretChanges {
            id: created.id,
            title: "New Title".to_owned(),
            username: found.username.clone(),
            protected_password: found.protected_password.clone(),
            metadata: found.metadata.clone(),
            expected_version: Some(1),
        })
        .await
        .unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.title, "New Title");

    let stale = store
        .update(SecretChanges {
            id: created.id,
            title: "Stale".to_owned(),
            username: found.username,
            protected_password: found.protected_password,
            metadata: found.metadata,
            expected_version: Some(1),
        })
        .await;
    assert!(matches!(
        stale,
        Err(StorageError::VersionConflict {
            expected: 1,
            actual: 2,
            ..
        })
    ));

    store.delete(created.id).await.unwrap();
    store.delete(created.id).await.unwrap();
    assert!(store.get_by_id(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn list_is_scoped_to_owner() {
    let Some(store) = connect().await else {
        return;
    };
    let owner = format!("owner-{}", Uuid::new_v4());
    let other = format!("owner-{}", Uuid::new_v4());

    store.create(new_secret(&owner, "one")).await.unwrap();
    store.create(new_secret(&other, "two")).await.unwrap();

    let listed = store.list_by_owner(&owner).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "one");
}

#[tokio::test]
async fn duplicate_explicit_id_conflicts() {
    let Some(store) = connect().await else {
        return;
    };
    let id = Uuid::new_v4();
    let mut input = new_secret("owner-dup", "dup");
    input.id = Some(id);

    store.create(input.clone()).await.unwrap();
    let result = store.create(input).await;
    assert!(matches!(result, Err(StorageError::Conflict { .. })));
    store.delete(id).await.unwrap();
}
