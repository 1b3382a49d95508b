//! PostgreSQL secret store.
//!
//! Stores every record in a single `secrets` table. The `protected_password`
//! column only ever holds ciphertext; metadata is kept as `JSONB` without
//! interpretation.
//!
//! Feature-gated behind `postgres-backend`. Uses `sqlx` with the Tokio
//! runtime for fully async operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{Metadata, NewSecret, Secret, SecretChanges, SecretStore, StorageError};

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS secrets (\
        id                 UUID        PRIMARY KEY, \
        owner_id           TEXT        NOT NULL, \
        title              TEXT        NOT NULL, \
        username           TEXT        NOT NULL DEFAULT '', \
        protected_password BYTEA       NOT NULL, \
        metadata           JSONB       NOT NULL DEFAULT '{}'::jsonb, \
        version            BIGINT      NOT NULL DEFAULT 1, \
        created_at         TIMESTAMPTZ NOT NULL DEFAULT now(), \
        updated_at         TIMESTAMPTZ NOT NULL DEFAULT now()\
    )",
    "CREATE INDEX IF NOT EXISTS idx_secrets_owner_created \
     ON secrets (owner_id, created_at DESC)",
];

#[derive(sqlx::FromRow)]
struct SecretRow {
    id: Uuid,
    owner_id: String,
    title: String,
    username: String,
    protected_password: Vec<u8>,
    metadata: Json<Metadata>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SecretRow> for Secret {
    fn from(row: SecretRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            username: row.username,
            protected_password: row.protected_password,
            metadata: row.metadata.0,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A secret store backed by PostgreSQL.
///
/// Thread-safe via `PgPool` (connection pool). All operations are fully async.
///
/// # Examples
///
/// ```no_run
/// # use passvault_storage::PostgresStore;
/// # #[tokio::main]
/// # async fn main() {
/// let store = PostgresStore::connect("postgres://localhost/passvault").await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresStore {
    /// Connect to PostgreSQL and create the `secrets` table if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the connection or migration fails.
    /// The connection string is never echoed back in the error.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Open {
                target: "postgres".to_owned(),
                reason: e.to_string(),
            })?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, running the schema migration on it.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the migration fails.
    pub async fn from_pool(pool: PgPool) -> Result<Self, StorageError> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| StorageError::Open {
                    target: "postgres".to_owned(),
                    reason: format!("migration failed: {e}"),
                })?;
        }

        tracing::debug!("secrets schema ready");
        Ok(Self { pool })
    }

    /// Return a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[async_trait::async_trait]
impl SecretStore for PostgresStore {
    async fn create(&self, secret: NewSecret) -> Result<Secret, StorageError> {
        let id = secret.id.unwrap_or_else(Uuid::new_v4);

        let row = sqlx::query_as::<_, SecretRow>(
            r"INSERT INTO secrets
                  (id, owner_id, title, username, protected_password, metadata, version)
              VALUES ($1, $2, $3, $4, $5, $6, 1)
              RETURNING *",
        )
        .bind(id)
        .bind(&secret.owner_id)
        .bind(&secret.title)
        .bind(&secret.username)
        .bind(&secret.protected_password)
        .bind(Json(&secret.metadata))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict { id }
            } else {
                StorageError::Write {
                    id,
                    reason: e.to_string(),
                }
            }
        })?;

        Ok(row.into())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Secret>, StorageError> {
        let row = sqlx::query_as::<_, SecretRow>("SELECT * FROM secrets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Read {
                id,
                reason: e.to_string(),
            })?;

        Ok(row.map(Secret::from))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Secret>, StorageError> {
        let rows = sqlx::query_as::<_, SecretRow>(
            "SELECT * FROM secrets WHERE owner_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::List {
            owner_id: owner_id.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(rows.into_iter().map(Secret::from).collect())
    }

    async fn update(&self, changes: SecretChanges) -> Result<Secret, StorageError> {
        let id = changes.id;
        let write_err = |e: sqlx::Error| StorageError::Write {
            id,
            reason: e.to_string(),
        };

        // The version bump and the optional version check happen in the same
        // statement, so concurrent writers can never skip or reuse a version.
        let row = sqlx::query_as::<_, SecretRow>(
            r"UPDATE secrets
              SET title = $2, username = $3, protected_password = $4, metadata = $5,
                  version = version + 1, updated_at = now()
              WHERE id = $1 AND ($6::BIGINT IS NULL OR version = $6)
              RETURNING *",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.username)
        .bind(&changes.protected_password)
        .bind(Json(&changes.metadata))
        .bind(changes.expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_err)?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        let current: Option<(i64,)> = sqlx::query_as("SELECT version FROM secrets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(write_err)?;

        match (current, changes.expected_version) {
            (Some((actual,)), Some(expected)) => Err(StorageError::VersionConflict {
                id,
                expected,
                actual,
            }),
            _ => Err(StorageError::NotFound { id }),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM secrets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Delete {
                id,
                reason: e.to_string(),
            })?;

        Ok(())
    }
}
