//! Server configuration for `PassVault`.
//!
//! Loads configuration from environment variables. Everything except the
//! encryption key has a default; a missing or malformed key stops the
//! process before it binds a socket.

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderName;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use passvault_core::MasterKey;
use zeroize::Zeroizing;

/// Default identity header.
pub const DEFAULT_IDENTITY_HEADER: &str = "x-passvault-user";

/// Default import body limit (10 MiB).
pub const DEFAULT_MAX_BACKUP_BYTES: usize = 10 * 1024 * 1024;

const DEFAULT_PORT: u16 = 8080;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `PASSVAULT_ENCRYPTION_KEY` is not set.
    #[error("PASSVAULT_ENCRYPTION_KEY is required")]
    MissingKey,

    /// The encryption key could not be decoded or has the wrong length.
    #[error("invalid PASSVAULT_ENCRYPTION_KEY: {reason}")]
    InvalidKey { reason: String },

    /// A variable holds a value that does not parse.
    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },

    /// `PASSVAULT_STORAGE` names an unknown backend.
    #[error("unknown storage backend '{value}': expected 'memory' or 'postgres'")]
    UnknownStorage { value: String },

    /// Postgres storage was selected without `DATABASE_URL`.
    #[error("DATABASE_URL is required when PASSVAULT_STORAGE=postgres")]
    MissingDatabaseUrl,
}

/// Supported storage backend types.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// PostgreSQL persistent storage.
    Postgres { url: String },
}

impl StorageBackendType {
    /// Backend name for logs. Never includes the connection string.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }
}

impl fmt::Debug for StorageBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            // The URL carries the database password.
            Self::Postgres { .. } => f.debug_struct("Postgres").finish_non_exhaustive(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Master key for password and backup encryption.
    pub encryption_key: MasterKey,
    /// Header carrying the authenticated caller id.
    pub identity_header: HeaderName,
    /// Largest accepted backup upload in bytes.
    pub max_backup_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PASSVAULT_BIND_ADDR`: full bind address (default: `127.0.0.1:8080`)
    /// - `PORT`: port to bind on `0.0.0.0`, used when `PASSVAULT_BIND_ADDR` is unset
    /// - `PASSVAULT_STORAGE`: `memory` or `postgres` (default: `memory`)
    /// - `DATABASE_URL`: PostgreSQL connection string (required for `postgres`)
    /// - `PASSVAULT_LOG_LEVEL`: log filter (default: `info`)
    /// - `PASSVAULT_ENCRYPTION_KEY`: 16, 24 or 32 bytes, raw or `base64:<encoded>` (required)
    /// - `PASSVAULT_IDENTITY_HEADER`: identity header name (default: `x-passvault-user`)
    /// - `PASSVAULT_MAX_BACKUP_BYTES`: import body limit (default: 10 MiB)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key is missing or invalid, or if any
    /// variable is set to a value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Priority: PASSVAULT_BIND_ADDR > PORT > default 127.0.0.1:8080
        let bind_addr = if let Some(addr) = lookup("PASSVAULT_BIND_ADDR") {
            addr.parse().map_err(|_| ConfigError::InvalidValue {
                var: "PASSVAULT_BIND_ADDR",
                value: addr,
            })?
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port.parse().map_err(|_| ConfigError::InvalidValue {
                var: "PORT",
                value: port,
            })?;
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
        };

        let storage = lookup("PASSVAULT_STORAGE").unwrap_or_else(|| "memory".to_owned());
        let storage_backend = match storage.to_lowercase().as_str() {
            "memory" => StorageBackendType::Memory,
            "postgres" | "postgresql" => StorageBackendType::Postgres {
                url: lookup("DATABASE_URL").ok_or(ConfigError::MissingDatabaseUrl)?,
            },
            _ => return Err(ConfigError::UnknownStorage { value: storage }),
        };

        let log_level = lookup("PASSVAULT_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let raw_key = lookup("PASSVAULT_ENCRYPTION_KEY").ok_or(ConfigError::MissingKey)?;
        let raw_key = Zeroizing::new(raw_key);
        let encryption_key = parse_key(&raw_key)?;

        let header = lookup("PASSVAULT_IDENTITY_HEADER")
            .unwrap_or_else(|| DEFAULT_IDENTITY_HEADER.to_owned());
        let Ok(identity_header) = HeaderName::try_from(header.as_str()) else {
            return Err(ConfigError::InvalidValue {
                var: "PASSVAULT_IDENTITY_HEADER",
                value: header,
            });
        };

        let max_backup_bytes = match lookup("PASSVAULT_MAX_BACKUP_BYTES") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                var: "PASSVAULT_MAX_BACKUP_BYTES",
                value,
            })?,
            None => DEFAULT_MAX_BACKUP_BYTES,
        };

        Ok(Self {
            bind_addr,
            storage_backend,
            log_level,
            encryption_key,
            identity_header,
            max_backup_bytes,
        })
    }
}

fn parse_key(raw: &str) -> Result<MasterKey, ConfigError> {
    let bytes = match raw.strip_prefix("base64:") {
        Some(encoded) => STANDARD
            .decode(encoded.trim())
            .map_err(|_| ConfigError::InvalidKey {
                reason: "not valid base64".to_owned(),
            })?,
        None => raw.as_bytes().to_vec(),
    };
    let bytes = Zeroizing::new(bytes);
    MasterKey::from_bytes(&bytes).map_err(|e| ConfigError::InvalidKey {
        reason: e.to_string(),
    })
}
