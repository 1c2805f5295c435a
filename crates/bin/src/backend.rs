//! Backend creation and utility functions.

use std::path::PathBuf;

use castgate::{
    CredentialStore,
    backend::{
        CredentialBackend,
        database::{InMemory, Postgres, Sqlite},
    },
    constants::DEFAULT_LOOKUP_KEY,
    user::{HasherConfig, LookupKey, SecretHasher},
};

use crate::cli::{Backend, BackendConfig};

/// File name of the SQLite database inside the data directory
const SQLITE_FILE: &str = "castgate.db";
/// File name of the JSON user file inside the data directory
const USERS_FILE: &str = "users.json";

/// Redact credentials from a PostgreSQL connection URL for safe logging
pub fn redact_postgres_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut redacted = parsed.clone();
        if !parsed.username().is_empty() {
            let _ = redacted.set_username("***");
        }
        if parsed.password().is_some() {
            let _ = redacted.set_password(Some("***"));
        }
        redacted.to_string()
    } else {
        "postgres://***@<unparsable-url>".to_string()
    }
}

/// Create the appropriate backend based on configuration
pub async fn create_backend(
    config: &BackendConfig,
) -> Result<Box<dyn CredentialBackend>, Box<dyn std::error::Error>> {
    let data_dir = config.data_dir.clone().unwrap_or_else(|| PathBuf::from("."));

    match config.backend {
        Backend::Sqlite => {
            tokio::fs::create_dir_all(&data_dir).await?;
            let db_path = data_dir.join(SQLITE_FILE);
            tracing::info!("Using SQLite backend at {}", db_path.display());
            Ok(Box::new(Sqlite::open_sqlite(&db_path).await?))
        }
        Backend::Postgres => {
            let url = config
                .postgres_url
                .as_ref()
                .ok_or("PostgreSQL backend requires --postgres-url or CASTGATE_POSTGRES_URL")?;

            let display_url = redact_postgres_url(url);
            tracing::info!("Connecting to PostgreSQL backend at {}", display_url);

            match Postgres::connect_postgres(url).await {
                Ok(backend) => {
                    tracing::info!("Connected to PostgreSQL successfully");
                    Ok(Box::new(backend))
                }
                Err(e) => {
                    Err(format!("Failed to connect to PostgreSQL at {}: {}", display_url, e).into())
                }
            }
        }
        Backend::Inmemory => {
            tokio::fs::create_dir_all(&data_dir).await?;
            let json_path = data_dir.join(USERS_FILE);
            tracing::info!(
                "Using in-memory backend with persistence at {}",
                json_path.display()
            );
            // A missing file is an empty store; a corrupt one is fatal
            match InMemory::load_from_file(&json_path).await {
                Ok(backend) => Ok(Box::new(backend)),
                Err(e) if e.is_locked() => Err(format!(
                    "{e}; stop the running server or use a database backend to manage users \
                     while it runs"
                )
                .into()),
                Err(e) => Err(e.into()),
            }
        }
    }
}

/// Build the secret hasher from the configured work factor.
pub fn create_hasher(config: &BackendConfig) -> castgate::Result<SecretHasher> {
    let defaults = HasherConfig::default();
    SecretHasher::new(HasherConfig {
        memory_kib: config.hash_memory_kib.unwrap_or(defaults.memory_kib),
        iterations: config.hash_iterations.unwrap_or(defaults.iterations),
        parallelism: config.hash_parallelism.unwrap_or(defaults.parallelism),
    })
}

/// Open the credential store described by the configuration.
pub async fn open_store(
    config: &BackendConfig,
) -> Result<CredentialStore, Box<dyn std::error::Error>> {
    let hasher = create_hasher(config)?;
    let lookup = match &config.lookup_key {
        Some(key) => LookupKey::new(key.as_bytes())?,
        None => {
            tracing::warn!(
                "No --lookup-key configured; stream-key lookup digests use the built-in key"
            );
            LookupKey::new(DEFAULT_LOOKUP_KEY)?
        }
    };
    let backend = create_backend(config).await?;
    Ok(CredentialStore::new(backend, hasher, lookup))
}
