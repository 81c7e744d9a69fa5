//! Process startup shared by `courier-server` and `courier-migrate`.

use crate::config::{DatabaseConfig, LoggingConfig};
use courier_db::{create_pool, run_migrations, DbPool, MigrationError, PoolError};
use std::path::Path;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors that prevent the database from being opened or upgraded.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to get database connection: {0}")]
    Connection(#[from] r2d2::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Installs the global tracing subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Builds the connection pool for the configured database, creating the
/// database file's parent directory if it does not exist yet.
pub fn open_pool(config: &DatabaseConfig) -> Result<DbPool, StartupError> {
    let path = config.path()?;

    if path != ":memory:" {
        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| StartupError::CreateDir {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
    }

    Ok(create_pool(&path, config.runtime_settings())?)
}

/// Upgrades the database behind `pool` to the newest migration.
pub fn migrate_to_head(pool: &DbPool) -> Result<usize, StartupError> {
    let conn = pool.get()?;
    let applied = run_migrations(&conn)?;
    if applied > 0 {
        tracing::info!(count = applied, "applied database migrations");
    }
    Ok(applied)
}
