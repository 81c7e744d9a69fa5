//! Embedded SQL migration runner.
//!
//! Migrations are SQL files compiled into the binary and applied in list
//! order. Applied migrations are recorded in the `_courier_migrations`
//! bookkeeping table, so each one runs exactly once per database.

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use thiserror::Error;

/// A single embedded migration.
struct Migration {
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. New migrations are appended here.
const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "001_users",
        sql: include_str!("migrations/001_users.sql"),
    },
    Migration {
        name: "002_messages",
        sql: include_str!("migrations/002_messages.sql"),
    },
    Migration {
        name: "003_message_recipients",
        sql: include_str!("migrations/003_message_recipients.sql"),
    },
];

/// Applied state of one known migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Migration name, e.g. `001_users`.
    pub name: &'static str,
    /// When the migration was applied, or `None` while pending.
    pub applied_at: Option<String>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Errors that can occur during migration execution.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A SQL statement within a migration failed.
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        /// The name of the migration that failed.
        name: String,
        /// The underlying SQLite error.
        source: rusqlite::Error,
    },

    /// Failed to query migration state.
    #[error("failed to check migration state: {0}")]
    StateQuery(rusqlite::Error),
}

/// Upgrades the database to the newest embedded migration.
///
/// Migrations already recorded in `_courier_migrations` are skipped; the rest
/// are applied in order, each in its own transaction together with its
/// bookkeeping row. Returns how many migrations were applied, so a database
/// already at head yields `0`.
///
/// # Errors
///
/// Returns `MigrationError` if any migration fails to execute or if the
/// bookkeeping table cannot be queried. The failing migration leaves no
/// trace; earlier migrations in the same run stay applied.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    run_migrations_from_list(conn, MIGRATIONS)
}

/// Lists every embedded migration with its applied timestamp.
///
/// # Errors
///
/// Returns `MigrationError::StateQuery` if the bookkeeping table cannot be read.
pub fn migration_status(conn: &Connection) -> Result<Vec<MigrationStatus>, MigrationError> {
    ensure_tracking_table(conn)?;

    let mut statuses = Vec::with_capacity(MIGRATIONS.len());
    for migration in MIGRATIONS {
        let applied_at: Option<String> = conn
            .query_row(
                "SELECT applied_at FROM _courier_migrations WHERE name = ?1",
                [migration.name],
                |row| row.get(0),
            )
            .optional()
            .map_err(MigrationError::StateQuery)?;
        statuses.push(MigrationStatus {
            name: migration.name,
            applied_at,
        });
    }
    Ok(statuses)
}

/// Name of the newest embedded migration.
pub fn head() -> &'static str {
    MIGRATIONS.last().map(|m| m.name).unwrap_or("")
}

fn ensure_tracking_table(conn: &Connection) -> Result<(), MigrationError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _courier_migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );",
    )
    .map_err(|e| MigrationError::ExecutionFailed {
        name: "_courier_migrations_bootstrap".to_string(),
        source: e,
    })
}

fn run_migrations_from_list(
    conn: &Connection,
    migrations: &[Migration],
) -> Result<usize, MigrationError> {
    ensure_tracking_table(conn)?;

    let mut applied = 0;

    for migration in migrations {
        let failed = |e: rusqlite::Error| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source: e,
        };

        // Take the write lock before checking, so a concurrent runner waits
        // and then sees this migration as applied.
        let tx =
            Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(failed)?;

        let already_applied: bool = tx
            .query_row(
                "SELECT COUNT(*) > 0 FROM _courier_migrations WHERE name = ?1",
                [migration.name],
                |row| row.get(0),
            )
            .map_err(MigrationError::StateQuery)?;

        if already_applied {
            tracing::debug!(
                migration = migration.name,
                "migration already applied, skipping"
            );
            continue;
        }

        tracing::info!(migration = migration.name, "applying migration");

        tx.execute_batch(migration.sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO _courier_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;

        applied += 1;
    }

    Ok(applied)
}
