//! Database layer for Courier.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations with a bookkeeping table, and the column encodings
//! the stores share. Every table is created through versioned migrations
//! managed by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: no external database process is required, and
//!   WAL allows concurrent readers alongside a single writer.
//! - **`r2d2` connection pool**: one pooled connection per request-scoped
//!   session, with bounded reuse across requests.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema cannot drift from the code using it.

mod columns;
mod migrations;
mod pool;

pub use columns::{
    constraint_violation, format_timestamp, get_optional_timestamp, get_timestamp, get_uuid, now,
    ConstraintViolation,
};
pub use migrations::{head, migration_status, run_migrations, MigrationError, MigrationStatus};
pub use pool::{create_pool, database_path_from_url, DbPool, DbRuntimeSettings, PoolError};
