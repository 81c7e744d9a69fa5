//! Request-scoped database sessions.
//!
//! Every handler runs its database work through [`read`] or [`write`]: one
//! pooled connection and one transaction on the blocking thread pool. The
//! transaction commits when the closure returns `Ok` and rolls back on drop
//! otherwise.

use crate::api::ApiError;
use courier_db::DbPool;
use rusqlite::{Transaction, TransactionBehavior};

/// Runs read-only work in a deferred transaction.
pub async fn read<T, F>(pool: &DbPool, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T, ApiError> + Send + 'static,
{
    run(pool, TransactionBehavior::Deferred, op).await
}

/// Runs mutating work in an immediate transaction, so the write lock is
/// taken (honoring the busy timeout) before the first statement.
pub async fn write<T, F>(pool: &DbPool, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T, ApiError> + Send + 'static,
{
    run(pool, TransactionBehavior::Immediate, op).await
}

async fn run<T, F>(pool: &DbPool, behavior: TransactionBehavior, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T, ApiError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| ApiError::InternalServerError(format!("db connection failed: {}", e)))?;

        let tx = conn.transaction_with_behavior(behavior).map_err(|e| {
            ApiError::InternalServerError(format!("failed to begin transaction: {}", e))
        })?;

        let value = op(&tx)?;

        tx.commit()
            .map_err(|e| ApiError::InternalServerError(format!("failed to commit: {}", e)))?;
        Ok(value)
    })
    .await
    .map_err(|e| ApiError::InternalServerError(format!("task join error: {}", e)))?
}
