//! SQLite dedup lock table.
//!
//! Acquisition runs as one transaction on the single-connection writer pool:
//! sweep expired rows, insert-if-absent, and read back the holder on
//! conflict. Two acquisitions of one key therefore never both succeed.

use chrono::{DateTime, Duration, Utc};
use relaygate_core::repository::lock::{LockAttempt, LockTable};
use relaygate_types::error::RepositoryError;

use super::pool::DatabasePool;

#[derive(Clone)]
pub struct SqliteLockTable {
    pool: DatabasePool,
}

impl SqliteLockTable {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

impl LockTable for SqliteLockTable {
    async fn acquire(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<LockAttempt, RepositoryError> {
        let now_ms = now.timestamp_millis();
        let cutoff_ms = now_ms - ttl.num_milliseconds();

        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let swept = sqlx::query("DELETE FROM dedup_locks WHERE acquired_at_ms < ?")
            .bind(cutoff_ms)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?
            .rows_affected();
        if swept > 0 {
            tracing::debug!(swept, "expired dedup locks removed");
        }

        let inserted = sqlx::query(
            "INSERT INTO dedup_locks (lock_key, acquired_at_ms) VALUES (?, ?)
             ON CONFLICT(lock_key) DO NOTHING",
        )
        .bind(key)
        .bind(now_ms)
        .execute(&mut *tx)
        .await
        .map_err(query_err)?
        .rows_affected();

        let attempt = if inserted == 1 {
            LockAttempt::Acquired
        } else {
            let (held_ms,): (i64,) =
                sqlx::query_as("SELECT acquired_at_ms FROM dedup_locks WHERE lock_key = ?")
                    .bind(key)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(query_err)?;
            let acquired_at = DateTime::from_timestamp_millis(held_ms).ok_or_else(|| {
                RepositoryError::Query(format!("invalid lock timestamp: {held_ms}"))
            })?;
            LockAttempt::Held { acquired_at }
        };

        tx.commit().await.map_err(query_err)?;
        Ok(attempt)
    }

    async fn len(&self) -> Result<usize, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dedup_locks")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(query_err)?;
        Ok(count as usize)
    }
}
