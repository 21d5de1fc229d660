//! Dedup lock table trait.

use chrono::{DateTime, Duration, Utc};
use relaygate_types::error::RepositoryError;

/// Outcome of a lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAttempt {
    /// The key was absent (or expired) and is now held from `now`.
    Acquired,
    /// A live entry already holds the key.
    Held { acquired_at: DateTime<Utc> },
}

/// Shared table of dedup locks keyed by `task_status`.
///
/// Locks are never released explicitly. An entry older than the TTL is
/// treated as absent and swept on a later acquisition.
pub trait LockTable: Send + Sync {
    /// Sweep entries older than `ttl`, then insert `key` at `now` unless a
    /// live entry remains.
    ///
    /// Sweep, check and insert must be one atomic operation with respect to
    /// other callers of the same table: two concurrent acquisitions of one
    /// key must never both return [`LockAttempt::Acquired`].
    fn acquire(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<LockAttempt, RepositoryError>> + Send;

    /// Number of entries currently stored, expired or not.
    fn len(&self) -> impl std::future::Future<Output = Result<usize, RepositoryError>> + Send;
}
