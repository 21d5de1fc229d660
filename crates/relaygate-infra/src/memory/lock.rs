//! In-memory dedup lock table.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use relaygate_core::repository::lock::{LockAttempt, LockTable};
use relaygate_types::error::RepositoryError;

/// Lock table keyed by dedup key.
///
/// The per-key decision runs under the key's shard lock via the entry API,
/// so concurrent acquisitions of one key cannot both succeed. Sweeping other
/// keys happens afterwards and only reclaims memory.
#[derive(Clone, Default)]
pub struct MemoryLockTable {
    entries: Arc<DashMap<String, DateTime<Utc>>>,
}

impl MemoryLockTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockTable for MemoryLockTable {
    async fn acquire(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<LockAttempt, RepositoryError> {
        let attempt = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut held) if now - *held.get() > ttl => {
                held.insert(now);
                LockAttempt::Acquired
            }
            Entry::Occupied(held) => LockAttempt::Held {
                acquired_at: *held.get(),
            },
            Entry::Vacant(slot) => {
                slot.insert(now);
                LockAttempt::Acquired
            }
        };

        self.entries.retain(|_, at| now - *at <= ttl);
        Ok(attempt)
    }

    async fn len(&self) -> Result<usize, RepositoryError> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn test_acquire_held_and_expiry() {
        let locks = MemoryLockTable::new();
        let ttl = Duration::seconds(120);

        assert_eq!(locks.acquire("k", t0(), ttl).await.unwrap(), LockAttempt::Acquired);
        assert_eq!(
            locks.acquire("k", t0() + Duration::seconds(120), ttl).await.unwrap(),
            LockAttempt::Held { acquired_at: t0() }
        );
        assert_eq!(
            locks.acquire("k", t0() + Duration::seconds(121), ttl).await.unwrap(),
            LockAttempt::Acquired
        );
    }

    #[tokio::test]
    async fn test_sweep_on_access() {
        let locks = MemoryLockTable::new();
        let ttl = Duration::seconds(120);
        locks.acquire("a", t0(), ttl).await.unwrap();
        locks.acquire("b", t0(), ttl).await.unwrap();

        locks.acquire("c", t0() + Duration::minutes(3), ttl).await.unwrap();
        assert_eq!(locks.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_acquisitions_admit_one() {
        let locks = MemoryLockTable::new();
        let ttl = Duration::seconds(120);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            handles.push(tokio::spawn(async move {
                locks.acquire("T1_reply", t0(), ttl).await.unwrap()
            }));
        }

        let mut acquired = 0;
        for handle in handles {
            if handle.await.unwrap() == LockAttempt::Acquired {
                acquired += 1;
            }
        }
        assert_eq!(acquired, 1);
    }
}
