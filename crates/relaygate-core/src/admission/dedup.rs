//! Short-lived dedup lock in front of the admission pipeline.

use chrono::Duration;
use relaygate_types::admission::{AdmissionDecision, normalize_status};
use relaygate_types::error::RepositoryError;

use crate::clock::Clock;
use crate::repository::lock::{LockAttempt, LockTable};

/// `task_status`, with the status normalized.
pub fn dedup_key(task_id: &str, status: &str) -> String {
    format!("{task_id}_{}", normalize_status(status))
}

/// Suppresses repeat deliveries of the same `(task, status)` pair for the
/// lock TTL. Locks are never released; they expire.
pub struct DedupGuard<L: LockTable, C: Clock> {
    locks: L,
    clock: C,
    ttl: Duration,
}

impl<L: LockTable, C: Clock> DedupGuard<L, C> {
    pub fn new(locks: L, clock: C, ttl: Duration) -> Self {
        Self { locks, clock, ttl }
    }

    /// Take the lock for `key`, or report how long ago it was taken.
    pub async fn acquire(&self, key: &str) -> Result<AdmissionDecision, RepositoryError> {
        let now = self.clock.now();
        match self.locks.acquire(key, now, self.ttl).await? {
            LockAttempt::Acquired => {
                tracing::debug!(dedup_key = key, "dedup lock acquired");
                Ok(AdmissionDecision::proceed())
            }
            LockAttempt::Held { acquired_at } => {
                let age = (now - acquired_at).num_milliseconds() as f64 / 1000.0;
                tracing::info!(dedup_key = key, age_secs = age, "duplicate delivery suppressed");
                Ok(AdmissionDecision::skip(format!("locked {age:.1}s ago")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::MemoryLocks;

    fn guard() -> (ManualClock, MemoryLocks, DedupGuard<MemoryLocks, ManualClock>) {
        let clock = ManualClock::default();
        let locks = MemoryLocks::default();
        let guard = DedupGuard::new(locks.clone(), clock.clone(), Duration::seconds(120));
        (clock, locks, guard)
    }

    #[test]
    fn test_dedup_key_normalizes_status() {
        assert_eq!(dedup_key("T1", " Reply "), "T1_reply");
        assert_eq!(dedup_key("T1", "Campaign-Live"), "T1_campaign live");
    }

    #[tokio::test]
    async fn test_second_acquire_within_ttl_skips() {
        let (clock, _locks, guard) = guard();
        assert_eq!(guard.acquire("T1_reply").await.unwrap(), AdmissionDecision::proceed());

        clock.advance(Duration::milliseconds(2500));
        let second = guard.acquire("T1_reply").await.unwrap();
        assert!(second.skip);
        assert_eq!(second.reason.as_deref(), Some("locked 2.5s ago"));
    }

    #[tokio::test]
    async fn test_lock_expires_after_ttl() {
        let (clock, locks, guard) = guard();
        guard.acquire("T1_reply").await.unwrap();

        clock.advance(Duration::seconds(120));
        assert!(guard.acquire("T1_reply").await.unwrap().skip);

        clock.advance(Duration::seconds(1));
        assert!(guard.acquire("T1_reply").await.unwrap().is_admitted());
        assert_eq!(locks.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_interfere() {
        let (_clock, _locks, guard) = guard();
        assert!(guard.acquire("T1_reply").await.unwrap().is_admitted());
        assert!(guard.acquire("T2_reply").await.unwrap().is_admitted());
        assert!(guard.acquire("T1_complete").await.unwrap().is_admitted());
    }

    #[tokio::test]
    async fn test_expired_entries_swept_on_access() {
        let (clock, locks, guard) = guard();
        guard.acquire("A_reply").await.unwrap();
        guard.acquire("B_reply").await.unwrap();
        clock.advance(Duration::seconds(200));

        guard.acquire("C_reply").await.unwrap();
        assert_eq!(locks.len().await.unwrap(), 1);
    }
}
