//! TTL cache in front of the CURRENT version of the signing secret.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use relaygate_types::error::SecretError;
use relaygate_types::secret::{Redacted, SecretPayload, SecretStage};

use crate::clock::Clock;
use crate::repository::secret_store::SecretStore;

#[derive(Debug, Clone)]
struct CachedSecret {
    value: Redacted,
    fetched_at: DateTime<Utc>,
}

/// Caches the CURRENT secret value for a fixed TTL.
///
/// A rotation does not invalidate the cache: verifiers keep the old value
/// until the entry expires. The lock is never held across an await, so two
/// concurrent misses may both fetch; the last writer wins.
pub struct SecretCache<S: SecretStore, C: Clock> {
    store: S,
    clock: C,
    secret_id: Option<String>,
    ttl: Duration,
    entry: RwLock<Option<CachedSecret>>,
}

impl<S: SecretStore, C: Clock> SecretCache<S, C> {
    pub fn new(store: S, clock: C, secret_id: Option<String>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            secret_id,
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Return the signing secret, fetching from the store if the cached
    /// entry is missing or older than the TTL.
    pub async fn get_secret(&self) -> Result<Redacted, SecretError> {
        let now = self.clock.now();
        if let Some(value) = self.fresh(now) {
            return Ok(value);
        }

        let secret_id = self
            .secret_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SecretError::NotConfigured("auth.secret_id".to_string()))?;

        let version = self
            .store
            .get(secret_id, SecretStage::Current)
            .await?
            .ok_or_else(|| SecretError::Unavailable(secret_id.to_string()))?;

        let value = Redacted::new(SecretPayload::secret_from_stored(version.value.expose()));
        if value.expose().trim().is_empty() {
            tracing::warn!(secret_id, version_id = %version.version_id, "CURRENT secret value is empty");
            return Err(SecretError::Unavailable(secret_id.to_string()));
        }

        tracing::debug!(secret_id, version_id = %version.version_id, "refreshed signing secret");

        let mut entry = self.entry.write().unwrap_or_else(|e| e.into_inner());
        *entry = Some(CachedSecret {
            value: value.clone(),
            fetched_at: now,
        });

        Ok(value)
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn fresh(&self, now: DateTime<Utc>) -> Option<Redacted> {
        let entry = self.entry.read().unwrap_or_else(|e| e.into_inner());
        entry
            .as_ref()
            .filter(|cached| now - cached.fetched_at < self.ttl)
            .map(|cached| cached.value.clone())
    }
}
