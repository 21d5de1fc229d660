//! Storage backend selection.
//!
//! The core services are generic over their ports. The binary picks SQLite
//! or in-memory storage at startup, so each port gets an enum that
//! delegates to whichever adapter was chosen.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use relaygate_core::repository::client::ClientRegistry;
use relaygate_core::repository::lock::{LockAttempt, LockTable};
use relaygate_core::repository::secret_store::SecretStore;
use relaygate_types::admission::ClientStatusRecord;
use relaygate_types::error::RepositoryError;
use relaygate_types::secret::{SecretStage, SecretVersion, VersionStages};

use crate::memory::{MemoryClientRegistry, MemoryLockTable, MemorySecretStore};
use crate::sqlite::pool::database_url;
use crate::sqlite::{DatabasePool, SqliteClientRegistry, SqliteLockTable, SqliteSecretStore};

#[derive(Clone)]
pub enum SecretBackend {
    Sqlite(SqliteSecretStore),
    Memory(MemorySecretStore),
}

#[derive(Clone)]
pub enum LockBackend {
    Sqlite(SqliteLockTable),
    Memory(MemoryLockTable),
}

#[derive(Clone)]
pub enum ClientBackend {
    Sqlite(SqliteClientRegistry),
    Memory(MemoryClientRegistry),
}

/// One handle per port, all sharing the same underlying storage.
#[derive(Clone)]
pub struct Backend {
    pub secrets: SecretBackend,
    pub locks: LockBackend,
    pub clients: ClientBackend,
}

impl Backend {
    /// SQLite database at `{data_dir}/relaygate.db`, migrated on open.
    pub async fn sqlite(data_dir: &Path) -> Result<Self, sqlx::Error> {
        let url = format!("{}?mode=rwc", database_url(data_dir));
        let pool = DatabasePool::new(&url).await?;
        tracing::debug!(url = %url, "opened sqlite backend");
        Ok(Self {
            secrets: SecretBackend::Sqlite(SqliteSecretStore::new(pool.clone())),
            locks: LockBackend::Sqlite(SqliteLockTable::new(pool.clone())),
            clients: ClientBackend::Sqlite(SqliteClientRegistry::new(pool)),
        })
    }

    pub fn memory() -> Self {
        Self {
            secrets: SecretBackend::Memory(MemorySecretStore::new()),
            locks: LockBackend::Memory(MemoryLockTable::new()),
            clients: ClientBackend::Memory(MemoryClientRegistry::new()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.secrets {
            SecretBackend::Sqlite(_) => "sqlite",
            SecretBackend::Memory(_) => "memory",
        }
    }
}

impl SecretStore for SecretBackend {
    async fn get(
        &self,
        secret_id: &str,
        stage: SecretStage,
    ) -> Result<Option<SecretVersion>, RepositoryError> {
        match self {
            Self::Sqlite(store) => store.get(secret_id, stage).await,
            Self::Memory(store) => store.get(secret_id, stage).await,
        }
    }

    async fn get_version(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Option<SecretVersion>, RepositoryError> {
        match self {
            Self::Sqlite(store) => store.get_version(secret_id, version_id).await,
            Self::Memory(store) => store.get_version(secret_id, version_id).await,
        }
    }

    async fn put(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &str,
        stages: &[SecretStage],
    ) -> Result<(), RepositoryError> {
        match self {
            Self::Sqlite(store) => store.put(secret_id, version_id, value, stages).await,
            Self::Memory(store) => store.put(secret_id, version_id, value, stages).await,
        }
    }

    async fn list_versions(&self, secret_id: &str) -> Result<Vec<VersionStages>, RepositoryError> {
        match self {
            Self::Sqlite(store) => store.list_versions(secret_id).await,
            Self::Memory(store) => store.list_versions(secret_id).await,
        }
    }

    async fn promote(
        &self,
        secret_id: &str,
        to_version: &str,
        from_version: Option<&str>,
    ) -> Result<(), RepositoryError> {
        match self {
            Self::Sqlite(store) => store.promote(secret_id, to_version, from_version).await,
            Self::Memory(store) => store.promote(secret_id, to_version, from_version).await,
        }
    }
}

impl LockTable for LockBackend {
    async fn acquire(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<LockAttempt, RepositoryError> {
        match self {
            Self::Sqlite(locks) => locks.acquire(key, now, ttl).await,
            Self::Memory(locks) => locks.acquire(key, now, ttl).await,
        }
    }

    async fn len(&self) -> Result<usize, RepositoryError> {
        match self {
            Self::Sqlite(locks) => locks.len().await,
            Self::Memory(locks) => locks.len().await,
        }
    }
}

impl ClientRegistry for ClientBackend {
    async fn find_by_task(&self, task_id: &str) -> Result<Option<ClientStatusRecord>, RepositoryError> {
        match self {
            Self::Sqlite(clients) => clients.find_by_task(task_id).await,
            Self::Memory(clients) => clients.find_by_task(task_id).await,
        }
    }

    async fn get(&self, client_id: &str) -> Result<Option<ClientStatusRecord>, RepositoryError> {
        match self {
            Self::Sqlite(clients) => clients.get(client_id).await,
            Self::Memory(clients) => clients.get(client_id).await,
        }
    }

    async fn upsert(&self, record: &ClientStatusRecord) -> Result<(), RepositoryError> {
        match self {
            Self::Sqlite(clients) => clients.upsert(record).await,
            Self::Memory(clients) => clients.upsert(record).await,
        }
    }

    async fn list(&self) -> Result<Vec<ClientStatusRecord>, RepositoryError> {
        match self {
            Self::Sqlite(clients) => clients.list().await,
            Self::Memory(clients) => clients.list().await,
        }
    }

    async fn record_processed(
        &self,
        client_id: &str,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        match self {
            Self::Sqlite(clients) => clients.record_processed(client_id, status, at).await,
            Self::Memory(clients) => clients.record_processed(client_id, status, at).await,
        }
    }
}
