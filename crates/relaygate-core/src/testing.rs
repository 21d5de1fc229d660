//! In-memory port implementations shared by the core unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use relaygate_types::admission::ClientStatusRecord;
use relaygate_types::error::{CredentialSyncError, RepositoryError};
use relaygate_types::rotation::ConsumerAck;
use relaygate_types::secret::{Redacted, SecretStage, SecretVersion, VersionStages};

use crate::repository::client::ClientRegistry;
use crate::repository::credential::CredentialConsumer;
use crate::repository::lock::{LockAttempt, LockTable};
use crate::repository::secret_store::SecretStore;

// ---------------------------------------------------------------------------
// Secret store
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemorySecretStore {
    versions: Arc<Mutex<Vec<SecretVersion>>>,
    get_calls: Arc<AtomicUsize>,
}

impl MemorySecretStore {
    /// Insert a version directly, moving `stages` onto it.
    pub fn seed(&self, secret_id: &str, version_id: &str, value: &str, stages: &[SecretStage]) {
        let mut versions = self.versions.lock().unwrap();
        detach(&mut versions, secret_id, stages);
        versions.retain(|v| !(v.secret_id == secret_id && v.version_id == version_id));
        versions.push(SecretVersion {
            secret_id: secret_id.to_string(),
            version_id: version_id.to_string(),
            value: Redacted::new(value),
            stages: stages.to_vec(),
            created_at: Utc::now(),
        });
    }

    /// Backdate a version's creation time.
    pub fn set_created_at(&self, secret_id: &str, version_id: &str, at: DateTime<Utc>) {
        let mut versions = self.versions.lock().unwrap();
        for v in versions.iter_mut() {
            if v.secret_id == secret_id && v.version_id == version_id {
                v.created_at = at;
            }
        }
    }

    pub fn stages_of(&self, secret_id: &str, version_id: &str) -> Vec<SecretStage> {
        self.versions
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.secret_id == secret_id && v.version_id == version_id)
            .map(|v| v.stages.clone())
            .unwrap_or_default()
    }

    pub fn version_count(&self, secret_id: &str) -> usize {
        self.versions
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.secret_id == secret_id)
            .count()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

fn detach(versions: &mut [SecretVersion], secret_id: &str, stages: &[SecretStage]) {
    for v in versions.iter_mut().filter(|v| v.secret_id == secret_id) {
        v.stages.retain(|s| !stages.contains(s));
    }
}

impl SecretStore for MemorySecretStore {
    async fn get(
        &self,
        secret_id: &str,
        stage: SecretStage,
    ) -> Result<Option<SecretVersion>, RepositoryError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .versions
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.secret_id == secret_id && v.has_stage(stage))
            .cloned())
    }

    async fn get_version(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Option<SecretVersion>, RepositoryError> {
        Ok(self
            .versions
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.secret_id == secret_id && v.version_id == version_id)
            .cloned())
    }

    async fn put(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &str,
        stages: &[SecretStage],
    ) -> Result<(), RepositoryError> {
        let mut versions = self.versions.lock().unwrap();
        let existing = versions
            .iter()
            .position(|v| v.secret_id == secret_id && v.version_id == version_id);
        if let Some(idx) = existing {
            if versions[idx].value.expose() != value {
                return Err(RepositoryError::Conflict(format!(
                    "version {version_id} already exists with a different value"
                )));
            }
        }
        detach(&mut versions, secret_id, stages);
        match existing {
            Some(idx) => {
                for stage in stages {
                    if !versions[idx].stages.contains(stage) {
                        versions[idx].stages.push(*stage);
                    }
                }
            }
            None => versions.push(SecretVersion {
                secret_id: secret_id.to_string(),
                version_id: version_id.to_string(),
                value: Redacted::new(value),
                stages: stages.to_vec(),
                created_at: Utc::now(),
            }),
        }
        Ok(())
    }

    async fn list_versions(&self, secret_id: &str) -> Result<Vec<VersionStages>, RepositoryError> {
        Ok(self
            .versions
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.secret_id == secret_id)
            .map(|v| VersionStages {
                version_id: v.version_id.clone(),
                stages: v.stages.clone(),
                created_at: v.created_at,
            })
            .collect())
    }

    async fn promote(
        &self,
        secret_id: &str,
        to_version: &str,
        from_version: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut versions = self.versions.lock().unwrap();
        if !versions
            .iter()
            .any(|v| v.secret_id == secret_id && v.version_id == to_version)
        {
            return Err(RepositoryError::NotFound);
        }
        let holder = versions
            .iter()
            .find(|v| v.secret_id == secret_id && v.has_stage(SecretStage::Current))
            .map(|v| v.version_id.clone());
        if holder.as_deref() != from_version {
            return Err(RepositoryError::Conflict("CURRENT moved".to_string()));
        }

        detach(&mut versions, secret_id, &[SecretStage::Current]);
        if from_version.is_some() {
            detach(&mut versions, secret_id, &[SecretStage::Previous]);
        }
        for v in versions.iter_mut().filter(|v| v.secret_id == secret_id) {
            if v.version_id == to_version {
                v.stages.retain(|s| *s != SecretStage::Pending && *s != SecretStage::Previous);
                v.stages.push(SecretStage::Current);
            } else if Some(v.version_id.as_str()) == from_version {
                v.stages.push(SecretStage::Previous);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Credential consumer
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MockConsumer {
    pub updates: Arc<Mutex<Vec<String>>>,
    pub reads: Arc<AtomicUsize>,
    fail_update: Arc<Mutex<Option<String>>>,
    fail_read: Arc<Mutex<Option<String>>>,
}

impl MockConsumer {
    pub fn failing_update(reason: &str) -> Self {
        let consumer = Self::default();
        *consumer.fail_update.lock().unwrap() = Some(reason.to_string());
        consumer
    }

    pub fn failing_read(reason: &str) -> Self {
        let consumer = Self::default();
        *consumer.fail_read.lock().unwrap() = Some(reason.to_string());
        consumer
    }

    pub fn pushed(&self) -> Vec<String> {
        self.updates.lock().unwrap().clone()
    }
}

impl CredentialConsumer for MockConsumer {
    async fn update(&self, secret: &str) -> Result<ConsumerAck, CredentialSyncError> {
        if let Some(reason) = self.fail_update.lock().unwrap().clone() {
            return Err(CredentialSyncError::Failed(reason));
        }
        let mut updates = self.updates.lock().unwrap();
        updates.push(secret.to_string());
        Ok(ConsumerAck {
            new_credential_id: Some(format!("cred-{}", updates.len())),
            old_credential_id: None,
            workflows_updated: Some(2),
        })
    }

    async fn read(&self) -> Result<(), CredentialSyncError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.fail_read.lock().unwrap().clone() {
            Some(reason) => Err(CredentialSyncError::Unreachable(reason)),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Lock table
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryLocks {
    entries: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl LockTable for MemoryLocks {
    async fn acquire(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<LockAttempt, RepositoryError> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, at| now - *at <= ttl);
        if let Some(at) = entries.get(key) {
            return Ok(LockAttempt::Held { acquired_at: *at });
        }
        entries.insert(key.to_string(), now);
        Ok(LockAttempt::Acquired)
    }

    async fn len(&self) -> Result<usize, RepositoryError> {
        Ok(self.entries.lock().unwrap().len())
    }
}

// ---------------------------------------------------------------------------
// Client registry
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryClients {
    records: Arc<Mutex<HashMap<String, ClientStatusRecord>>>,
    fail: Arc<Mutex<bool>>,
}

impl MemoryClients {
    pub fn with(records: Vec<ClientStatusRecord>) -> Self {
        let clients = Self::default();
        {
            let mut map = clients.records.lock().unwrap();
            for r in records {
                map.insert(r.client_id.clone(), r);
            }
        }
        clients
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn record(&self, client_id: &str) -> Option<ClientStatusRecord> {
        self.records.lock().unwrap().get(client_id).cloned()
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if *self.fail.lock().unwrap() {
            Err(RepositoryError::Connection)
        } else {
            Ok(())
        }
    }
}

impl ClientRegistry for MemoryClients {
    async fn find_by_task(&self, task_id: &str) -> Result<Option<ClientStatusRecord>, RepositoryError> {
        self.check()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.task_id == task_id && !r.is_claiming())
            .cloned())
    }

    async fn get(&self, client_id: &str) -> Result<Option<ClientStatusRecord>, RepositoryError> {
        self.check()?;
        Ok(self.record(client_id))
    }

    async fn upsert(&self, record: &ClientStatusRecord) -> Result<(), RepositoryError> {
        self.check()?;
        self.records
            .lock()
            .unwrap()
            .insert(record.client_id.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ClientStatusRecord>, RepositoryError> {
        self.check()?;
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }

    async fn record_processed(
        &self,
        client_id: &str,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check()?;
        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(client_id).ok_or(RepositoryError::NotFound)?;
        record.last_processed_status = Some(status.to_string());
        record.last_execution_timestamp = Some(at);
        record.updated_at = at;
        Ok(())
    }
}
