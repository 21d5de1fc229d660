//! In-memory versioned secret store.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use relaygate_core::repository::secret_store::SecretStore;
use relaygate_types::error::RepositoryError;
use relaygate_types::secret::{Redacted, SecretStage, SecretVersion, VersionStages};

/// Versions grouped per secret id. Every mutation of one secret runs under
/// that secret's entry lock, so label moves are atomic.
#[derive(Clone, Default)]
pub struct MemorySecretStore {
    secrets: Arc<DashMap<String, Vec<SecretVersion>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn detach(versions: &mut [SecretVersion], stage: SecretStage) {
    for version in versions.iter_mut() {
        version.stages.retain(|s| *s != stage);
    }
}

impl SecretStore for MemorySecretStore {
    async fn get(
        &self,
        secret_id: &str,
        stage: SecretStage,
    ) -> Result<Option<SecretVersion>, RepositoryError> {
        Ok(self
            .secrets
            .get(secret_id)
            .and_then(|versions| versions.iter().find(|v| v.has_stage(stage)).cloned()))
    }

    async fn get_version(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> Result<Option<SecretVersion>, RepositoryError> {
        Ok(self.secrets.get(secret_id).and_then(|versions| {
            versions
                .iter()
                .find(|v| v.version_id == version_id)
                .cloned()
        }))
    }

    async fn put(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &str,
        stages: &[SecretStage],
    ) -> Result<(), RepositoryError> {
        let mut versions = self.secrets.entry(secret_id.to_string()).or_default();

        let idx = match versions.iter().position(|v| v.version_id == version_id) {
            Some(idx) if versions[idx].value.expose() != value => {
                return Err(RepositoryError::Conflict(format!(
                    "version {version_id} of {secret_id} already exists with a different value"
                )));
            }
            Some(idx) => idx,
            None => {
                versions.push(SecretVersion {
                    secret_id: secret_id.to_string(),
                    version_id: version_id.to_string(),
                    value: Redacted::new(value),
                    stages: Vec::new(),
                    created_at: Utc::now(),
                });
                versions.len() - 1
            }
        };

        for stage in stages {
            detach(&mut versions, *stage);
            versions[idx].stages.push(*stage);
        }
        Ok(())
    }

    async fn list_versions(&self, secret_id: &str) -> Result<Vec<VersionStages>, RepositoryError> {
        Ok(self
            .secrets
            .get(secret_id)
            .map(|versions| {
                versions
                    .iter()
                    .map(|v| VersionStages {
                        version_id: v.version_id.clone(),
                        stages: v.stages.clone(),
                        created_at: v.created_at,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn promote(
        &self,
        secret_id: &str,
        to_version: &str,
        from_version: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut versions = self
            .secrets
            .get_mut(secret_id)
            .ok_or(RepositoryError::NotFound)?;

        let to_idx = versions
            .iter()
            .position(|v| v.version_id == to_version)
            .ok_or(RepositoryError::NotFound)?;

        let holder = versions
            .iter()
            .find(|v| v.has_stage(SecretStage::Current))
            .map(|v| v.version_id.clone());
        if holder.as_deref() != from_version {
            return Err(RepositoryError::Conflict(format!(
                "CURRENT of {secret_id} is held by {}, expected {}",
                holder.as_deref().unwrap_or("no version"),
                from_version.unwrap_or("no version")
            )));
        }

        detach(&mut versions, SecretStage::Current);
        versions[to_idx]
            .stages
            .retain(|s| *s != SecretStage::Pending && *s != SecretStage::Previous);
        versions[to_idx].stages.push(SecretStage::Current);

        if let Some(previous) = from_version {
            detach(&mut versions, SecretStage::Previous);
            if let Some(old) = versions.iter_mut().find(|v| v.version_id == previous) {
                old.stages.push(SecretStage::Previous);
            }
        }
        Ok(())
    }
}
