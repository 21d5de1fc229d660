//! Four-step secret rotation: create, set, test, finish.
//!
//! Step mode is driven by an external scheduler that calls each step with the
//! same `client_request_token`. Scheduled mode generates its own token and
//! runs all four steps in order. Steps are idempotent so a scheduler may
//! retry any of them.

use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use chrono::Duration;
use uuid::Uuid;

use relaygate_types::error::{RepositoryError, RotationError};
use relaygate_types::rotation::{ConsumerAck, RotationRequest, RotationStep, RotationSummary};
use relaygate_types::secret::{SecretPayload, SecretStage};

use crate::clock::Clock;
use crate::repository::credential::CredentialConsumer;
use crate::repository::secret_store::SecretStore;

/// Number of random bytes in a generated secret (hex-encoded to 64 chars).
const SECRET_BYTES: usize = 32;

const ROTATED_BY_STEP: &str = "step-rotation";
const ROTATED_BY_SCHEDULED: &str = "scheduled-rotation";

/// Tunables for the coordinator.
#[derive(Debug, Clone, Default)]
pub struct RotationSettings {
    /// Secret rotated by scheduled mode.
    pub secret_id: Option<String>,
    /// Supersede a foreign PENDING version older than this in step mode.
    pub pending_stale_after: Option<Duration>,
}

/// How `create_secret` treats a PENDING version it does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingPolicy {
    /// Leave it alone unless it is older than the stale threshold.
    Respect,
    /// Move PENDING to the new version unconditionally.
    Supersede,
}

/// Drives rotations of a versioned secret and keeps one downstream consumer
/// in sync with it.
pub struct RotationCoordinator<S: SecretStore, K: CredentialConsumer, C: Clock> {
    store: S,
    consumer: K,
    clock: C,
    settings: RotationSettings,
}

impl<S: SecretStore, K: CredentialConsumer, C: Clock> RotationCoordinator<S, K, C> {
    pub fn new(store: S, consumer: K, clock: C, settings: RotationSettings) -> Self {
        Self {
            store,
            consumer,
            clock,
            settings,
        }
    }

    /// Step-mode entry point.
    pub async fn handle(&self, request: &RotationRequest) -> Result<(), RotationError> {
        let step = request.step.parse::<RotationStep>().inspect_err(|e| {
            tracing::error!(
                secret_id = %request.secret_id,
                token = %request.client_request_token,
                error = %e,
                "rejected rotation request"
            );
        })?;
        self.run_step(&request.secret_id, &request.client_request_token, step)
            .await
            .map(|_| ())
    }

    /// Run one step, logging any failure with the attempt's identifiers.
    pub async fn run_step(
        &self,
        secret_id: &str,
        token: &str,
        step: RotationStep,
    ) -> Result<Option<ConsumerAck>, RotationError> {
        tracing::info!(secret_id, token, step = %step, "rotation step started");

        let result = match step {
            RotationStep::CreateSecret => self
                .create_secret(secret_id, token, PendingPolicy::Respect)
                .await
                .map(|_| None),
            RotationStep::SetSecret => self.set_secret(secret_id, token).await.map(Some),
            RotationStep::TestSecret => self.test_secret(secret_id).await.map(|_| None),
            RotationStep::FinishSecret => self.finish_secret(secret_id, token).await.map(|_| None),
        };

        match &result {
            Ok(_) => tracing::info!(secret_id, token, step = %step, "rotation step completed"),
            Err(e) => tracing::error!(secret_id, token, step = %step, error = %e, "rotation step failed"),
        }
        result
    }

    /// Scheduled mode against the configured secret.
    pub async fn rotate_scheduled(&self) -> Result<RotationSummary, RotationError> {
        let secret_id = self
            .settings
            .secret_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RotationError::NotConfigured("rotation.secret_id".to_string()))?;
        self.rotate(&secret_id).await
    }

    /// Run create, set, test and finish under a freshly generated token.
    pub async fn rotate(&self, secret_id: &str) -> Result<RotationSummary, RotationError> {
        let token = Uuid::new_v4().to_string();
        tracing::info!(secret_id, token = %token, "starting scheduled rotation");

        let outcome = async {
            self.create_secret(secret_id, &token, PendingPolicy::Supersede)
                .await?;
            let ack = self.set_secret(secret_id, &token).await?;
            self.test_secret(secret_id).await?;
            self.finish_secret(secret_id, &token).await?;
            Ok::<_, RotationError>(ack)
        }
        .await;

        match outcome {
            Ok(consumer) => {
                tracing::info!(
                    secret_id,
                    token = %token,
                    workflows_updated = consumer.workflows_updated.unwrap_or(0),
                    "scheduled rotation completed"
                );
                Ok(RotationSummary {
                    secret_id: secret_id.to_string(),
                    version_id: token,
                    consumer,
                })
            }
            Err(e) => {
                tracing::error!(secret_id, token = %token, error = %e, "scheduled rotation failed");
                Err(e)
            }
        }
    }

    /// Create a PENDING version owned by `token`.
    async fn create_secret(
        &self,
        secret_id: &str,
        token: &str,
        policy: PendingPolicy,
    ) -> Result<(), RotationError> {
        if self.store.get_version(secret_id, token).await?.is_some() {
            tracing::info!(secret_id, token, "version already exists, nothing to create");
            return Ok(());
        }

        if let Some(pending) = self.store.get(secret_id, SecretStage::Pending).await? {
            // Stores stamp wall-clock time; the payload carries our own clock's.
            let created_at = SecretPayload::from_stored(pending.value.expose())
                .map_or(pending.created_at, |payload| payload.created_at);
            let stale = self
                .settings
                .pending_stale_after
                .is_some_and(|limit| self.clock.now() - created_at > limit);

            match policy {
                PendingPolicy::Supersede => tracing::warn!(
                    secret_id,
                    superseded = %pending.version_id,
                    "replacing orphaned PENDING version"
                ),
                PendingPolicy::Respect if stale => tracing::warn!(
                    secret_id,
                    superseded = %pending.version_id,
                    "replacing stale PENDING version"
                ),
                PendingPolicy::Respect => {
                    tracing::info!(
                        secret_id,
                        pending = %pending.version_id,
                        "PENDING version already present, leaving it in place"
                    );
                    return Ok(());
                }
            }
        }

        let rotated_by = match policy {
            PendingPolicy::Respect => ROTATED_BY_STEP,
            PendingPolicy::Supersede => ROTATED_BY_SCHEDULED,
        };
        let payload = SecretPayload {
            secret: generate_secret(),
            created_at: self.clock.now(),
            rotated_by: rotated_by.to_string(),
        };
        let value =
            serde_json::to_string(&payload).map_err(|e| RepositoryError::Query(e.to_string()))?;

        self.store
            .put(secret_id, token, &value, &[SecretStage::Pending])
            .await?;
        tracing::info!(secret_id, token, "created PENDING version");
        Ok(())
    }

    /// Push the PENDING secret to the consumer.
    async fn set_secret(&self, secret_id: &str, token: &str) -> Result<ConsumerAck, RotationError> {
        let pending = self
            .store
            .get(secret_id, SecretStage::Pending)
            .await?
            .ok_or_else(|| RotationError::MissingPendingSecret {
                secret_id: secret_id.to_string(),
            })?;

        if pending.version_id != token {
            tracing::warn!(
                secret_id,
                token,
                pending = %pending.version_id,
                "PENDING version belongs to a different attempt"
            );
        }

        let secret = SecretPayload::secret_from_stored(pending.value.expose());
        let ack = self.consumer.update(&secret).await?;
        tracing::info!(
            secret_id,
            new_credential_id = ack.new_credential_id.as_deref().unwrap_or("-"),
            "consumer accepted new credential"
        );
        Ok(ack)
    }

    /// Reachability check against the consumer.
    async fn test_secret(&self, secret_id: &str) -> Result<(), RotationError> {
        self.consumer.read().await?;
        tracing::debug!(secret_id, "consumer reachable");
        Ok(())
    }

    /// Promote the token's version to CURRENT.
    async fn finish_secret(&self, secret_id: &str, token: &str) -> Result<(), RotationError> {
        let versions = self.store.list_versions(secret_id).await?;

        if versions
            .iter()
            .any(|v| v.version_id == token && v.stages.contains(&SecretStage::Current))
        {
            tracing::info!(secret_id, token, "version already CURRENT");
            return Ok(());
        }

        let previous = versions
            .iter()
            .find(|v| v.version_id != token && v.stages.contains(&SecretStage::Current))
            .map(|v| v.version_id.as_str());

        self.store.promote(secret_id, token, previous).await?;
        tracing::info!(
            secret_id,
            token,
            previous = previous.unwrap_or("-"),
            "promoted version to CURRENT"
        );
        Ok(())
    }
}

/// 32 bytes from the OS RNG, lowercase hex.
fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
