//! Consumer used when no automation engine is configured.

use relaygate_core::repository::credential::CredentialConsumer;
use relaygate_types::error::CredentialSyncError;
use relaygate_types::rotation::ConsumerAck;

/// Acknowledges every call without contacting anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledConsumer;

impl CredentialConsumer for DisabledConsumer {
    async fn update(&self, _secret: &str) -> Result<ConsumerAck, CredentialSyncError> {
        tracing::info!("no credential consumer configured, skipping credential push");
        Ok(ConsumerAck::default())
    }

    async fn read(&self) -> Result<(), CredentialSyncError> {
        tracing::debug!("no credential consumer configured, skipping reachability check");
        Ok(())
    }
}
