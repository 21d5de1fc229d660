//! Downstream credential consumer trait.

use relaygate_types::error::CredentialSyncError;
use relaygate_types::rotation::ConsumerAck;

/// A system holding its own copy of a rotated secret.
///
/// The rotation coordinator pushes every new value through `update` and uses
/// `read` as a reachability probe. Neither call is retried by the caller.
pub trait CredentialConsumer: Send + Sync {
    /// Replace the consumer's copy of the secret.
    fn update(
        &self,
        secret: &str,
    ) -> impl std::future::Future<Output = Result<ConsumerAck, CredentialSyncError>> + Send;

    /// Lightweight read proving the consumer is reachable with the current
    /// configuration. Says nothing about which secret value is in effect.
    fn read(&self) -> impl std::future::Future<Output = Result<(), CredentialSyncError>> + Send;
}
