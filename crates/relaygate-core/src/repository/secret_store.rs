//! Versioned secret storage trait.

use relaygate_types::error::RepositoryError;
use relaygate_types::secret::{SecretStage, SecretVersion, VersionStages};

/// Versioned secret storage with stage labels.
///
/// Each stage label of a secret points at no more than one version. Writing
/// a label onto a version removes it from whichever version held it before.
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait SecretStore: Send + Sync {
    /// Fetch the version holding `stage`, if any.
    fn get(
        &self,
        secret_id: &str,
        stage: SecretStage,
    ) -> impl std::future::Future<Output = Result<Option<SecretVersion>, RepositoryError>> + Send;

    /// Fetch a specific version regardless of its labels.
    fn get_version(
        &self,
        secret_id: &str,
        version_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<SecretVersion>, RepositoryError>> + Send;

    /// Store a new version and attach `stages` to it.
    ///
    /// `created_at` is stamped by the store from wall-clock time.
    ///
    /// Re-putting an existing version with the same value only re-attaches
    /// the labels; a different value for an existing version is a
    /// [`RepositoryError::Conflict`].
    fn put(
        &self,
        secret_id: &str,
        version_id: &str,
        value: &str,
        stages: &[SecretStage],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List every version of a secret with its labels, oldest first.
    fn list_versions(
        &self,
        secret_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<VersionStages>, RepositoryError>> + Send;

    /// Atomically move CURRENT from `from_version` to `to_version`.
    ///
    /// In the same operation PENDING is cleared from `to_version` and
    /// PREVIOUS is attached to `from_version`. Fails with `NotFound` if
    /// `to_version` does not exist and with `Conflict` if `from_version` no
    /// longer holds CURRENT. `from_version = None` is only valid while no
    /// version holds CURRENT.
    fn promote(
        &self,
        secret_id: &str,
        to_version: &str,
        from_version: Option<&str>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
