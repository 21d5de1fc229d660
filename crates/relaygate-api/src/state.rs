//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over their ports; AppState pins them to the storage
//! backend chosen at startup.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use relaygate_core::admission::{AdmissionService, AdmissionSettings};
use relaygate_core::auth::{SecretCache, TokenAuthorizer};
use relaygate_core::clock::SystemClock;
use relaygate_core::rotation::{RotationCoordinator, RotationSettings};
use relaygate_infra::backend::{Backend, ClientBackend, LockBackend, SecretBackend};
use relaygate_infra::config::{load_global_config, resolve_data_dir};
use relaygate_infra::credential::ConfiguredConsumer;
use relaygate_types::config::GlobalConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteAuthorizer = TokenAuthorizer<SecretBackend, SystemClock>;

pub type ConcreteRotation = RotationCoordinator<SecretBackend, ConfiguredConsumer, SystemClock>;

pub type ConcreteAdmission = AdmissionService<LockBackend, ClientBackend, SystemClock>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub authorizer: Arc<ConcreteAuthorizer>,
    pub rotation: Arc<ConcreteRotation>,
    pub admission: Arc<ConcreteAdmission>,
    pub secrets: SecretBackend,
    pub clients: ClientBackend,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub backend_kind: &'static str,
}

impl AppState {
    /// Load configuration, open storage and wire services.
    pub async fn init(data_dir: Option<PathBuf>, in_memory: bool) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(resolve_data_dir);
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;

        let backend = if in_memory {
            Backend::memory()
        } else {
            Backend::sqlite(&data_dir).await?
        };

        Self::from_parts(config, backend, data_dir)
    }

    /// Wire services over an already opened backend.
    pub fn from_parts(
        config: GlobalConfig,
        backend: Backend,
        data_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let backend_kind = backend.kind();

        let cache = SecretCache::new(
            backend.secrets.clone(),
            SystemClock,
            config.verifier_secret_id().map(str::to_string),
            Duration::seconds(config.auth.cache_ttl_secs as i64),
        );
        let authorizer = TokenAuthorizer::new(cache, config.auth.principal_id.clone());

        let consumer = ConfiguredConsumer::from_config(&config.rotation)?;
        if !consumer.is_enabled() {
            tracing::info!("no credential consumer configured, rotations will not push updates");
        }
        let rotation = RotationCoordinator::new(
            backend.secrets.clone(),
            consumer,
            SystemClock,
            RotationSettings {
                secret_id: config.rotation.secret_id.clone(),
                pending_stale_after: config
                    .rotation
                    .pending_stale_after_secs
                    .map(|secs| Duration::seconds(secs as i64)),
            },
        );

        let admission = AdmissionService::new(
            backend.locks.clone(),
            backend.clients.clone(),
            SystemClock,
            AdmissionSettings::from(&config.admission),
        );

        Ok(Self {
            authorizer: Arc::new(authorizer),
            rotation: Arc::new(rotation),
            admission: Arc::new(admission),
            secrets: backend.secrets,
            clients: backend.clients,
            config: Arc::new(config),
            data_dir,
            backend_kind,
        })
    }

    /// Secret id the verifier reads, or an error naming the missing setting.
    pub fn verifier_secret_id(&self) -> anyhow::Result<&str> {
        self.config.verifier_secret_id().ok_or_else(|| {
            anyhow::anyhow!(
                "no secret configured: set auth.secret_id or rotation.secret_id in config.toml, or RELAYGATE_SECRET_ID"
            )
        })
    }
}
