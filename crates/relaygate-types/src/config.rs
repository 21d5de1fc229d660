//! Global configuration types for relaygate.
//!
//! `GlobalConfig` represents the top-level `config.toml`. Every field has a
//! default so a missing file (or a missing section) yields a working setup.

use serde::{Deserialize, Serialize};

use crate::secret::Redacted;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
}

/// Token verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret holding the token signing key. Falls back to `rotation.secret_id`.
    #[serde(default)]
    pub secret_id: Option<String>,

    /// How long a fetched CURRENT secret is trusted before re-fetching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Principal reported on Allow decisions.
    #[serde(default = "default_principal_id")]
    pub principal_id: String,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_principal_id() -> String {
    "automation-service".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_id: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            principal_id: default_principal_id(),
        }
    }
}

/// Secret rotation and credential consumer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Secret rotated by scheduled mode.
    #[serde(default)]
    pub secret_id: Option<String>,

    /// Base URL of the automation engine holding a copy of the secret.
    /// When unset the credential push is skipped.
    #[serde(default)]
    pub consumer_url: Option<String>,

    /// API key sent as `X-API-Key` to the consumer.
    #[serde(default)]
    pub consumer_api_key: Option<Redacted>,

    /// Name of the credential the consumer should replace.
    #[serde(default = "default_credential_name")]
    pub credential_name: String,

    #[serde(default = "default_rotate_path")]
    pub rotate_path: String,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Per-call timeout for consumer requests.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Supersede a PENDING version owned by another attempt once it is older
    /// than this. Disabled when unset.
    #[serde(default)]
    pub pending_stale_after_secs: Option<u64>,
}

fn default_credential_name() -> String {
    "JWT API Token".to_string()
}

fn default_rotate_path() -> String {
    "/webhook/rotate-jwt-credential".to_string()
}

fn default_health_path() -> String {
    "/healthz".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            secret_id: None,
            consumer_url: None,
            consumer_api_key: None,
            credential_name: default_credential_name(),
            rotate_path: default_rotate_path(),
            health_path: default_health_path(),
            request_timeout_secs: default_request_timeout_secs(),
            pending_stale_after_secs: None,
        }
    }
}

/// Webhook admission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Age after which a dedup lock is treated as absent.
    #[serde(default = "default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,

    /// Window in which a repeat of the last processed status is a duplicate.
    #[serde(default = "default_replay_window_secs")]
    pub replay_window_secs: u64,

    /// Statuses that start an automation run (substring match).
    #[serde(default = "default_trigger_statuses")]
    pub trigger_statuses: Vec<String>,

    /// Shared secret for `X-Signature` verification. Unsigned webhooks are
    /// accepted when unset.
    #[serde(default)]
    pub webhook_secret: Option<Redacted>,
}

fn default_lock_ttl_secs() -> u64 {
    120
}

fn default_replay_window_secs() -> u64 {
    60
}

fn default_trigger_statuses() -> Vec<String> {
    vec!["reply".to_string()]
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            lock_ttl_secs: default_lock_ttl_secs(),
            replay_window_secs: default_replay_window_secs(),
            trigger_statuses: default_trigger_statuses(),
            webhook_secret: None,
        }
    }
}

impl GlobalConfig {
    /// Secret id used by the token verifier.
    pub fn verifier_secret_id(&self) -> Option<&str> {
        self.auth
            .secret_id
            .as_deref()
            .or(self.rotation.secret_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.auth.cache_ttl_secs, 300);
        assert_eq!(config.rotation.request_timeout_secs, 10);
        assert_eq!(config.admission.lock_ttl_secs, 120);
        assert_eq!(config.admission.replay_window_secs, 60);
        assert_eq!(config.admission.trigger_statuses, vec!["reply"]);
        assert!(config.verifier_secret_id().is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: GlobalConfig = toml::from_str(
            r#"
[rotation]
secret_id = "automation/jwt"
consumer_url = "https://automation.internal"

[admission]
trigger_statuses = ["reply", "campaign live"]
"#,
        )
        .unwrap();

        assert_eq!(config.verifier_secret_id(), Some("automation/jwt"));
        assert_eq!(config.rotation.credential_name, "JWT API Token");
        assert_eq!(config.admission.trigger_statuses.len(), 2);
        assert_eq!(config.admission.lock_ttl_secs, 120);
    }

    #[test]
    fn test_auth_secret_id_takes_precedence() {
        let mut config = GlobalConfig::default();
        config.rotation.secret_id = Some("rotation".to_string());
        config.auth.secret_id = Some("auth".to_string());
        assert_eq!(config.verifier_secret_id(), Some("auth"));
    }
}
