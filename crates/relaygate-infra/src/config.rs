//! Global configuration loader for relaygate.
//!
//! Reads `config.toml` from the data directory (`~/.relaygate/` by default)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when the
//! file is missing or malformed, then applies `RELAYGATE_*` environment
//! overrides.

use std::path::{Path, PathBuf};

use relaygate_types::config::GlobalConfig;
use relaygate_types::secret::Redacted;

pub const DATA_DIR_ENV: &str = "RELAYGATE_DATA_DIR";
pub const SECRET_ID_ENV: &str = "RELAYGATE_SECRET_ID";
pub const CONSUMER_URL_ENV: &str = "RELAYGATE_CONSUMER_URL";
pub const CONSUMER_API_KEY_ENV: &str = "RELAYGATE_CONSUMER_API_KEY";
pub const CREDENTIAL_NAME_ENV: &str = "RELAYGATE_CREDENTIAL_NAME";

/// Data directory: `RELAYGATE_DATA_DIR`, else `~/.relaygate`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".relaygate"),
    }
}

/// Load `{data_dir}/config.toml` and apply process environment overrides.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let mut config = load_config_file(data_dir).await;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_config_file(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Overlay environment variables onto `config`. Empty values are ignored.
///
/// `RELAYGATE_SECRET_ID` sets the rotation secret, which the verifier also
/// falls back to.
pub fn apply_env_overrides(config: &mut GlobalConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(secret_id) = get(SECRET_ID_ENV) {
        config.rotation.secret_id = Some(secret_id);
    }
    if let Some(url) = get(CONSUMER_URL_ENV) {
        config.rotation.consumer_url = Some(url);
    }
    if let Some(key) = get(CONSUMER_API_KEY_ENV) {
        config.rotation.consumer_api_key = Some(Redacted::new(key));
    }
    if let Some(name) = get(CREDENTIAL_NAME_ENV) {
        config.rotation.credential_name = name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.auth.cache_ttl_secs, 300);
        assert!(config.rotation.consumer_url.is_none());
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[auth]
cache_ttl_secs = 60

[rotation]
secret_id = "automation/jwt"
consumer_url = "https://automation.internal"
pending_stale_after_secs = 3600

[admission]
lock_ttl_secs = 30
"#,
        )
        .await
        .unwrap();

        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.auth.cache_ttl_secs, 60);
        assert_eq!(config.verifier_secret_id(), Some("automation/jwt"));
        assert_eq!(config.rotation.pending_stale_after_secs, Some(3600));
        assert_eq!(config.admission.lock_ttl_secs, 30);
        assert_eq!(config.admission.replay_window_secs, 60);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.admission.lock_ttl_secs, 120);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (SECRET_ID_ENV, "env/jwt"),
            (CONSUMER_URL_ENV, "http://engine:5678"),
            (CONSUMER_API_KEY_ENV, "k-1"),
            (CREDENTIAL_NAME_ENV, ""),
        ]);
        let mut config = GlobalConfig::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.rotation.secret_id.as_deref(), Some("env/jwt"));
        assert_eq!(config.rotation.consumer_url.as_deref(), Some("http://engine:5678"));
        assert_eq!(config.rotation.consumer_api_key.unwrap().expose(), "k-1");
        assert_eq!(config.rotation.credential_name, "JWT API Token");
    }
}
