//! Credential consumer adapters.
//!
//! [`ConfiguredConsumer`] picks the HTTP consumer when a consumer URL is
//! configured and the disabled consumer otherwise.

pub mod disabled;
pub mod http;

use relaygate_core::repository::credential::CredentialConsumer;
use relaygate_types::config::RotationConfig;
use relaygate_types::error::CredentialSyncError;
use relaygate_types::rotation::ConsumerAck;

pub use disabled::DisabledConsumer;
pub use http::HttpCredentialConsumer;

/// Consumer selected from configuration at startup.
pub enum ConfiguredConsumer {
    Http(HttpCredentialConsumer),
    Disabled(DisabledConsumer),
}

impl ConfiguredConsumer {
    pub fn from_config(config: &RotationConfig) -> Result<Self, CredentialSyncError> {
        match config.consumer_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(Self::Http(HttpCredentialConsumer::new(config)?)),
            _ => Ok(Self::Disabled(DisabledConsumer)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

impl CredentialConsumer for ConfiguredConsumer {
    async fn update(&self, secret: &str) -> Result<ConsumerAck, CredentialSyncError> {
        match self {
            Self::Http(consumer) => consumer.update(secret).await,
            Self::Disabled(consumer) => consumer.update(secret).await,
        }
    }

    async fn read(&self) -> Result<(), CredentialSyncError> {
        match self {
            Self::Http(consumer) => consumer.read().await,
            Self::Disabled(consumer) => consumer.read().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_selects_variant() {
        let mut config = RotationConfig::default();
        assert!(!ConfiguredConsumer::from_config(&config).unwrap().is_enabled());

        config.consumer_url = Some("  ".to_string());
        assert!(!ConfiguredConsumer::from_config(&config).unwrap().is_enabled());

        config.consumer_url = Some("http://127.0.0.1:5678".to_string());
        assert!(ConfiguredConsumer::from_config(&config).unwrap().is_enabled());
    }
}
