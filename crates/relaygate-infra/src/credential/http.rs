//! HTTP credential consumer for the automation engine.
//!
//! Pushes a rotated secret to `POST {base}{rotate_path}` with body
//! `{new_jwt_token, credential_name}` and expects `{"success": true, ...}`
//! back. Reachability is probed with `GET {base}{health_path}`.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and only exposed when
//! building request headers.

use std::time::Duration;

use relaygate_core::repository::credential::CredentialConsumer;
use relaygate_types::config::RotationConfig;
use relaygate_types::error::CredentialSyncError;
use relaygate_types::rotation::ConsumerAck;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Serialize)]
struct RotateCredentialRequest<'a> {
    new_jwt_token: &'a str,
    credential_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct RotateCredentialResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    new_credential_id: Option<String>,
    #[serde(default)]
    old_credential_id: Option<String>,
    #[serde(default)]
    workflows_updated: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpCredentialConsumer {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    credential_name: String,
    rotate_path: String,
    health_path: String,
}

impl HttpCredentialConsumer {
    pub fn new(config: &RotationConfig) -> Result<Self, CredentialSyncError> {
        let base_url = config
            .consumer_url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CredentialSyncError::Failed("consumer URL not configured".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CredentialSyncError::Failed(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: config
                .consumer_api_key
                .as_ref()
                .map(|key| SecretString::from(key.expose().to_string())),
            credential_name: config.credential_name.clone(),
            rotate_path: config.rotate_path.clone(),
            health_path: config.health_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.expose_secret()),
            None => request,
        }
    }
}

impl CredentialConsumer for HttpCredentialConsumer {
    async fn update(&self, secret: &str) -> Result<ConsumerAck, CredentialSyncError> {
        let url = self.url(&self.rotate_path);
        tracing::info!(url = %url, credential = %self.credential_name, "pushing rotated credential");

        let body = RotateCredentialRequest {
            new_jwt_token: secret,
            credential_name: &self.credential_name,
        };
        let response = self
            .with_auth(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| CredentialSyncError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialSyncError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let result: RotateCredentialResponse = response
            .json()
            .await
            .map_err(|e| CredentialSyncError::Failed(format!("invalid response body: {e}")))?;

        if !result.success {
            return Err(CredentialSyncError::Failed(
                result
                    .message
                    .unwrap_or_else(|| "consumer did not report success".to_string()),
            ));
        }

        tracing::info!(
            new_credential_id = result.new_credential_id.as_deref().unwrap_or("-"),
            workflows_updated = result.workflows_updated.unwrap_or(0),
            "credential consumer updated"
        );
        Ok(ConsumerAck {
            new_credential_id: result.new_credential_id,
            old_credential_id: result.old_credential_id,
            workflows_updated: result.workflows_updated,
        })
    }

    async fn read(&self) -> Result<(), CredentialSyncError> {
        let response = self
            .with_auth(self.client.get(self.url(&self.health_path)))
            .send()
            .await
            .map_err(|e| CredentialSyncError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialSyncError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaygate_types::secret::Redacted;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> RotationConfig {
        RotationConfig {
            consumer_url: Some(format!("{}/", server.uri())),
            consumer_api_key: Some(Redacted::new("key-123")),
            ..RotationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_update_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/rotate-jwt-credential"))
            .and(header("X-API-Key", "key-123"))
            .and(body_json(json!({
                "new_jwt_token": "abcd",
                "credential_name": "JWT API Token"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "new_credential_id": "cred-2",
                "old_credential_id": "cred-1",
                "workflows_updated": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let consumer = HttpCredentialConsumer::new(&config(&server)).unwrap();
        let ack = consumer.update("abcd").await.unwrap();

        assert_eq!(ack.new_credential_id.as_deref(), Some("cred-2"));
        assert_eq!(ack.old_credential_id.as_deref(), Some("cred-1"));
        assert_eq!(ack.workflows_updated, Some(3));
    }

    #[tokio::test]
    async fn test_update_success_false_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/rotate-jwt-credential"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "message": "credential not found"})),
            )
            .mount(&server)
            .await;

        let consumer = HttpCredentialConsumer::new(&config(&server)).unwrap();
        let err = consumer.update("abcd").await.unwrap_err();
        assert!(matches!(err, CredentialSyncError::Failed(m) if m == "credential not found"));
    }

    #[tokio::test]
    async fn test_update_non_2xx_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let consumer = HttpCredentialConsumer::new(&config(&server)).unwrap();
        let err = consumer.update("abcd").await.unwrap_err();
        assert!(matches!(
            err,
            CredentialSyncError::Rejected { status: 502, ref body } if body == "bad gateway"
        ));
    }

    #[tokio::test]
    async fn test_read_hits_health_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let consumer = HttpCredentialConsumer::new(&config(&server)).unwrap();
        consumer.read().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_consumer() {
        let config = RotationConfig {
            consumer_url: Some("http://127.0.0.1:1".to_string()),
            request_timeout_secs: 1,
            ..RotationConfig::default()
        };
        let consumer = HttpCredentialConsumer::new(&config).unwrap();
        assert!(matches!(
            consumer.read().await,
            Err(CredentialSyncError::Unreachable(_))
        ));
    }
}
