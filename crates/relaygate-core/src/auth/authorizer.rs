//! Allow/Deny authorization of bearer tokens.

use relaygate_types::error::AuthError;
use relaygate_types::token::{AuthorizationDecision, AuthorizerRequest, AuthorizerResponse, Claims};

use super::cache::SecretCache;
use super::token;
use crate::clock::Clock;
use crate::repository::secret_store::SecretStore;

/// Token verifier producing policy decisions.
///
/// Every failure (missing header, bad token, unavailable secret) collapses
/// into the same Deny decision with no context.
pub struct TokenAuthorizer<S: SecretStore, C: Clock> {
    cache: SecretCache<S, C>,
    principal_id: String,
}

impl<S: SecretStore, C: Clock> TokenAuthorizer<S, C> {
    pub fn new(cache: SecretCache<S, C>, principal_id: impl Into<String>) -> Self {
        Self {
            cache,
            principal_id: principal_id.into(),
        }
    }

    /// Handle an authorizer event and render the policy response.
    pub async fn authorize(&self, request: &AuthorizerRequest) -> AuthorizerResponse {
        self.decide(request.authorization_token.as_deref(), &request.method_arn)
            .await
            .into_response()
    }

    /// Decide on a raw `Authorization` header value for `resource`.
    pub async fn decide(&self, header: Option<&str>, resource: &str) -> AuthorizationDecision {
        match self.verify_header(header).await {
            Ok(claims) => {
                tracing::debug!(
                    resource,
                    sub = claims.subject().as_deref().unwrap_or("-"),
                    "token accepted"
                );
                AuthorizationDecision::allow(&self.principal_id, resource, claims.context())
            }
            Err(e) => {
                tracing::warn!(resource, error = %e, "token rejected");
                AuthorizationDecision::deny(resource)
            }
        }
    }

    /// Verify a header value (with or without `Bearer `) and return its claims.
    pub async fn verify_header(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        let token = token::extract_token(header)?;
        let secret = self.cache.get_secret().await?;
        let claims = token::verify(token, secret.expose(), self.cache.clock().now())?;
        Ok(claims)
    }

    pub fn cache(&self) -> &SecretCache<S, C> {
        &self.cache
    }
}
