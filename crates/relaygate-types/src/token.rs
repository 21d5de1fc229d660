//! Compact signed tokens and the authorizer policy they produce.
//!
//! Wire shapes follow the API gateway TOKEN authorizer contract: the request
//! is `{type, authorizationToken, methodArn}` and the response is an IAM-style
//! policy document with an optional flat `context` map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TokenError;

use std::fmt;

/// The only accepted signing algorithm.
pub const HS256: &str = "HS256";

/// Principal reported for every denied request.
pub const UNAUTHORIZED_PRINCIPAL: &str = "unauthorized";

/// Claims copied into an Allow decision's context. Nothing else leaves the token.
pub const CONTEXT_CLAIMS: [&str; 5] = ["workflowId", "executionId", "sub", "iat", "exp"];

/// Decoded token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl TokenHeader {
    pub fn hs256() -> Self {
        Self {
            alg: HS256.to_string(),
            typ: Some("JWT".to_string()),
        }
    }
}

/// Decoded token payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(pub Map<String, Value>);

impl Claims {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style claim setter.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn subject(&self) -> Option<String> {
        self.get("sub").map(claim_to_string)
    }

    /// Read a NumericDate claim (`exp`, `nbf`, `iat`) as whole seconds.
    ///
    /// Absent or null claims yield `None`; non-numeric values are malformed.
    pub fn time_claim(&self, name: &str) -> Result<Option<i64>, TokenError> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.floor() as i64))
                .map(Some)
                .ok_or_else(|| TokenError::Malformed(format!("claim '{name}' out of range"))),
            Some(_) => Err(TokenError::Malformed(format!("claim '{name}' must be numeric"))),
        }
    }

    /// The whitelisted subset forwarded to downstream handlers.
    ///
    /// Identifiers are stringified; `iat` and `exp` keep their JSON type.
    pub fn context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        for name in CONTEXT_CLAIMS {
            let Some(value) = self.get(name) else { continue };
            if value.is_null() {
                continue;
            }
            let forwarded = match name {
                "iat" | "exp" => value.clone(),
                _ => Value::String(claim_to_string(value)),
            };
            context.insert(name.to_string(), forwarded);
        }
        context
    }
}

fn claim_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Policy effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Allow => write!(f, "Allow"),
            Effect::Deny => write!(f, "Deny"),
        }
    }
}

/// Inbound authorizer event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerRequest {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub authorization_token: Option<String>,
    #[serde(default)]
    pub method_arn: String,
}

/// Outcome of an authorization check, before rendering as a policy.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationDecision {
    pub principal_id: String,
    pub effect: Effect,
    pub resource: String,
    pub context: Map<String, Value>,
}

impl AuthorizationDecision {
    /// Uniform, detail-free denial.
    pub fn deny(resource: impl Into<String>) -> Self {
        Self {
            principal_id: UNAUTHORIZED_PRINCIPAL.to_string(),
            effect: Effect::Deny,
            resource: resource.into(),
            context: Map::new(),
        }
    }

    pub fn allow(
        principal_id: impl Into<String>,
        resource: impl Into<String>,
        context: Map<String, Value>,
    ) -> Self {
        Self {
            principal_id: principal_id.into(),
            effect: Effect::Allow,
            resource: resource.into(),
            context,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }

    pub fn into_response(self) -> AuthorizerResponse {
        AuthorizerResponse {
            principal_id: self.principal_id,
            policy_document: PolicyDocument {
                version: PolicyDocument::VERSION.to_string(),
                statement: vec![PolicyStatement {
                    action: PolicyStatement::INVOKE.to_string(),
                    effect: self.effect,
                    resource: self.resource,
                }],
            },
            context: if self.context.is_empty() {
                None
            } else {
                Some(self.context)
            },
        }
    }
}

/// Authorizer response: principal plus an IAM-style policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub const VERSION: &'static str = "2012-10-17";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}

impl PolicyStatement {
    pub const INVOKE: &'static str = "execute-api:Invoke";
}
