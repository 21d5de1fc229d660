//! Gateway authorizer endpoint.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::Value;

use relaygate_types::token::{AuthorizationDecision, AuthorizerRequest, AuthorizerResponse};

use crate::state::AppState;

/// POST /authorize - Evaluate a bearer token and return an IAM-style policy.
///
/// Always answers 200 with a policy, whatever the body looks like. A rejected
/// token or an unreadable event yields a Deny. When the body carries no
/// `authorizationToken`, the request's own `Authorization` header is used.
pub async fn authorize(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<AuthorizerResponse> {
    let mut request = match parse_event(&body) {
        Ok(request) => request,
        Err(resource) => {
            tracing::warn!(resource = %resource, "unreadable authorizer event");
            return Json(AuthorizationDecision::deny(resource).into_response());
        }
    };

    if request.authorization_token.is_none() {
        request.authorization_token = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }
    Json(state.authorizer.authorize(&request).await)
}

/// Parse the event body. An empty body is an event with no fields.
///
/// On failure returns the best-effort `methodArn` to deny, or `""`.
fn parse_event(body: &[u8]) -> Result<AuthorizerRequest, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AuthorizerRequest {
            kind: None,
            authorization_token: None,
            method_arn: String::new(),
        });
    }

    let value: Value = serde_json::from_slice(body).map_err(|_| String::new())?;
    serde_json::from_value(value.clone()).map_err(|_| {
        value
            .get("methodArn")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    })
}
