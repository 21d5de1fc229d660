//! Bearer token authentication extractor.
//!
//! Reads `Authorization: Bearer <token>` and verifies it with the same
//! authorizer that backs `POST /authorize`. The rejection never says why a
//! token failed; the reason is logged instead.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use relaygate_types::token::Claims;

use crate::http::error::AppError;
use crate::state::AppState;

/// Authenticated request. Extracting this validates the bearer token.
pub struct Authenticated(pub Claims);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .map(|v| {
                v.to_str().map_err(|_| {
                    AppError::Unauthorized("Invalid Authorization header encoding".to_string())
                })
            })
            .transpose()?;

        match state.authorizer.verify_header(header).await {
            Ok(claims) => Ok(Authenticated(claims)),
            Err(e) => {
                tracing::warn!(path = %parts.uri.path(), error = %e, "bearer token rejected");
                Err(AppError::Unauthorized(
                    "Provide a valid token via 'Authorization: Bearer <token>'.".to_string(),
                ))
            }
        }
    }
}
