//! Rotation trigger endpoint.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::Serialize;

use relaygate_types::rotation::{RotationRequest, RotationSummary};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RotationResult {
    Rotated(RotationSummary),
    Step {
        secret_id: String,
        client_request_token: String,
        step: String,
        completed: bool,
    },
}

/// POST /rotation - Run one scheduler step, or a full rotation.
///
/// A body of `{SecretId, ClientRequestToken, Step}` runs that step. An empty
/// body rotates the configured secret end to end.
pub async fn rotate(
    State(state): State<AppState>,
    _auth: Authenticated,
    body: Bytes,
) -> Result<Json<ApiResponse<RotationResult>>, AppError> {
    let start = Instant::now();

    let result = if body.iter().all(u8::is_ascii_whitespace) {
        RotationResult::Rotated(state.rotation.rotate_scheduled().await?)
    } else {
        let request: RotationRequest = serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid rotation request: {e}")))?;
        state.rotation.handle(&request).await?;
        RotationResult::Step {
            secret_id: request.secret_id,
            client_request_token: request.client_request_token,
            step: request.step,
            completed: true,
        }
    };

    Ok(Json(ApiResponse::timed(result, start).with_link("self", "/rotation")))
}
