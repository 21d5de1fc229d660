//! Task status webhook receiver.
//!
//! Verifies the optional `X-Signature` HMAC over the raw body, then runs the
//! envelope through admission. The admission outcome is returned as-is so
//! the caller can decide whether to start an automation.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;

use relaygate_infra::webhook::{SIGNATURE_HEADER, SignatureError, verify_signature};
use relaygate_types::admission::AdmissionOutcome;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /webhooks/status - Admit or skip a status change event.
pub async fn receive_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AdmissionOutcome>, AppError> {
    if let Some(secret) = &state.config.admission.webhook_secret {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        verify_signature(secret.expose().as_bytes(), &body, signature).map_err(|e| match e {
            SignatureError::InvalidKey(msg) => {
                tracing::error!(error = %msg, "webhook secret unusable");
                AppError::Unauthorized("Webhook authentication failed".to_string())
            }
            other => {
                tracing::warn!(error = %other, "webhook signature rejected");
                AppError::Unauthorized("Webhook authentication failed".to_string())
            }
        })?;
    }

    let envelope: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Body is not valid JSON: {e}")))?;

    let outcome = state.admission.admit(&envelope).await;
    match &outcome.trigger {
        Some(trigger) => tracing::info!(
            task_id = %trigger.task_id,
            client_id = %trigger.client_id,
            dedup_key = %trigger.dedup_key,
            status = %trigger.new_status,
            "status change admitted"
        ),
        None => tracing::debug!(
            reason = outcome.decision.reason.as_deref().unwrap_or(""),
            "status change skipped"
        ),
    }

    Ok(Json(outcome))
}
