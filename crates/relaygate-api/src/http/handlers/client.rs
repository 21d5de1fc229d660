//! Client registry endpoints.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};

use relaygate_core::repository::client::ClientRegistry;
use relaygate_types::admission::ClientStatusRecord;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for creating or updating a client.
#[derive(Debug, Deserialize)]
pub struct PutClientRequest {
    pub client_name: String,
    pub task_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub workflow_ids: Option<Map<String, Value>>,
}

/// GET /clients - List all clients.
pub async fn list_clients(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<Vec<ClientStatusRecord>>>, AppError> {
    let start = Instant::now();
    let clients = state.clients.list().await?;
    Ok(Json(ApiResponse::timed(clients, start).with_link("self", "/clients")))
}

/// GET /clients/{id} - Fetch one client.
pub async fn get_client(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ClientStatusRecord>>, AppError> {
    let start = Instant::now();
    let client = state
        .clients
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Client '{id}' not found")))?;
    Ok(Json(
        ApiResponse::timed(client, start).with_link("self", &format!("/clients/{id}")),
    ))
}

/// PUT /clients/{id} - Create or update a client, keeping its processing history.
pub async fn put_client(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<PutClientRequest>,
) -> Result<Json<ApiResponse<ClientStatusRecord>>, AppError> {
    let start = Instant::now();

    if body.client_name.trim().is_empty() || body.task_id.trim().is_empty() {
        return Err(AppError::Validation(
            "client_name and task_id must not be empty".to_string(),
        ));
    }

    let mut record = match state.clients.get(&id).await? {
        Some(existing) => existing,
        None => ClientStatusRecord::new(&id, &body.client_name, &body.task_id),
    };
    record.client_name = body.client_name;
    record.task_id = body.task_id;
    if let Some(status) = body.status {
        record.status = status;
    }
    if let Some(workflow_ids) = body.workflow_ids {
        record.workflow_ids = workflow_ids;
    }
    record.updated_at = Utc::now();

    state.clients.upsert(&record).await?;

    Ok(Json(
        ApiResponse::timed(record, start).with_link("self", &format!("/clients/{id}")),
    ))
}
