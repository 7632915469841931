//! HTTP handlers for the mailbox collection.
//! Delegates all domain decisions to `MailboxStore`; this layer only
//! validates request shapes and maps outcomes to responses.

use crate::{errors::AppError, handlers::Acknowledged, models::mailbox::Mailbox, state::AppState};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /mailboxes`.
#[derive(Debug, Deserialize)]
pub struct BulkAddRequest {
    pub addresses: Vec<String>,
}

/// Response body for `POST /mailboxes`.
#[derive(Debug, Serialize)]
pub struct BulkAddResponse {
    pub success: bool,
    pub added: usize,
    pub skipped: usize,
    pub message: String,
}

/// GET `/mailboxes` — every mailbox in the pool, newest first.
pub async fn list_mailboxes(
    State(state): State<AppState>,
) -> Result<Json<Vec<Mailbox>>, AppError> {
    let mailboxes = state.store.list_mailboxes().await?;
    Ok(Json(mailboxes))
}

/// POST `/mailboxes` — bulk-add addresses.
pub async fn bulk_add_mailboxes(
    State(state): State<AppState>,
    Json(payload): Json<BulkAddRequest>,
) -> Result<Json<BulkAddResponse>, AppError> {
    if payload.addresses.is_empty() {
        return Err(AppError::bad_request("no addresses supplied"));
    }

    let outcome = state.store.bulk_add(&payload.addresses).await?;
    tracing::info!(
        added = outcome.added,
        skipped = outcome.skipped,
        "bulk-added mailboxes"
    );

    let message = if outcome.skipped > 0 {
        format!(
            "added {} mailboxes, skipped {} already present",
            outcome.added, outcome.skipped
        )
    } else {
        format!("added {} mailboxes", outcome.added)
    };

    Ok(Json(BulkAddResponse {
        success: true,
        added: outcome.added,
        skipped: outcome.skipped,
        message,
    }))
}

/// GET `/mailboxes/{id}` — one mailbox with its full usage history.
pub async fn get_mailbox(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Mailbox>, AppError> {
    let mailbox = state
        .store
        .get_mailbox(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("mailbox `{id}` not found")))?;
    Ok(Json(mailbox))
}

/// DELETE `/mailboxes/{id}` — removes the mailbox and its usage history.
pub async fn delete_mailbox(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Acknowledged>, AppError> {
    if !state.store.delete_mailbox(id).await? {
        return Err(AppError::not_found(format!("mailbox `{id}` not found")));
    }
    tracing::info!(%id, "deleted mailbox");
    Ok(Json(Acknowledged::ok()))
}
