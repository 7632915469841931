//! HTTP handlers for usage records.
//!
//! Two write paths exist on purpose: `/use` is the quota-checked automatic
//! path the UI's "hand out" button calls; `/usages` is the administrative
//! path that skips the quota check and lets the tag re-derive the quota.

use crate::{
    errors::AppError,
    handlers::Acknowledged,
    models::usage::UsageTag,
    services::mailbox_store::{NewUsage, UsageUpdate},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Request body for `POST /mailboxes/{id}/use`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUsageRequest {
    pub user_name: String,
    pub verify_code: Option<String>,
}

/// Request body for the manual add and edit paths.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePayload {
    pub user_name: String,
    pub verify_code: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
    pub tag: Option<UsageTag>,
}

/// POST `/mailboxes/{id}/use` — quota-checked usage recording.
pub async fn record_usage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordUsageRequest>,
) -> Result<Json<Acknowledged>, AppError> {
    let user_name = require_user_name(&payload.user_name)?;
    state
        .store
        .record_automatic_usage(id, user_name, payload.verify_code)
        .await?;
    Ok(Json(Acknowledged::ok()))
}

/// POST `/mailboxes/{id}/usages` — manual addition, no quota check.
/// An absent tag defaults to pooled-unwarranted.
pub async fn add_usage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UsagePayload>,
) -> Result<Json<Acknowledged>, AppError> {
    let user_name = require_user_name(&payload.user_name)?;
    state
        .store
        .add_usage(
            id,
            NewUsage {
                user_name: user_name.to_string(),
                verify_code: payload.verify_code,
                used_at: payload.used_at,
                tag: payload.tag.unwrap_or_default(),
            },
        )
        .await?;
    Ok(Json(Acknowledged::ok()))
}

/// PUT `/mailboxes/{id}/usages/{usage_id}` — partial edit of one record.
pub async fn update_usage(
    State(state): State<AppState>,
    Path((id, usage_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UsagePayload>,
) -> Result<Json<Acknowledged>, AppError> {
    let user_name = require_user_name(&payload.user_name)?;
    state
        .store
        .update_usage(
            id,
            usage_id,
            UsageUpdate {
                user_name: user_name.to_string(),
                verify_code: payload.verify_code,
                used_at: payload.used_at,
                tag: payload.tag,
            },
        )
        .await?;
    Ok(Json(Acknowledged::ok()))
}

/// DELETE `/mailboxes/{id}/usages/{usage_id}`.
pub async fn delete_usage(
    State(state): State<AppState>,
    Path((id, usage_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Acknowledged>, AppError> {
    state.store.delete_usage(id, usage_id).await?;
    Ok(Json(Acknowledged::ok()))
}

fn require_user_name(raw: &str) -> Result<&str, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request("a user name is required"));
    }
    Ok(trimmed)
}
