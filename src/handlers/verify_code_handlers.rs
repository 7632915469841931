//! Handler for one-time verification-code retrieval.
//!
//! Orchestrates the upstream call chain: fetch the most recent message for
//! the address, apply the sender/subject heuristic, run the extractor.
//! Each "soft" miss (no mail yet, wrong sender, no code in the body) is a
//! 200 with `success: false` so the UI can show the reason and let the
//! operator retry; only upstream failures surface as 500.

use crate::{errors::AppError, services::code_extractor::extract_code, state::AppState};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct VerifyCodeQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET `/verify-code?email=…`
pub async fn get_verify_code(
    State(state): State<AppState>,
    Query(query): Query<VerifyCodeQuery>,
) -> Result<Json<VerifyCodeResponse>, AppError> {
    let Some(email) = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
    else {
        return Err(AppError::bad_request("query parameter `email` is required"));
    };

    let Some(message) = state.mail.fetch_latest_message(email).await? else {
        return Ok(Json(VerifyCodeResponse {
            error: Some("no messages for this address yet".into()),
            ..Default::default()
        }));
    };

    if !state.mail.matches_heuristic(&message) {
        return Ok(Json(VerifyCodeResponse {
            subject: Some(message.subject),
            received_time: Some(message.received_time),
            error: Some("latest message does not look like a verification email".into()),
            ..Default::default()
        }));
    }

    let Some(code) = extract_code(&message.body) else {
        return Ok(Json(VerifyCodeResponse {
            subject: Some(message.subject),
            received_time: Some(message.received_time),
            error: Some("could not extract a verification code from the message".into()),
            ..Default::default()
        }));
    };

    tracing::debug!(subject = %message.subject, "extracted verification code");
    Ok(Json(VerifyCodeResponse {
        success: true,
        verify_code: Some(code),
        subject: Some(message.subject),
        received_time: Some(message.received_time),
        sender: message.sender,
        error: None,
    }))
}
