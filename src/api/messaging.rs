//! Send handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{api_error, parse_body, ApiError, AppState};
use crate::dispatch::{BulkRequest, RecipientInput, SingleRequest};

/// `POST /api/send-message` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SendMessageBody {
    #[serde(default, alias = "phone", alias = "to")]
    number: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    template_id: Option<u64>,
    #[serde(default)]
    contact_id: Option<u64>,
    #[serde(default)]
    variables: HashMap<String, String>,
}

/// `POST /api/send-bulk` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SendBulkBody {
    #[serde(default, alias = "recipients")]
    numbers: Vec<RecipientInput>,
    #[serde(default)]
    message: String,
    /// Milliseconds between sends.
    #[serde(default, alias = "delayMs")]
    delay: Option<u64>,
    #[serde(default)]
    template_id: Option<u64>,
    #[serde(default)]
    group_id: Option<u64>,
    #[serde(default)]
    contact_ids: Vec<u64>,
    #[serde(default)]
    variables: HashMap<String, String>,
}

pub(super) async fn send_message(
    State(state): State<AppState>,
    body: Result<Json<SendMessageBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = parse_body(body)?;
    let report = state
        .dispatcher
        .send_single(SingleRequest {
            recipient: body.number,
            message: body.message,
            template_id: body.template_id,
            contact_id: body.contact_id,
            variables: body.variables,
        })
        .await
        .map_err(api_error)?;

    Ok(Json(json!({
        "success": true,
        "messageId": report.message_id,
        "recipient": report.recipient,
        "logId": report.log_id,
    })))
}

pub(super) async fn send_bulk(
    State(state): State<AppState>,
    body: Result<Json<SendBulkBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body = parse_body(body)?;
    let report = state
        .dispatcher
        .send_bulk(BulkRequest {
            recipients: body.numbers,
            message: body.message,
            delay_ms: body.delay,
            template_id: body.template_id,
            group_id: body.group_id,
            contact_ids: body.contact_ids,
            variables: body.variables,
        })
        .await
        .map_err(api_error)?;

    Ok(Json(json!({
        "success": true,
        "results": report.results,
        "summary": report.summary,
        "logId": report.log_id,
    })))
}
