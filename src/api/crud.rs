//! CRUD handlers for contacts, groups, templates and message logs.
//!
//! Responses are `{ "success": true, "data": ... }`.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use wasend_core::records::{ContactInput, GroupInput, TemplateInput};

use super::{api_error, parse_body, ApiError, AppState};

type ApiResult = Result<Json<Value>, ApiError>;

const DEFAULT_LOG_PAGE: usize = 50;
const MAX_LOG_PAGE: usize = 500;

fn data(value: impl serde::Serialize) -> Json<Value> {
    Json(json!({"success": true, "data": value}))
}

// -- contacts --

pub(super) async fn list_contacts(State(state): State<AppState>) -> ApiResult {
    let contacts = state.store.list_contacts().await.map_err(api_error)?;
    Ok(data(contacts))
}

pub(super) async fn get_contact(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult {
    let contact = state.store.get_contact(id).await.map_err(api_error)?;
    Ok(data(contact))
}

pub(super) async fn create_contact(
    State(state): State<AppState>,
    body: Result<Json<ContactInput>, JsonRejection>,
) -> ApiResult {
    let input = parse_body(body)?;
    let contact = state.store.create_contact(input).await.map_err(api_error)?;
    info!("contact {} created", contact.id);
    Ok(data(contact))
}

pub(super) async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Result<Json<ContactInput>, JsonRejection>,
) -> ApiResult {
    let input = parse_body(body)?;
    let contact = state
        .store
        .update_contact(id, input)
        .await
        .map_err(api_error)?;
    Ok(data(contact))
}

pub(super) async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult {
    let contact = state.store.delete_contact(id).await.map_err(api_error)?;
    info!("contact {id} deleted");
    Ok(data(contact))
}

// -- groups --

pub(super) async fn list_groups(State(state): State<AppState>) -> ApiResult {
    let groups = state.store.list_groups().await.map_err(api_error)?;
    Ok(data(groups))
}

pub(super) async fn get_group(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult {
    let group = state.store.get_group(id).await.map_err(api_error)?;
    Ok(data(group))
}

pub(super) async fn create_group(
    State(state): State<AppState>,
    body: Result<Json<GroupInput>, JsonRejection>,
) -> ApiResult {
    let input = parse_body(body)?;
    let group = state.store.create_group(input).await.map_err(api_error)?;
    info!("group {} created", group.id);
    Ok(data(group))
}

pub(super) async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Result<Json<GroupInput>, JsonRejection>,
) -> ApiResult {
    let input = parse_body(body)?;
    let group = state
        .store
        .update_group(id, input)
        .await
        .map_err(api_error)?;
    Ok(data(group))
}

pub(super) async fn delete_group(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult {
    let group = state.store.delete_group(id).await.map_err(api_error)?;
    info!("group {id} deleted");
    Ok(data(group))
}

// -- templates --

pub(super) async fn list_templates(State(state): State<AppState>) -> ApiResult {
    let templates = state.store.list_templates().await.map_err(api_error)?;
    Ok(data(templates))
}

pub(super) async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult {
    let template = state.store.get_template(id).await.map_err(api_error)?;
    Ok(data(template))
}

pub(super) async fn create_template(
    State(state): State<AppState>,
    body: Result<Json<TemplateInput>, JsonRejection>,
) -> ApiResult {
    let input = parse_body(body)?;
    let template = state
        .store
        .create_template(input)
        .await
        .map_err(api_error)?;
    info!("template {} created", template.id);
    Ok(data(template))
}

pub(super) async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    body: Result<Json<TemplateInput>, JsonRejection>,
) -> ApiResult {
    let input = parse_body(body)?;
    let template = state
        .store
        .update_template(id, input)
        .await
        .map_err(api_error)?;
    Ok(data(template))
}

pub(super) async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult {
    let template = state.store.delete_template(id).await.map_err(api_error)?;
    info!("template {id} deleted");
    Ok(data(template))
}

// -- logs --

#[derive(Debug, Deserialize)]
pub(super) struct LogQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

/// `GET /api/logs?limit&offset`: newest first.
pub(super) async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> ApiResult {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_PAGE).min(MAX_LOG_PAGE);
    let offset = query.offset.unwrap_or(0);
    let page = state
        .store
        .list_logs(limit, offset)
        .await
        .map_err(api_error)?;
    Ok(Json(json!({
        "success": true,
        "data": page.items,
        "total": page.total,
        "hasMore": page.has_more,
    })))
}

pub(super) async fn get_log(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult {
    let log = state.store.get_log(id).await.map_err(api_error)?;
    Ok(data(log))
}

pub(super) async fn log_stats(State(state): State<AppState>) -> ApiResult {
    let stats = state.store.log_stats().await.map_err(api_error)?;
    Ok(data(stats))
}

pub(super) async fn clear_logs(State(state): State<AppState>) -> ApiResult {
    let removed = state.store.clear_logs().await.map_err(api_error)?;
    info!("cleared {removed} message logs");
    Ok(data(json!({"removed": removed})))
}
