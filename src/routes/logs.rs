use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath};
use super::{effective_today, require_profile, today, AppState, LogsResponse, SuccessResponse};
use crate::error::{AppError, Result};
use crate::models::{previous_start, NewCycleLog};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLogRequest {
    pub user_id: Uuid,
    pub log: NewCycleLog,
    pub age: Option<i32>,
    /// The client's local date, used for the future-date check.
    #[serde(default)]
    pub client_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLogRequest {
    pub user_id: Uuid,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/data/:user_id", get(get_data))
        .route("/api/logs", post(add_log))
        .route("/api/logs/:id", delete(delete_log))
        .route("/api/reset/:user_id", delete(reset_data))
        .with_state(state)
}

async fn get_data(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<LogsResponse>> {
    let store = state.store.as_ref();
    let profile = require_profile(store, user_id).await?;
    let logs = store.list_by_user(user_id).await?;

    Ok(Json(LogsResponse { logs, profile }))
}

async fn add_log(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AddLogRequest>,
) -> Result<Json<LogsResponse>> {
    let store = state.store.as_ref();
    let profile = require_profile(store, body.user_id).await?;

    if body.age.is_some_and(|age| age <= 0) {
        return Err(AppError::Validation("Age must be a positive number".into()));
    }
    let today = effective_today(body.client_date, today())?;

    let existing = store.list_by_user(body.user_id).await?;
    let previous = previous_start(&existing, body.log.start_date);
    let record = body
        .log
        .normalize(today, previous, profile.average_cycle_length)?;

    let created = store.create_record(body.user_id, record).await?;
    tracing::info!("📝 Logged cycle {} for user {}", created.id, body.user_id);

    let profile = store.refresh_cycle_stats(body.user_id, body.age).await?;
    let logs = store.list_by_user(body.user_id).await?;

    Ok(Json(LogsResponse { logs, profile }))
}

async fn delete_log(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<DeleteLogRequest>,
) -> Result<Json<LogsResponse>> {
    let store = state.store.as_ref();
    require_profile(store, body.user_id).await?;

    if !store.delete_by_id(body.user_id, id).await? {
        return Err(AppError::NotFound("Log"));
    }
    tracing::info!("🗑️ Deleted cycle {} for user {}", id, body.user_id);

    let profile = store.refresh_cycle_stats(body.user_id, None).await?;
    let logs = store.list_by_user(body.user_id).await?;

    Ok(Json(LogsResponse { logs, profile }))
}

async fn reset_data(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<SuccessResponse>> {
    let store = state.store.as_ref();
    require_profile(store, user_id).await?;

    let removed = store.delete_all_by_user(user_id).await?;
    store.refresh_cycle_stats(user_id, None).await?;
    tracing::info!("♻️ Reset {} records for user {}", removed, user_id);

    Ok(Json(SuccessResponse {
        success: true,
        message: Some("All records reset successfully"),
    }))
}
