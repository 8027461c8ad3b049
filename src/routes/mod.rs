use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::advisory::AdvisoryClient;
use crate::error::{AppError, Result};
use crate::locator::ClinicLocator;
use crate::models::{CycleRecord, UserProfile};
use crate::store::RecordStore;

pub mod analysis;
pub mod auth;
pub mod clinics;
pub mod dashboard;
pub mod extract;
pub mod logs;
pub mod profile;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub advisory: Arc<AdvisoryClient>,
    pub locator: Arc<ClinicLocator>,
}

pub fn api(state: AppState) -> Router {
    Router::new()
        .merge(auth::routes(state.clone()))
        .merge(logs::routes(state.clone()))
        .merge(profile::routes(state.clone()))
        .merge(dashboard::routes(state.clone()))
        .merge(analysis::routes(state.clone()))
        .merge(clinics::routes(state))
}

/// Records for the current snapshot, as returned after every log mutation.
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<CycleRecord>,
    pub profile: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The caller's own calendar date when it sent one, else the UTC date.
/// Every real UTC offset keeps the local date within a day of UTC, so
/// anything further away is refused.
pub(crate) fn effective_today(client: Option<NaiveDate>, utc_today: NaiveDate) -> Result<NaiveDate> {
    match client {
        None => Ok(utc_today),
        Some(date) if (date - utc_today).num_days().abs() <= 1 => Ok(date),
        Some(date) => Err(AppError::Validation(format!(
            "Client date {date} is more than a day away from the server date {utc_today} (UTC)"
        ))),
    }
}

pub(crate) async fn require_profile(store: &dyn RecordStore, user_id: Uuid) -> Result<UserProfile> {
    store
        .get_profile(user_id)
        .await?
        .ok_or(AppError::NotFound("User"))
}
