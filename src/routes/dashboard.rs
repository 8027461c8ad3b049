use axum::{extract::State, routing::get, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{ApiPath, ApiQuery};
use super::{effective_today, require_profile, today, AppState};
use crate::error::Result;
use crate::metrics::{self, DashboardMetrics};

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// The client's local date; predictions count days from it.
    pub today: Option<NaiveDate>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/dashboard/:user_id", get(get_dashboard))
        .with_state(state)
}

async fn get_dashboard(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DashboardQuery>,
) -> Result<Json<DashboardMetrics>> {
    let today = effective_today(query.today, today())?;
    let store = state.store.as_ref();
    let profile = require_profile(store, user_id).await?;
    let records = store.list_by_user(user_id).await?;

    Ok(Json(metrics::compute(&records, &profile, today)))
}
