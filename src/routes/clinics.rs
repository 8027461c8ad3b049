use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{ApiPath, ApiQuery};
use super::{require_profile, AppState};
use crate::error::Result;
use crate::locator::{Clinic, DEFAULT_LOCATION};

#[derive(Deserialize)]
pub struct ClinicQuery {
    pub location: Option<String>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/clinics/:user_id", get(get_clinics))
        .with_state(state)
}

/// The query parameter wins over the stored profile location.
pub fn search_location(query: Option<&str>, profile_location: Option<&str>) -> String {
    [query, profile_location]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LOCATION)
        .to_string()
}

async fn get_clinics(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ClinicQuery>,
) -> Result<Json<Vec<Clinic>>> {
    let profile = require_profile(state.store.as_ref(), user_id).await?;
    let location = search_location(query.location.as_deref(), profile.location.as_deref());

    let clinics = state.locator.find_nearby(&location).await?;
    tracing::info!("🏥 Found {} clinics near {}", clinics.len(), location);

    Ok(Json(clinics))
}
